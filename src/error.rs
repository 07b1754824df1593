/*!
 * Error types for Collate
 */

use collate_core_demux::DemuxError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollateError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;

#[derive(Debug, Error)]
pub enum CollateError {
    /// Partition name not present in the partition table
    #[error("Unknown partition request: {0}")]
    UnknownPartition(String),

    /// Configuration or partition table error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input source could not be opened
    #[error("Could not open input file {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure inside the demultiplexer (bucket open, write, naming)
    #[error(transparent)]
    Demux(#[from] DemuxError),

    /// I/O error outside the demultiplexer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CollateError {
    /// Get the process exit code for this error
    ///
    /// Every error aborts the run; there is no partial-success status.
    pub fn exit_code(&self) -> i32 {
        EXIT_FATAL
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            CollateError::UnknownPartition(_) | CollateError::Config(_) => {
                ErrorCategory::Configuration
            }
            CollateError::Input { .. } => ErrorCategory::Input,
            CollateError::Demux(DemuxError::Read(_)) => ErrorCategory::Input,
            CollateError::Demux(e) if e.is_configuration() => ErrorCategory::Configuration,
            CollateError::Demux(_) | CollateError::Io(_) => ErrorCategory::Output,
        }
    }

    /// Short hint shown next to the error on the terminal
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CollateError::UnknownPartition(_) => {
                Some("Run with --list-partitions to see the available partitions")
            }
            CollateError::Input { .. } => Some("Check that the input path exists and is readable"),
            CollateError::Demux(DemuxError::Open { .. }) => {
                Some("Check that the output directory exists and is writable")
            }
            _ => None,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown partition, bad descriptor, key outside the naming range
    Configuration,
    /// Input file missing or unreadable
    Input,
    /// Bucket file could not be opened or fully written
    Output,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Output => write!(f, "output"),
        }
    }
}
