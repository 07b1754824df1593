//! Error types for the demultiplexer core
//!
//! Every variant here is fatal to a run. Malformed records and filter
//! mismatches are not errors and never reach this type.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Errors raised by the handle pool and the line classifier
#[derive(Debug, Error)]
pub enum DemuxError {
    /// The output handle for a bucket could not be opened
    #[error("could not open output for bucket {key}: {source}")]
    Open {
        key: u64,
        #[source]
        source: io::Error,
    },

    /// Writing to an open bucket handle failed
    #[error("write to bucket {key} failed: {source}")]
    Write {
        key: u64,
        #[source]
        source: io::Error,
    },

    /// A bucket accepted fewer bytes than were submitted
    #[error("short write to bucket {key} ({written} != {expected})")]
    ShortWrite {
        key: u64,
        expected: usize,
        written: usize,
    },

    /// Flushing a handle on eviction or shutdown failed
    #[error("could not close output for bucket {key}: {source}")]
    Close {
        key: u64,
        #[source]
        source: io::Error,
    },

    /// The bucket key exceeds the addressable range of the pool
    #[error("bucket key {key} exceeds the configured maximum {max}")]
    KeyTooLarge { key: u64, max: u64 },

    /// Slot storage for the key could not be allocated
    #[error("cannot grow handle storage to {slots} slots for bucket {key}")]
    Capacity {
        key: u64,
        slots: usize,
        #[source]
        source: TryReserveError,
    },

    /// The key could not be turned into an output name
    #[error("{0}")]
    Naming(String),

    /// Reading the input stream failed
    #[error("failed to read input: {0}")]
    Read(#[source] io::Error),
}

impl DemuxError {
    /// Bucket key associated with this error, if any
    pub fn key(&self) -> Option<u64> {
        match self {
            DemuxError::Open { key, .. }
            | DemuxError::Write { key, .. }
            | DemuxError::ShortWrite { key, .. }
            | DemuxError::Close { key, .. }
            | DemuxError::KeyTooLarge { key, .. }
            | DemuxError::Capacity { key, .. } => Some(*key),
            DemuxError::Naming(_) | DemuxError::Read(_) => None,
        }
    }

    /// True for failures caused by configuration rather than the environment
    pub fn is_configuration(&self) -> bool {
        matches!(self, DemuxError::Naming(_) | DemuxError::KeyTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, DemuxError>;
