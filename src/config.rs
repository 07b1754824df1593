/*!
 * Configuration types for Collate
 */

use crate::error::{CollateError, Result};
use crate::partition::{PartitionDescriptor, PartitionTable};
use collate_core_demux::{
    PoolConfig, DEFAULT_GROWTH_HEADROOM, DEFAULT_MAX_KEY, DEFAULT_MAX_OPEN, MAX_KEY_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for a collate run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateConfig {
    /// Directory bucket files are written to (None = current directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Extension appended to every bucket file name
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// First character of a directive line
    #[serde(default = "default_directive_marker")]
    pub directive_marker: char,

    /// Maximum number of bucket files held open at once
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,

    /// Slots allocated beyond the key that triggers storage growth
    #[serde(default = "default_growth_headroom")]
    pub growth_headroom: usize,

    /// Largest bucket key accepted before the run is aborted
    #[serde(default = "default_max_key")]
    pub max_key: u64,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Replacement partition table (empty = built-in table)
    #[serde(default)]
    pub partitions: Vec<PartitionDescriptor>,
}

impl Default for CollateConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            output_suffix: default_output_suffix(),
            directive_marker: default_directive_marker(),
            max_open_files: default_max_open_files(),
            growth_headroom: default_growth_headroom(),
            max_key: default_max_key(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
            partitions: Vec::new(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    #[default]
    Warn,

    /// Info, warnings, and errors
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_output_suffix() -> String {
    "m".to_string()
}

fn default_directive_marker() -> char {
    '#'
}

fn default_max_open_files() -> usize {
    DEFAULT_MAX_OPEN
}

fn default_growth_headroom() -> usize {
    DEFAULT_GROWTH_HEADROOM
}

fn default_max_key() -> u64 {
    DEFAULT_MAX_KEY
}

impl CollateConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CollateError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: CollateConfig = toml::from_str(&contents).map_err(|e| {
            CollateError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CollateError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check limits and the directive marker
    pub fn validate(&self) -> Result<()> {
        if self.max_open_files == 0 {
            return Err(CollateError::Config(
                "max_open_files must be at least 1".to_string(),
            ));
        }
        if self.growth_headroom == 0 {
            return Err(CollateError::Config(
                "growth_headroom must be at least 1".to_string(),
            ));
        }
        if self.max_key > MAX_KEY_LIMIT {
            return Err(CollateError::Config(format!(
                "max_key {} exceeds the limit of {}",
                self.max_key, MAX_KEY_LIMIT
            )));
        }
        self.marker_byte()?;
        if self.output_suffix.contains(['/', '\\']) {
            return Err(CollateError::Config(format!(
                "output_suffix '{}' must not contain path separators",
                self.output_suffix
            )));
        }
        Ok(())
    }

    /// Directive marker as a single byte
    pub fn marker_byte(&self) -> Result<u8> {
        u8::try_from(self.directive_marker)
            .ok()
            .filter(|b| b.is_ascii() && !b.is_ascii_digit() && !b.is_ascii_whitespace())
            .ok_or_else(|| {
                CollateError::Config(format!(
                    "directive_marker '{}' must be a non-digit, non-space ASCII character",
                    self.directive_marker
                ))
            })
    }

    /// Limits for the handle pool
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_open: self.max_open_files,
            growth_headroom: self.growth_headroom,
            max_key: self.max_key,
        }
    }

    /// Partition table from the configuration, or the built-in one
    pub fn partition_table(&self) -> Result<PartitionTable> {
        if self.partitions.is_empty() {
            Ok(PartitionTable::builtin())
        } else {
            PartitionTable::new(self.partitions.clone())
        }
    }

    /// Directory bucket files are created in
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
