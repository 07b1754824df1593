/*!
 * Collate - bounded fan-out record splitter
 *
 * Splits line-oriented streams of integer records into one output file per
 * value of a selected field:
 * - Named partitions select the field, an optional required value, and the
 *   output naming rule
 * - At most a fixed number of output files are open at any time; evicted
 *   files are reopened in append mode on demand
 * - Directive lines are carried onto the next record written
 * - TOML configuration, structured logging, JSON run summaries
 *
 * The demultiplexing core lives in the `collate-core-demux` crate.
 */

pub mod bucket;
pub mod cli_style;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod partition;
pub mod runner;

// Re-export commonly used types
pub use bucket::{output_base, FileSinkOpener};
pub use collate_core_demux as demux;
pub use config::{CollateConfig, LogLevel};
pub use error::{CollateError, Result};
pub use partition::{NamingRule, OutputNamer, PartitionDescriptor, PartitionTable};
pub use runner::{run, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
