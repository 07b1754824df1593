//! Structured output writer supporting JSON and human-readable modes.

use crate::cli_style::{self, format_bytes, format_duration, Icons};
use crate::runner::RunSummary;
use serde::Serialize;

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Quiet,
}

/// Structured error record for JSON output
#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    success: bool,
    category: &'a str,
    error: String,
}

/// Prints run results in the selected mode
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool, quiet: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        };
        Self { mode }
    }

    /// Print the summary of a finished run
    pub fn summary(&self, summary: &RunSummary) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(summary) {
                    println!("{}", json);
                }
            }
            OutputMode::Human => {
                println!(
                    "{} {} {}",
                    cli_style::Theme::success(Icons::SUCCESS),
                    cli_style::Theme::bold(&summary.partition),
                    cli_style::Theme::muted(format!("{} {}", Icons::ARROW_RIGHT, summary.output_dir.display()))
                );
                println!("{}", summary_table(summary));
            }
            OutputMode::Quiet => {}
        }
    }

    /// Print an error message
    pub fn error(&self, err: &crate::error::CollateError) {
        match self.mode {
            OutputMode::Json => {
                let category = err.category().to_string();
                let record = ErrorRecord {
                    success: false,
                    category: &category,
                    error: sanitize_error(&err.to_string()),
                };
                if let Ok(json) = serde_json::to_string(&record) {
                    eprintln!("{}", json);
                }
            }
            OutputMode::Human | OutputMode::Quiet => {
                cli_style::print_error(&sanitize_error(&err.to_string()), err.suggestion());
            }
        }
    }
}

fn summary_table(summary: &RunSummary) -> comfy_table::Table {
    let stats = &summary.stats;
    cli_style::stats_table(&[
        ("Sources", summary.sources.to_string()),
        ("Lines read", stats.lines_read.to_string()),
        ("Records written", stats.records_written.to_string()),
        ("Prefixes written", stats.prefixes_written.to_string()),
        ("Malformed", stats.malformed.to_string()),
        ("Filtered", stats.filtered.to_string()),
        ("Buckets", stats.pool.opened.to_string()),
        ("Reopens", stats.pool.reopened.to_string()),
        ("Evictions", stats.pool.evictions.to_string()),
        ("Peak open", stats.pool.peak_open.to_string()),
        ("Bytes written", format_bytes(stats.pool.bytes_written)),
        ("Duration", format_duration(summary.duration)),
    ])
}

/// Sanitize error messages by collapsing whitespace
pub fn sanitize_error(msg: &str) -> String {
    msg.split_whitespace().collect::<Vec<&str>>().join(" ")
}
