/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::CollateConfig;
use crate::error::{CollateError, Result};

/// Initialize structured logging based on configuration
pub fn init_logging(config: &CollateConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config)))
        .map_err(|e| CollateError::Config(format!("Failed to create log filter: {}", e)))?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stderr_logging(env_filter);
    }

    Ok(())
}

/// Effective level after applying the verbose flag
pub fn effective_level(config: &CollateConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Filter directives covering this crate and the demux core
fn default_directives(config: &CollateConfig) -> String {
    let level = effective_level(config);
    format!("collate={},collate_core_demux={}", level, level)
}

/// Initialize logging to stderr; stdout carries the run summary
fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Initialize logging to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| CollateError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false) // No ANSI colors in file
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Initialize logging with custom format for testing
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("collate=debug,collate_core_demux=debug"));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}
