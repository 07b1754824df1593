/*!
 * Collate CLI - Command Line Interface
 *
 * Splits a stream of integer records into one file per value of a chosen
 * field, keeping a bounded number of output files open.
 */

use clap::{Parser, ValueEnum};
use collate::{
    cli_style,
    config::{CollateConfig, LogLevel},
    error::{CollateError, Result, EXIT_FATAL, EXIT_SUCCESS},
    logging,
    output::OutputWriter,
    runner,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "collate")]
#[command(version, about = "Split integer record streams into per-value bucket files", long_about = None)]
struct Cli {
    /// Partition to split on (see --list-partitions)
    #[arg(value_name = "PARTITION", required_unless_present = "list_partitions")]
    partition: Option<String>,

    /// Input files, processed in order (standard input when omitted)
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Directory to write bucket files into
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of bucket files open at once
    #[arg(long, value_name = "N")]
    max_open_files: Option<usize>,

    /// Extension for bucket files
    #[arg(long = "suffix", value_name = "EXT")]
    suffix: Option<String>,

    /// Log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,

    /// Write logs to this file (JSON lines)
    #[arg(long = "log", value_name = "FILE")]
    log: Option<PathBuf>,

    /// Verbose logging (same as --log-level debug)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Print nothing on success
    #[arg(short = 'q', long)]
    quiet: bool,

    /// List the available partitions and exit
    #[arg(long)]
    list_partitions: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() { EXIT_FATAL } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let output = OutputWriter::new(cli.json, cli.quiet);
    let code = match run(cli, &output) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            output.error(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, output: &OutputWriter) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => CollateConfig::from_file(path)?,
        None => CollateConfig::default(),
    };

    // Override config with CLI arguments
    if let Some(dir) = cli.output_dir {
        config.output_dir = Some(dir);
    }
    if let Some(n) = cli.max_open_files {
        config.max_open_files = n;
    }
    if let Some(suffix) = cli.suffix {
        config.output_suffix = suffix;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    if cli.list_partitions {
        let table = config.partition_table()?;
        println!("{}", cli_style::partition_table(&table));
        return Ok(());
    }

    let partition = cli
        .partition
        .ok_or_else(|| CollateError::Config("Partition type is a required argument".to_string()))?;

    let summary = runner::run(&partition, &cli.inputs, &config)?;
    output.summary(&summary);
    Ok(())
}
