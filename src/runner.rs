/*!
 * Run driver: feeds input sources through one classifier and handle pool
 */

use crate::bucket::{output_base, FileSinkOpener};
use crate::config::CollateConfig;
use crate::error::{CollateError, Result};
use crate::partition::OutputNamer;
use collate_core_demux::{DemuxStats, HandlePool, LineClassifier};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub partition: String,
    pub sources: usize,
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub stats: DemuxStats,
    #[serde(serialize_with = "serialize_secs", rename = "duration_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Split `inputs` (standard input when empty) into bucket files for `partition`.
///
/// Inputs are read in order into a single pool. Every open handle is
/// flushed and closed before returning, also when the run fails; output
/// written before a failure is left in place.
pub fn run(partition: &str, inputs: &[PathBuf], config: &CollateConfig) -> Result<RunSummary> {
    config.validate()?;
    let table = config.partition_table()?;
    let descriptor = table.get(partition)?.clone();
    let marker = config.marker_byte()?;

    let output_dir = config.output_dir();
    if config.output_dir.is_some() {
        fs::create_dir_all(&output_dir)?;
    }

    let namer = OutputNamer::new(
        descriptor.clone(),
        output_base(inputs),
        config.output_suffix.clone(),
    );
    let opener = FileSinkOpener::new(&output_dir, namer);
    let mut pool = HandlePool::new(opener, config.pool_config());
    let mut classifier = LineClassifier::new(descriptor.classifier_config(marker));

    info!(
        partition,
        field = descriptor.field,
        filter = ?descriptor.filter,
        "starting run"
    );
    let start = Instant::now();

    let processed = process_sources(inputs, &mut classifier, &mut pool);
    let closed = pool.close_all();
    processed?;
    closed?;

    let stats = classifier.stats(&pool);
    let duration = start.elapsed();
    info!(
        records = stats.records_written,
        skipped = stats.skipped(),
        buckets = stats.pool.opened,
        evictions = stats.pool.evictions,
        "run complete"
    );

    Ok(RunSummary {
        partition: partition.to_string(),
        sources: inputs.len().max(1),
        output_dir,
        stats,
        duration,
    })
}

fn process_sources(
    inputs: &[PathBuf],
    classifier: &mut LineClassifier,
    pool: &mut HandlePool<FileSinkOpener>,
) -> Result<()> {
    if inputs.is_empty() {
        debug!("reading standard input");
        classifier.process(io::stdin().lock(), pool)?;
        discard_pending(classifier, "standard input");
        return Ok(());
    }

    for path in inputs {
        let file = File::open(path).map_err(|source| CollateError::Input {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "processing input");
        classifier.process(BufReader::new(file), pool)?;
        discard_pending(classifier, &path.display().to_string());
    }
    Ok(())
}

/// A directive does not carry over into the next input source
fn discard_pending(classifier: &mut LineClassifier, source: &str) {
    if classifier.clear_pending() {
        warn!(source, "directive at end of input had no following record");
    }
}
