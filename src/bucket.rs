/*!
 * Bucket files on disk
 *
 * Opens one append-mode file per bucket key, named by the partition's
 * [`OutputNamer`], inside the configured output directory.
 */

use crate::partition::OutputNamer;
use collate_core_demux::{DemuxError, SinkOpener};
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Buffer size for each open bucket file
const BUCKET_BUFFER_SIZE: usize = 8 * 1024;

/// Opens bucket files in append mode
#[derive(Debug, Clone)]
pub struct FileSinkOpener {
    dir: PathBuf,
    namer: OutputNamer,
}

impl FileSinkOpener {
    pub fn new(dir: impl Into<PathBuf>, namer: OutputNamer) -> Self {
        Self {
            dir: dir.into(),
            namer,
        }
    }

    /// Full path of the bucket file for `key`
    pub fn path_for(&self, key: u64) -> Result<PathBuf, DemuxError> {
        Ok(self.dir.join(self.namer.file_name(key)?))
    }
}

impl SinkOpener for FileSinkOpener {
    type Sink = BufWriter<File>;

    fn open_append(&mut self, key: u64) -> Result<Self::Sink, DemuxError> {
        let path = self.path_for(key)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| {
                DemuxError::Open {
                    key,
                    source: std::io::Error::new(
                        source.kind(),
                        format!("{}: {}", path.display(), source),
                    ),
                }
            })?;
        debug!(key, path = %path.display(), "opened bucket file");
        Ok(BufWriter::with_capacity(BUCKET_BUFFER_SIZE, file))
    }
}

/// Base name for bucket files derived from the input list
///
/// A single named input contributes its file name without the last
/// extension; standard input or several inputs give an empty base.
pub fn output_base(inputs: &[PathBuf]) -> String {
    match inputs {
        [single] => base_from_path(single),
        _ => String::new(),
    }
}

fn base_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) => name[..dot].to_string(),
        None => name,
    }
}
