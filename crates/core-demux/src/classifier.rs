//! Line classification and commit protocol
//!
//! Each input line is either a directive (its first byte is the configured
//! marker) or a data record. Directives are held as the pending prefix; a
//! later record that passes filtering writes the prefix and then itself into
//! the record's bucket.
//!
//! Rules for the pending prefix:
//! - a new directive replaces any prefix still pending;
//! - a written record consumes it, and so does a record rejected by the
//!   filter;
//! - a malformed line leaves it in place;
//! - it is written at most once, immediately before the payload.

use crate::error::{DemuxError, Result};
use crate::pool::HandlePool;
use crate::sink::SinkOpener;
use crate::stats::DemuxStats;
use crate::token;
use std::io::BufRead;
use tracing::trace;

/// Default first byte of a directive line
pub const DEFAULT_DIRECTIVE_MARKER: u8 = b'#';

/// How records are keyed and filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// First byte that marks a directive line
    pub marker: u8,
    /// Number of leading tokens skipped before the key token
    pub field: usize,
    /// When set, only records whose key equals this value are written
    pub filter: Option<u64>,
}

impl ClassifierConfig {
    pub fn new(field: usize, filter: Option<u64>) -> Self {
        Self {
            marker: DEFAULT_DIRECTIVE_MARKER,
            field,
            filter,
        }
    }
}

/// Classification of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Directive line, captured as the pending prefix
    Directive,
    /// Record routed to the bucket with this key
    Record(u64),
    /// Too few tokens to extract the key
    Malformed,
    /// Key present but rejected by the filter
    Filtered(u64),
}

/// Streaming classifier feeding a [`HandlePool`]
#[derive(Debug)]
pub struct LineClassifier {
    config: ClassifierConfig,
    pending: Option<Vec<u8>>,
    stats: DemuxStats,
}

impl LineClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            pending: None,
            stats: DemuxStats::default(),
        }
    }

    /// Classify a line without side effects
    pub fn classify(&self, line: &[u8]) -> LineClass {
        if line.first() == Some(&self.config.marker) {
            return LineClass::Directive;
        }
        match token::field(line, self.config.field) {
            None => LineClass::Malformed,
            Some(key) => match self.config.filter {
                Some(wanted) if wanted != key => LineClass::Filtered(key),
                _ => LineClass::Record(key),
            },
        }
    }

    /// Classify one line and commit it to the pool.
    ///
    /// A record issues one or two writes for its key: the pending prefix, if
    /// any, then the line itself. A short write on either is an error.
    pub fn feed<O: SinkOpener>(
        &mut self,
        line: &[u8],
        pool: &mut HandlePool<O>,
    ) -> Result<LineClass> {
        self.stats.lines_read += 1;
        let class = self.classify(line);

        match class {
            LineClass::Directive => {
                self.stats.directives += 1;
                if self.pending.is_some() {
                    trace!("directive replaces pending prefix");
                }
                self.pending = Some(line.to_vec());
            }
            LineClass::Record(key) => self.commit(key, line, pool)?,
            LineClass::Malformed => {
                self.stats.malformed += 1;
                trace!(line = self.stats.lines_read, "skipping malformed record");
            }
            LineClass::Filtered(key) => {
                self.stats.filtered += 1;
                if self.pending.take().is_some() {
                    trace!(key, "prefix dropped with filtered record");
                }
                trace!(line = self.stats.lines_read, key, "record excluded by filter");
            }
        }

        Ok(class)
    }

    /// Feed every line of `reader` into the pool.
    ///
    /// Lines keep their terminating newline; a final line without one is
    /// written as-is.
    pub fn process<R: BufRead, O: SinkOpener>(
        &mut self,
        mut reader: R,
        pool: &mut HandlePool<O>,
    ) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(DemuxError::Read)?;
            if n == 0 {
                return Ok(());
            }
            self.feed(&line, pool)?;
        }
    }

    /// Directive currently waiting for a record
    pub fn pending_prefix(&self) -> Option<&[u8]> {
        self.pending.as_deref()
    }

    /// Drop the pending prefix. Returns whether one was pending.
    pub fn clear_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Counters so far, with a snapshot of the pool's counters
    pub fn stats<O: SinkOpener>(&self, pool: &HandlePool<O>) -> DemuxStats {
        DemuxStats {
            pool: pool.stats(),
            ..self.stats
        }
    }

    fn commit<O: SinkOpener>(
        &mut self,
        key: u64,
        line: &[u8],
        pool: &mut HandlePool<O>,
    ) -> Result<()> {
        if let Some(prefix) = self.pending.take() {
            let written = pool.write(key, &prefix)?;
            ensure_complete(key, prefix.len(), written)?;
            self.stats.prefixes_written += 1;
        }

        let written = pool.write(key, line)?;
        ensure_complete(key, line.len(), written)?;
        self.stats.records_written += 1;
        Ok(())
    }
}

fn ensure_complete(key: u64, expected: usize, written: usize) -> Result<()> {
    if written != expected {
        return Err(DemuxError::ShortWrite {
            key,
            expected,
            written,
        });
    }
    Ok(())
}
