//! Run counters for the pool and classifier

use serde::Serialize;

/// Handle pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buckets opened for the first time
    pub opened: u64,
    /// Opens of a bucket that had been evicted or closed earlier
    pub reopened: u64,
    /// Handles closed to stay under the open-handle cap
    pub evictions: u64,
    /// Highest number of handles open at once
    pub peak_open: usize,
    /// Size of the backing slot storage
    pub capacity: usize,
    /// Bytes accepted by bucket handles
    pub bytes_written: u64,
}

/// Classifier counters, including a snapshot of the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemuxStats {
    pub lines_read: u64,
    pub directives: u64,
    pub records_written: u64,
    pub prefixes_written: u64,
    pub malformed: u64,
    pub filtered: u64,
    #[serde(flatten)]
    pub pool: PoolStats,
}

impl DemuxStats {
    /// Lines that produced no output
    pub fn skipped(&self) -> u64 {
        self.malformed + self.filtered
    }
}
