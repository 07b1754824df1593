//! Output sink abstraction
//!
//! The pool never touches the filesystem directly. It asks a [`SinkOpener`]
//! for an append-mode writer each time a bucket has to be (re)opened, which
//! keeps naming and storage concerns outside the core.
//!
//! [`MemoryOpener`] is an in-memory implementation used by tests and
//! benchmarks. It records open and close events so eviction order can be
//! observed.

use crate::error::{DemuxError, Result};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Opens append-mode writers for bucket keys
pub trait SinkOpener {
    /// Writer handed out for an open bucket
    type Sink: Write;

    /// Open the bucket for `key` in append mode.
    ///
    /// Reopening a key after eviction must never discard what was written
    /// to it earlier.
    fn open_append(&mut self, key: u64) -> Result<Self::Sink>;
}

/// Lifecycle event recorded by [`MemoryOpener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Opened(u64),
    Closed(u64),
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: HashMap<u64, Vec<u8>>,
    events: Vec<SinkEvent>,
    fail_open: HashSet<u64>,
    write_limits: HashMap<u64, usize>,
}

/// In-memory bucket store
///
/// Cloning shares the underlying store, so a test can keep a handle while the
/// pool owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only happens after a panicking test
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Flushed content of a bucket
    pub fn contents(&self, key: u64) -> Vec<u8> {
        self.lock().buckets.get(&key).cloned().unwrap_or_default()
    }

    /// Flushed content of a bucket as UTF-8 text
    pub fn text(&self, key: u64) -> String {
        String::from_utf8_lossy(&self.contents(key)).into_owned()
    }

    /// Keys that have received at least one open
    pub fn keys(&self) -> Vec<u64> {
        let mut keys: Vec<u64> = self.lock().buckets.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Open/close events in the order they happened
    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().events.clone()
    }

    /// Keys in the order they were closed
    pub fn closed_order(&self) -> Vec<u64> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Closed(k) => Some(*k),
                SinkEvent::Opened(_) => None,
            })
            .collect()
    }

    /// Number of times `key` has been opened
    pub fn open_count(&self, key: u64) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| **e == SinkEvent::Opened(key))
            .count()
    }

    /// Make every open of `key` fail with a permission error
    pub fn fail_open(&self, key: u64) {
        self.lock().fail_open.insert(key);
    }

    /// Accept at most `limit` more bytes for `key`, then report zero-length writes
    pub fn limit_writes(&self, key: u64, limit: usize) {
        self.lock().write_limits.insert(key, limit);
    }
}

impl SinkOpener for MemoryOpener {
    type Sink = MemorySink;

    fn open_append(&mut self, key: u64) -> Result<MemorySink> {
        let mut state = self.lock();
        if state.fail_open.contains(&key) {
            return Err(DemuxError::Open {
                key,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "open refused"),
            });
        }
        state.buckets.entry(key).or_default();
        state.events.push(SinkEvent::Opened(key));
        drop(state);

        Ok(MemorySink {
            key,
            pending: Vec::new(),
            store: self.clone(),
        })
    }
}

/// Buffered writer into a [`MemoryOpener`] bucket
///
/// Bytes become visible in the store only on flush, mirroring a buffered
/// file writer. Dropping the sink flushes and records a close event.
#[derive(Debug)]
pub struct MemorySink {
    key: u64,
    pending: Vec<u8>,
    store: MemoryOpener,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.store.lock();
        let n = match state.write_limits.get_mut(&self.key) {
            Some(limit) => {
                let n = buf.len().min(*limit);
                *limit -= n;
                n
            }
            None => buf.len(),
        };
        drop(state);
        self.pending.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let mut state = self.store.lock();
            state
                .buckets
                .entry(self.key)
                .or_default()
                .extend_from_slice(&self.pending);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        let _ = self.flush();
        self.store.lock().events.push(SinkEvent::Closed(self.key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_visible_after_flush() {
        let mut opener = MemoryOpener::new();
        let mut sink = opener.open_append(4).unwrap();
        sink.write_all(b"abc").unwrap();
        assert!(opener.contents(4).is_empty());
        sink.flush().unwrap();
        assert_eq!(opener.contents(4), b"abc");
    }

    #[test]
    fn test_memory_sink_reopen_appends() {
        let mut opener = MemoryOpener::new();
        {
            let mut sink = opener.open_append(1).unwrap();
            sink.write_all(b"one\n").unwrap();
        }
        {
            let mut sink = opener.open_append(1).unwrap();
            sink.write_all(b"two\n").unwrap();
        }
        assert_eq!(opener.text(1), "one\ntwo\n");
        assert_eq!(opener.open_count(1), 2);
        assert_eq!(opener.closed_order(), vec![1, 1]);
    }

    #[test]
    fn test_fail_open() {
        let mut opener = MemoryOpener::new();
        opener.fail_open(9);
        assert!(matches!(
            opener.open_append(9),
            Err(DemuxError::Open { key: 9, .. })
        ));
    }

    #[test]
    fn test_write_limit() {
        let mut opener = MemoryOpener::new();
        opener.limit_writes(2, 3);
        let mut sink = opener.open_append(2).unwrap();
        assert_eq!(sink.write(b"hello").unwrap(), 3);
        assert_eq!(sink.write(b"lo").unwrap(), 0);
    }
}
