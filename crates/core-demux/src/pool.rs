//! Bounded pool of append-mode bucket handles
//!
//! The pool maps integer bucket keys to open writers while keeping at most
//! `max_open` of them open at a time. Slots live in a dense vector indexed by
//! key; the vector grows in one step to `key + growth_headroom` whenever a key
//! falls past its end and never shrinks during a run.
//!
//! # Eviction
//!
//! The pool tracks a live window `[low, high)` of keys. When the cap is
//! reached and a key without an open handle arrives:
//!
//! - if the key lies below `low`, handles are closed from the top of the
//!   window (`high` is decremented first) so room is made near the bottom;
//! - otherwise handles are closed from the bottom, advancing `low` past each
//!   slot whether or not it held a handle.
//!
//! Evicted slots are remembered as closed. Reopening always goes through
//! [`SinkOpener::open_append`], so earlier output for a key is preserved and
//! writes for one key land in submission order.

use crate::error::{DemuxError, Result};
use crate::sink::SinkOpener;
use crate::stats::PoolStats;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Default cap on simultaneously open handles
pub const DEFAULT_MAX_OPEN: usize = 128;

/// Default number of slots allocated beyond the key that triggers growth
pub const DEFAULT_GROWTH_HEADROOM: usize = 128;

/// Default largest accepted bucket key
pub const DEFAULT_MAX_KEY: u64 = 1 << 20;

/// Upper bound for a configured `max_key`
pub const MAX_KEY_LIMIT: u64 = 1 << 24;

/// Limits applied by a [`HandlePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of handles open at once (at least 1)
    pub max_open: usize,
    /// Slots added past the triggering key when storage grows (at least 1)
    pub growth_headroom: usize,
    /// Keys above this value are rejected instead of allocating storage
    pub max_key: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open: DEFAULT_MAX_OPEN,
            growth_headroom: DEFAULT_GROWTH_HEADROOM,
            max_key: DEFAULT_MAX_KEY,
        }
    }
}

/// State of one bucket slot
enum Slot<S> {
    /// Never opened
    Vacant,
    /// Currently open
    Open(S),
    /// Opened earlier, then evicted or closed
    Closed,
}

impl<S> Default for Slot<S> {
    fn default() -> Self {
        Slot::Vacant
    }
}

/// Sparse, capacity-bounded map from bucket key to open writer
pub struct HandlePool<O: SinkOpener> {
    opener: O,
    config: PoolConfig,
    slots: Vec<Slot<O::Sink>>,
    active: usize,
    low: usize,
    high: usize,
    stats: PoolStats,
}

impl<O: SinkOpener> HandlePool<O> {
    /// Create an empty pool. No storage is allocated until the first write.
    pub fn new(opener: O, config: PoolConfig) -> Self {
        let config = PoolConfig {
            max_open: config.max_open.max(1),
            growth_headroom: config.growth_headroom.max(1),
            ..config
        };
        Self {
            opener,
            config,
            slots: Vec::new(),
            active: 0,
            low: 0,
            high: 0,
            stats: PoolStats::default(),
        }
    }

    /// Append `bytes` to the bucket for `key`, opening it if needed.
    ///
    /// Returns the number of bytes the handle accepted, which is less than
    /// `bytes.len()` only when the writer stops accepting data.
    pub fn write(&mut self, key: u64, bytes: &[u8]) -> Result<usize> {
        let index = self.index_for(key)?;
        self.ensure_capacity(key, index)?;

        if let Slot::Open(sink) = &mut self.slots[index] {
            let written = write_counted(sink, key, bytes)?;
            self.stats.bytes_written += written as u64;
            return Ok(written);
        }

        self.make_room(index)?;
        let mut sink = self.open(key, index)?;
        let result = write_counted(&mut sink, key, bytes);
        self.slots[index] = Slot::Open(sink);

        let written = result?;
        self.stats.bytes_written += written as u64;
        Ok(written)
    }

    /// Close every open handle and reset the live window.
    ///
    /// Allocated storage is kept. Calling this with nothing open is a no-op.
    /// All handles are released even if one fails to flush; the first
    /// failure is returned.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        let end = self.high.min(self.slots.len());
        for index in self.low..end {
            if let Err(e) = self.close_slot(index) {
                first_error.get_or_insert(e);
            }
        }
        if self.active > 0 {
            debug!(active = self.active, "handles open outside the live window");
        }

        self.active = 0;
        self.low = 0;
        self.high = 0;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of handles currently open
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Lowest key of the live window
    pub fn low_watermark(&self) -> usize {
        self.low
    }

    /// One past the highest key of the live window
    pub fn high_watermark(&self) -> usize {
        self.high
    }

    /// Number of allocated slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Configured cap on open handles
    pub fn max_open(&self) -> usize {
        self.config.max_open
    }

    /// Whether `key` currently holds an open handle
    pub fn is_open(&self, key: u64) -> bool {
        usize::try_from(key)
            .ok()
            .and_then(|i| self.slots.get(i))
            .is_some_and(|slot| matches!(slot, Slot::Open(_)))
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.slots.len(),
            ..self.stats
        }
    }

    /// Access the opener, e.g. to inspect an in-memory store
    pub fn opener(&self) -> &O {
        &self.opener
    }

    fn index_for(&self, key: u64) -> Result<usize> {
        if key > self.config.max_key {
            return Err(DemuxError::KeyTooLarge {
                key,
                max: self.config.max_key,
            });
        }
        usize::try_from(key).map_err(|_| DemuxError::KeyTooLarge {
            key,
            max: self.config.max_key,
        })
    }

    fn ensure_capacity(&mut self, key: u64, index: usize) -> Result<()> {
        if index < self.slots.len() {
            return Ok(());
        }
        let new_len = index.saturating_add(self.config.growth_headroom);
        debug!(
            from = self.slots.len(),
            to = new_len,
            key,
            "growing handle storage"
        );
        self.slots
            .try_reserve_exact(new_len - self.slots.len())
            .map_err(|source| DemuxError::Capacity {
                key,
                slots: new_len,
                source,
            })?;
        self.slots.resize_with(new_len, Slot::default);
        Ok(())
    }

    fn make_room(&mut self, index: usize) -> Result<()> {
        while self.active >= self.config.max_open {
            debug_assert!(self.low < self.high, "open handles outside the live window");
            if index < self.low {
                self.high -= 1;
                if self.close_slot(self.high)? {
                    self.stats.evictions += 1;
                    trace!(evicted = self.high, key = index, "evicted from top");
                }
            } else {
                let bottom = self.low;
                self.low += 1;
                if self.close_slot(bottom)? {
                    self.stats.evictions += 1;
                    trace!(evicted = bottom, key = index, "evicted from bottom");
                }
            }
        }
        Ok(())
    }

    fn open(&mut self, key: u64, index: usize) -> Result<O::Sink> {
        let reopen = matches!(self.slots[index], Slot::Closed);
        let sink = self.opener.open_append(key)?;

        self.low = self.low.min(index);
        self.high = self.high.max(index + 1);
        self.active += 1;
        self.stats.peak_open = self.stats.peak_open.max(self.active);

        if reopen {
            self.stats.reopened += 1;
            debug!(key, active = self.active, "reopened bucket");
        } else {
            self.stats.opened += 1;
            debug!(key, active = self.active, "opened bucket");
        }
        Ok(sink)
    }

    /// Close the handle at `index` if one is open. Returns whether it was.
    fn close_slot(&mut self, index: usize) -> Result<bool> {
        let Some(slot) = self.slots.get_mut(index) else {
            return Ok(false);
        };
        let mut sink = match std::mem::take(slot) {
            Slot::Open(sink) => sink,
            other => {
                *slot = other;
                return Ok(false);
            }
        };
        *slot = Slot::Closed;
        self.active -= 1;
        sink.flush().map_err(|source| DemuxError::Close {
            key: index as u64,
            source,
        })?;
        Ok(true)
    }
}

impl<O: SinkOpener> std::fmt::Debug for HandlePool<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlePool")
            .field("config", &self.config)
            .field("capacity", &self.slots.len())
            .field("active", &self.active)
            .field("low", &self.low)
            .field("high", &self.high)
            .finish()
    }
}

fn write_counted<W: Write>(sink: &mut W, key: u64, mut bytes: &[u8]) -> Result<usize> {
    let mut written = 0;
    while !bytes.is_empty() {
        match sink.write(bytes) {
            Ok(0) => break,
            Ok(n) => {
                written += n;
                bytes = &bytes[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(DemuxError::Write { key, source }),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryOpener;

    fn pool_with(max_open: usize) -> (HandlePool<MemoryOpener>, MemoryOpener) {
        let store = MemoryOpener::new();
        let config = PoolConfig {
            max_open,
            ..Default::default()
        };
        (HandlePool::new(store.clone(), config), store)
    }

    fn fill(pool: &mut HandlePool<MemoryOpener>, keys: std::ops::Range<u64>) {
        for key in keys {
            pool.write(key, format!("{}\n", key).as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_empty_pool_allocates_nothing() {
        let (pool, _) = pool_with(DEFAULT_MAX_OPEN);
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_write_returns_length() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        assert_eq!(pool.write(3, b"0 5 10\n").unwrap(), 7);
        assert!(pool.is_open(3));
        pool.close_all().unwrap();
        assert_eq!(store.text(3), "0 5 10\n");
    }

    #[test]
    fn test_growth_headroom() {
        let (mut pool, _) = pool_with(DEFAULT_MAX_OPEN);
        pool.write(5, b"a").unwrap();
        assert_eq!(pool.capacity(), 5 + DEFAULT_GROWTH_HEADROOM);
        pool.write(1000, b"b").unwrap();
        assert_eq!(pool.capacity(), 1000 + DEFAULT_GROWTH_HEADROOM);
        // keys inside the current storage do not grow it
        pool.write(1001, b"c").unwrap();
        assert_eq!(pool.capacity(), 1000 + DEFAULT_GROWTH_HEADROOM);
    }

    #[test]
    fn test_growth_keeps_existing_entries() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        pool.write(5, b"five\n").unwrap();
        pool.write(1000, b"thousand\n").unwrap();
        assert!(pool.is_open(5));
        assert!(pool.is_open(1000));
        pool.write(5, b"again\n").unwrap();
        pool.close_all().unwrap();
        assert_eq!(store.text(5), "five\nagain\n");
        assert_eq!(store.text(1000), "thousand\n");
    }

    #[test]
    fn test_growth_with_eviction_reopens_in_append_mode() {
        let (mut pool, store) = pool_with(1);
        pool.write(5, b"five\n").unwrap();
        pool.write(1000, b"thousand\n").unwrap();
        assert!(!pool.is_open(5));
        pool.write(5, b"again\n").unwrap();
        pool.close_all().unwrap();
        assert_eq!(store.text(5), "five\nagain\n");
        assert_eq!(store.open_count(5), 2);
        assert_eq!(pool.stats().reopened, 1);
    }

    #[test]
    fn test_unallocatable_growth_is_an_error() {
        let store = MemoryOpener::new();
        let config = PoolConfig {
            max_key: u64::MAX,
            ..Default::default()
        };
        let mut pool = HandlePool::new(store.clone(), config);
        let key = usize::MAX as u64 - 1;

        let err = pool.write(key, b"x\n").unwrap_err();
        assert!(matches!(err, DemuxError::Capacity { key: k, .. } if k == key));
        assert_eq!(pool.capacity(), 0);
        assert!(store.events().is_empty());

        pool.write(3, b"ok\n").unwrap();
        pool.close_all().unwrap();
        assert_eq!(store.text(3), "ok\n");
    }

    #[test]
    fn test_active_never_exceeds_cap() {
        let (mut pool, _) = pool_with(DEFAULT_MAX_OPEN);
        for i in 0..5000u64 {
            let key = (i * 7919 + 13) % 700;
            pool.write(key, b"x\n").unwrap();
            assert!(pool.active_count() <= DEFAULT_MAX_OPEN);
            assert!(pool.low_watermark() <= pool.high_watermark());
        }
        assert_eq!(pool.stats().peak_open, DEFAULT_MAX_OPEN);
    }

    #[test]
    fn test_eviction_from_bottom() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        fill(&mut pool, 0..128);
        assert_eq!(pool.active_count(), 128);
        assert_eq!(pool.low_watermark(), 0);
        assert_eq!(pool.high_watermark(), 128);

        pool.write(200, b"x\n").unwrap();
        assert_eq!(store.closed_order(), vec![0]);
        assert_eq!(pool.low_watermark(), 1);
        assert_eq!(pool.high_watermark(), 201);
        assert_eq!(pool.active_count(), 128);
    }

    #[test]
    fn test_bottom_eviction_skips_empty_slots() {
        let (mut pool, store) = pool_with(2);
        pool.write(10, b"a").unwrap();
        pool.write(20, b"b").unwrap();
        // low is still 0; slots 0..10 hold nothing and are walked past
        pool.write(30, b"c").unwrap();
        assert_eq!(store.closed_order(), vec![10]);
        assert_eq!(pool.low_watermark(), 11);
    }

    #[test]
    fn test_eviction_from_top_for_key_below_window() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        fill(&mut pool, 0..128);
        pool.write(128, b"128\n").unwrap();
        assert_eq!(pool.low_watermark(), 1);
        assert_eq!(pool.high_watermark(), 129);

        // key 0 is below the window: the highest live key goes first
        pool.write(0, b"0 again\n").unwrap();
        assert_eq!(store.closed_order(), vec![0, 128]);
        assert_eq!(pool.low_watermark(), 0);
        assert_eq!(pool.high_watermark(), 128);
        assert!(!pool.is_open(128));
        assert!(pool.is_open(0));

        pool.close_all().unwrap();
        assert_eq!(store.text(0), "0\n0 again\n");
        assert_eq!(store.text(128), "128\n");
    }

    #[test]
    fn test_top_eviction_walks_down_empty_slots() {
        let (mut pool, store) = pool_with(2);
        pool.write(4, b"a").unwrap();
        pool.write(5, b"b").unwrap();
        pool.write(50, b"c").unwrap(); // evicts 4, low = 5
        assert_eq!(pool.low_watermark(), 5);
        pool.write(1, b"d").unwrap(); // below window: top slot 50 is closed
        assert_eq!(store.closed_order(), vec![4, 50]);
        assert_eq!(pool.high_watermark(), 50);
        pool.write(2, b"e").unwrap(); // inside the window: bottom eviction closes 1
        assert_eq!(store.closed_order(), vec![4, 50, 1]);
    }

    #[test]
    fn test_same_key_order_across_reopen_cycles() {
        let (mut pool, store) = pool_with(3);
        let mut expected = String::new();
        for round in 0..20 {
            let line = format!("round {}\n", round);
            pool.write(7, line.as_bytes()).unwrap();
            expected.push_str(&line);
            // push key 7 out of the pool
            for other in [100 + round, 200 + round, 300 + round] {
                pool.write(other, b"noise\n").unwrap();
            }
        }
        pool.close_all().unwrap();
        assert_eq!(store.text(7), expected);
        assert!(store.open_count(7) > 1);
    }

    #[test]
    fn test_close_all_resets_state() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        fill(&mut pool, 3..10);
        let capacity = pool.capacity();
        pool.close_all().unwrap();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.low_watermark(), 0);
        assert_eq!(pool.high_watermark(), 0);
        assert_eq!(pool.capacity(), capacity);
        assert_eq!(store.closed_order().len(), 7);

        // idempotent with nothing open
        pool.close_all().unwrap();
        assert_eq!(store.closed_order().len(), 7);

        // reopening after close_all appends
        pool.write(3, b"more\n").unwrap();
        pool.close_all().unwrap();
        assert_eq!(store.text(3), "3\nmore\n");
    }

    #[test]
    fn test_open_failure_is_reported() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        store.fail_open(9);
        pool.write(1, b"ok\n").unwrap();
        let err = pool.write(9, b"nope\n").unwrap_err();
        assert!(matches!(err, DemuxError::Open { key: 9, .. }));
        assert_eq!(pool.active_count(), 1);
        assert!(!pool.is_open(9));
    }

    #[test]
    fn test_key_too_large() {
        let store = MemoryOpener::new();
        let config = PoolConfig {
            max_key: 100,
            ..Default::default()
        };
        let mut pool = HandlePool::new(store, config);
        assert!(pool.write(100, b"x").is_ok());
        let err = pool.write(101, b"x").unwrap_err();
        assert!(matches!(err, DemuxError::KeyTooLarge { key: 101, max: 100 }));
    }

    #[test]
    fn test_short_write_reported_as_count() {
        let (mut pool, store) = pool_with(DEFAULT_MAX_OPEN);
        store.limit_writes(2, 4);
        assert_eq!(pool.write(2, b"123456\n").unwrap(), 4);
        assert_eq!(pool.stats().bytes_written, 4);
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let (mut pool, _) = pool_with(0);
        assert_eq!(pool.max_open(), 1);
        pool.write(1, b"a").unwrap();
        pool.write(2, b"b").unwrap();
        assert_eq!(pool.active_count(), 1);
    }
}
