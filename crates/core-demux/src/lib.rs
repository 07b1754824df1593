//! Collate Core Demux: bounded fan-out demultiplexer
//!
//! # Overview
//!
//! This crate routes a line-oriented stream of integer records into many
//! output buckets, keyed by one field of each record, while holding only a
//! bounded number of output handles open at once.
//!
//! - **Handle Pool**: sparse key → handle map with a capped number of open
//!   handles and a two-sided eviction policy
//! - **Line Classifier**: tokenizes lines, extracts and filters the bucket
//!   key, and carries directive lines onto the next written record
//! - **Sink seam**: the pool opens bucket writers through [`SinkOpener`],
//!   so naming and storage stay outside this crate
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - File naming or partition tables
//! - Configuration files
//! - Command-line handling
//!
//! # Architecture
//!
//! ```text
//!   input lines
//!        │
//!        ▼
//! ┌─────────────────────────────┐
//! │  LineClassifier             │  ← directive / record / skip
//! │  (field, filter, prefix)    │
//! └─────────────┬───────────────┘
//!               │ write(key, bytes)
//!               ▼
//! ┌─────────────────────────────┐
//! │  HandlePool                 │  ← cap, growth, eviction
//! │  (live window [low, high))  │
//! └─────────────┬───────────────┘
//!               │ open_append(key)
//!               ▼
//!          SinkOpener
//! ```
//!
//! # Usage Example
//!
//! ```
//! use collate_core_demux::{
//!     ClassifierConfig, HandlePool, LineClassifier, MemoryOpener, PoolConfig,
//! };
//! use std::io::Cursor;
//!
//! let store = MemoryOpener::new();
//! let mut pool = HandlePool::new(store.clone(), PoolConfig::default());
//! let mut classifier = LineClassifier::new(ClassifierConfig::new(0, Some(0)));
//!
//! classifier
//!     .process(Cursor::new("0 5 10\n1 5 10\n0 3 8\n"), &mut pool)
//!     .unwrap();
//! pool.close_all().unwrap();
//!
//! assert_eq!(store.text(0), "0 5 10\n0 3 8\n");
//! ```

pub mod classifier;
pub mod error;
pub mod pool;
pub mod sink;
pub mod stats;
pub mod token;

// Re-export main types for convenience
pub use classifier::{ClassifierConfig, LineClass, LineClassifier, DEFAULT_DIRECTIVE_MARKER};
pub use error::DemuxError;
pub use pool::{
    HandlePool, PoolConfig, DEFAULT_GROWTH_HEADROOM, DEFAULT_MAX_KEY, DEFAULT_MAX_OPEN,
    MAX_KEY_LIMIT,
};
pub use sink::{MemoryOpener, MemorySink, SinkEvent, SinkOpener};
pub use stats::{DemuxStats, PoolStats};
