//! # RangeStream Storage
//!
//! List storage engines for RangeStream.
//!
//! This crate provides the lowest-level storage abstraction for RangeStream:
//! a keyed collection of **append-mostly lists of opaque byte values**.
//! Engines do not interpret the values they store.
//!
//! ## Design Principles
//!
//! - Engines expose only list primitives (push, index, range, trim, clear)
//! - A middle-range delete is optional; callers build it from trim + push
//! - Must be `Send + Sync` for concurrent access
//! - Stream semantics (negative indices, locking) live in `rangestream_core`
//!
//! ## Available Engines
//!
//! - [`MemoryListStore`] - For testing and ephemeral streams
//! - [`FileListStore`] - Persistent, log-structured storage in a directory
//!
//! ## Example
//!
//! ```rust
//! use rangestream_storage::{ListStore, MemoryListStore};
//!
//! let store = MemoryListStore::new();
//! store.push(b"orders", &[b"created".to_vec(), b"paid".to_vec()]).unwrap();
//! assert_eq!(store.len(b"orders").unwrap(), 2);
//! assert_eq!(store.get(b"orders", 1).unwrap(), b"paid");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod record;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileListStore;
pub use memory::MemoryListStore;
pub use record::{
    compute_crc32, max_value_size, push_entry_size, push_overhead, LogRecord, LogRecordType,
    LOG_MAGIC, LOG_VERSION, MAX_PAYLOAD_SIZE,
};
pub use store::ListStore;
