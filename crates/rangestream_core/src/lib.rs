//! # RangeStream Core
//!
//! Named, append-mostly event streams with indexed range reads and range
//! deletes, over pluggable storage backends.
//!
//! This crate provides:
//! - [`BackendRegistry`] - backend factories keyed by type name
//! - [`Backend`] / [`BackendStream`] - the contract every binding implements
//! - [`StreamHandle`] - the reference-counted, caller-facing stream handle
//! - [`ListBackend`] - streams stored as lists in a [`ListStore`] engine
//! - [`NullBackend`] - accepts every event and keeps none
//! - [`range`] - negative-index normalization and range validation
//!
//! ## Example
//!
//! ```rust
//! use rangestream_core::{BackendRegistry, MEMORY_BACKEND};
//!
//! let registry = BackendRegistry::with_defaults();
//! let backend = registry.create(MEMORY_BACKEND, &serde_json::Value::Null).unwrap();
//!
//! let stream = backend.get_stream("orders").unwrap();
//! for event in ["created", "paid", "shipped", "delivered"] {
//!     stream.add(event).unwrap();
//! }
//! assert!(stream.del(1, 3).unwrap());
//!
//! let events = stream.read_to_vec(0, -1).unwrap();
//! assert_eq!(events, vec![b"created".to_vec(), b"delivered".to_vec()]);
//! stream.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod list;
mod null;
pub mod range;
mod registry;
mod stream;

pub use backend::Backend;
pub use config::{BackendConfig, ListOptions};
pub use error::{DelStep, ErrorList, StreamError, StreamResult};
pub use list::{ListBackend, ListStream, RangeIter, STREAM_SCAN_LIMIT};
pub use null::{NullBackend, NullStream};
pub use registry::{BackendFactory, BackendRegistry, LIST_BACKEND, MEMORY_BACKEND, NULL_BACKEND};
pub use stream::{BackendStream, Event, EventIter, StreamHandle};

pub use rangestream_storage::{FileListStore, ListStore, MemoryListStore, StorageError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
