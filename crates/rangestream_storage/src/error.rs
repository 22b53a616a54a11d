//! Error types for list storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during list storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read an element beyond the end of a list.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: u64,
        /// The current list length.
        len: u64,
    },

    /// A range argument does not fit the list.
    #[error("invalid range [{start}, {stop}) for list of length {len}")]
    InvalidRange {
        /// Range start (inclusive).
        start: u64,
        /// Range end (exclusive).
        stop: u64,
        /// The current list length.
        len: u64,
    },

    /// A record is too large for one log frame.
    #[error("record of {size} bytes exceeds the frame limit of {max} bytes")]
    TooLarge {
        /// Encoded size of the offending field or payload.
        size: usize,
        /// Largest size a frame can hold.
        max: usize,
    },

    /// The operation log is corrupted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A log record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the damaged record.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Another process holds the storage directory.
    #[error("storage locked: another process has exclusive access")]
    Locked,

    /// The storage is closed.
    #[error("storage is closed")]
    Closed,

    /// The engine does not implement this primitive.
    #[error("operation not supported by this engine: {0}")]
    Unsupported(&'static str),
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
