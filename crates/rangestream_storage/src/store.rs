//! List engine trait definition.

use crate::error::{StorageError, StorageResult};

/// A keyed store of ordered lists of opaque byte values.
///
/// Engines provide only the primitives a stream needs: append at the tail,
/// positional reads, and trimming to a contiguous sub-range. Removing an
/// arbitrary middle range is optional; engines that cannot do it natively
/// leave [`ListStore::delete_range`] unimplemented and callers fall back to
/// reading the tail, trimming and re-appending.
///
/// # Invariants
///
/// - Ranges are half-open: `[start, stop)`
/// - `push` appends values in order and returns the new list length
/// - Each primitive is atomic with respect to other primitives on the same key
/// - A list that becomes empty no longer appears in [`ListStore::keys`]
/// - Engines must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryListStore`] - For testing
/// - [`super::FileListStore`] - For persistent storage
pub trait ListStore: Send + Sync {
    /// Appends `values` to the tail of the list at `key`.
    ///
    /// Creates the list if it does not exist. Returns the new length.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is closed or an I/O error occurs.
    fn push(&self, key: &[u8], values: &[Vec<u8>]) -> StorageResult<u64>;

    /// Returns the value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IndexOutOfRange`] if `index >= len`.
    fn get(&self, key: &[u8], index: u64) -> StorageResult<Vec<u8>>;

    /// Returns the number of values in the list (0 if it does not exist).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is closed.
    fn len(&self, key: &[u8]) -> StorageResult<u64>;

    /// Returns a copy of the values in `[start, stop)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRange`] unless `start <= stop <= len`.
    fn range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<Vec<Vec<u8>>>;

    /// Keeps only the values in `[start, stop)`, discarding the prefix
    /// before `start` and the suffix from `stop` on.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRange`] unless `start <= stop <= len`.
    fn trim(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()>;

    /// Removes the whole list. Returns how many values were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is closed or an I/O error occurs.
    fn clear(&self, key: &[u8]) -> StorageResult<u64>;

    /// Returns up to `limit` non-empty list keys in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is closed.
    fn keys(&self, limit: usize) -> StorageResult<Vec<Vec<u8>>>;

    /// Erases every list.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is closed or an I/O error occurs.
    fn flush_all(&self) -> StorageResult<()>;

    /// Releases the engine's resources. Later calls fail with
    /// [`StorageError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an error if pending writes cannot be made durable.
    fn close(&self) -> StorageResult<()>;

    /// Largest `push` payload the engine accepts, as counted by
    /// [`crate::push_overhead`] and [`crate::push_entry_size`]. `None` means
    /// unbounded.
    fn push_payload_limit(&self) -> Option<usize> {
        None
    }

    /// Whether [`ListStore::delete_range`] is implemented.
    fn has_native_range_delete(&self) -> bool {
        false
    }

    /// Removes the values in `[start, stop)` in one atomic step.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`StorageError::Unsupported`].
    fn delete_range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        let _ = (key, start, stop);
        Err(StorageError::Unsupported("delete_range"))
    }
}

/// Validates `[start, stop)` against a list of length `len`.
pub(crate) fn check_bounds(start: u64, stop: u64, len: u64) -> StorageResult<()> {
    if start > stop || stop > len {
        return Err(StorageError::InvalidRange { start, stop, len });
    }
    Ok(())
}
