//! Fault injection for list engines.
//!
//! [`FaultyListStore`] wraps another engine, records every primitive call
//! and fails chosen calls with an I/O error. It is how the delete paths
//! that must leave a stream unchanged, or must report lost events, are
//! exercised without a real disk failure. It can also impose a small push
//! limit, standing in for the file engine's frame limit.

use parking_lot::Mutex;
use rangestream_storage::{
    push_entry_size, push_overhead, ListStore, StorageError, StorageResult,
};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// A list engine primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// [`ListStore::push`]
    Push,
    /// [`ListStore::get`]
    Get,
    /// [`ListStore::len`]
    Len,
    /// [`ListStore::range`]
    Range,
    /// [`ListStore::trim`]
    Trim,
    /// [`ListStore::clear`]
    Clear,
    /// [`ListStore::keys`]
    Keys,
    /// [`ListStore::flush_all`]
    FlushAll,
    /// [`ListStore::delete_range`]
    DeleteRange,
}

/// Wraps an engine and fails selected primitive calls.
///
/// Faults are armed per primitive with a countdown: `fail_on(Trim, 0)` fails
/// the next trim, `fail_on(Trim, 1)` the one after. Each armed fault fires
/// once. A failed call never reaches the wrapped engine, so the stored data
/// is exactly what it was before the call.
pub struct FaultyListStore {
    inner: Arc<dyn ListStore>,
    native_delete: bool,
    push_limit: Option<usize>,
    armed: Mutex<HashMap<Primitive, usize>>,
    calls: Mutex<Vec<Primitive>>,
}

impl FaultyListStore {
    /// Wraps `inner`. The wrapper reports no native range delete.
    pub fn new(inner: Arc<dyn ListStore>) -> Self {
        Self {
            inner,
            native_delete: false,
            push_limit: None,
            armed: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Passes native range deletes through to the wrapped engine.
    #[must_use]
    pub fn with_native_delete(mut self) -> Self {
        self.native_delete = self.inner.has_native_range_delete();
        self
    }

    /// Reports `limit` as the push payload limit and rejects larger pushes
    /// with [`StorageError::TooLarge`].
    #[must_use]
    pub fn with_push_limit(mut self, limit: usize) -> Self {
        self.push_limit = Some(limit);
        self
    }

    /// Fails the call to `primitive` after `skip` successful ones.
    pub fn fail_on(&self, primitive: Primitive, skip: usize) {
        self.armed.lock().insert(primitive, skip);
    }

    /// Every primitive called so far, in order, including failed calls.
    pub fn calls(&self) -> Vec<Primitive> {
        self.calls.lock().clone()
    }

    /// Forgets the recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// The recorded calls that mutate data.
    pub fn mutations(&self) -> Vec<Primitive> {
        self.calls()
            .into_iter()
            .filter(|p| {
                matches!(
                    p,
                    Primitive::Push
                        | Primitive::Trim
                        | Primitive::Clear
                        | Primitive::FlushAll
                        | Primitive::DeleteRange
                )
            })
            .collect()
    }

    fn enter(&self, primitive: Primitive) -> StorageResult<()> {
        self.calls.lock().push(primitive);
        let mut armed = self.armed.lock();
        match armed.get_mut(&primitive) {
            Some(0) => {
                armed.remove(&primitive);
                Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("injected {primitive:?} failure"),
                )))
            }
            Some(skip) => {
                *skip -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl ListStore for FaultyListStore {
    fn push(&self, key: &[u8], values: &[Vec<u8>]) -> StorageResult<u64> {
        self.enter(Primitive::Push)?;
        if let Some(max) = self.push_limit {
            let size = values
                .iter()
                .map(|v| push_entry_size(v.len()))
                .sum::<usize>()
                + push_overhead(key.len());
            if size > max {
                return Err(StorageError::TooLarge { size, max });
            }
        }
        self.inner.push(key, values)
    }

    fn get(&self, key: &[u8], index: u64) -> StorageResult<Vec<u8>> {
        self.enter(Primitive::Get)?;
        self.inner.get(key, index)
    }

    fn len(&self, key: &[u8]) -> StorageResult<u64> {
        self.enter(Primitive::Len)?;
        self.inner.len(key)
    }

    fn range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<Vec<Vec<u8>>> {
        self.enter(Primitive::Range)?;
        self.inner.range(key, start, stop)
    }

    fn trim(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        self.enter(Primitive::Trim)?;
        self.inner.trim(key, start, stop)
    }

    fn clear(&self, key: &[u8]) -> StorageResult<u64> {
        self.enter(Primitive::Clear)?;
        self.inner.clear(key)
    }

    fn keys(&self, limit: usize) -> StorageResult<Vec<Vec<u8>>> {
        self.enter(Primitive::Keys)?;
        self.inner.keys(limit)
    }

    fn flush_all(&self) -> StorageResult<()> {
        self.enter(Primitive::FlushAll)?;
        self.inner.flush_all()
    }

    fn close(&self) -> StorageResult<()> {
        self.inner.close()
    }

    fn push_payload_limit(&self) -> Option<usize> {
        self.push_limit.or_else(|| self.inner.push_payload_limit())
    }

    fn has_native_range_delete(&self) -> bool {
        self.native_delete
    }

    fn delete_range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        self.enter(Primitive::DeleteRange)?;
        self.inner.delete_range(key, start, stop)
    }
}

impl std::fmt::Debug for FaultyListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyListStore")
            .field("native_delete", &self.native_delete)
            .field("push_limit", &self.push_limit)
            .field("armed", &*self.armed.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangestream_storage::MemoryListStore;

    #[test]
    fn armed_fault_fires_once_after_skips() {
        let store = FaultyListStore::new(Arc::new(MemoryListStore::new()));
        store.fail_on(Primitive::Push, 1);

        store.push(b"k", &[b"a".to_vec()]).unwrap();
        assert!(matches!(
            store.push(b"k", &[b"b".to_vec()]),
            Err(StorageError::Io(_))
        ));
        store.push(b"k", &[b"c".to_vec()]).unwrap();

        assert_eq!(store.range(b"k", 0, 2).unwrap(), vec![b"a".to_vec(), b"c".to_vec()]);
        assert_eq!(
            store.calls(),
            vec![Primitive::Push, Primitive::Push, Primitive::Push, Primitive::Range]
        );
    }

    #[test]
    fn push_limit_rejects_large_pushes() {
        // key "k" plus count is 9 bytes, each 3-byte value adds 7
        let store = FaultyListStore::new(Arc::new(MemoryListStore::new())).with_push_limit(16);
        assert_eq!(store.push_payload_limit(), Some(16));

        store.push(b"k", &[b"abc".to_vec()]).unwrap();
        assert!(matches!(
            store.push(b"k", &[b"abc".to_vec(), b"def".to_vec()]),
            Err(StorageError::TooLarge { size: 23, max: 16 })
        ));
        assert_eq!(store.len(b"k").unwrap(), 1);
    }

    #[test]
    fn native_delete_is_opt_in() {
        let store = FaultyListStore::new(Arc::new(MemoryListStore::new()));
        assert!(!store.has_native_range_delete());
        let store = store.with_native_delete();
        assert!(store.has_native_range_delete());
    }
}
