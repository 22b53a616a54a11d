//! In-memory list engine for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{check_bounds, ListStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// The list index shared by the in-memory and file engines.
///
/// Empty lists are never stored: every primitive that empties a list
/// removes its key.
#[derive(Debug, Default, Clone)]
pub(crate) struct Lists {
    lists: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl Lists {
    pub(crate) fn len(&self, key: &[u8]) -> u64 {
        self.lists.get(key).map_or(0, |list| list.len() as u64)
    }

    pub(crate) fn get(&self, key: &[u8], index: u64) -> StorageResult<Vec<u8>> {
        let len = self.len(key);
        self.lists
            .get(key)
            .and_then(|list| list.get(index as usize))
            .cloned()
            .ok_or(StorageError::IndexOutOfRange { index, len })
    }

    pub(crate) fn range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<Vec<Vec<u8>>> {
        check_bounds(start, stop, self.len(key))?;
        Ok(match self.lists.get(key) {
            Some(list) => list[start as usize..stop as usize].to_vec(),
            None => Vec::new(),
        })
    }

    pub(crate) fn push(&mut self, key: &[u8], values: &[Vec<u8>]) -> u64 {
        if values.is_empty() {
            return self.len(key);
        }
        let list = self.lists.entry(key.to_vec()).or_default();
        list.extend_from_slice(values);
        list.len() as u64
    }

    pub(crate) fn trim(&mut self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        check_bounds(start, stop, self.len(key))?;
        if start == stop {
            self.lists.remove(key);
            return Ok(());
        }
        if let Some(list) = self.lists.get_mut(key) {
            list.truncate(stop as usize);
            list.drain(..start as usize);
        }
        Ok(())
    }

    pub(crate) fn delete_range(&mut self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        check_bounds(start, stop, self.len(key))?;
        let now_empty = match self.lists.get_mut(key) {
            Some(list) => {
                list.drain(start as usize..stop as usize);
                list.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.lists.remove(key);
        }
        Ok(())
    }

    pub(crate) fn clear(&mut self, key: &[u8]) -> u64 {
        self.lists.remove(key).map_or(0, |list| list.len() as u64)
    }

    pub(crate) fn keys(&self, limit: usize) -> Vec<Vec<u8>> {
        self.lists.keys().take(limit).cloned().collect()
    }

    pub(crate) fn flush_all(&mut self) {
        self.lists.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<Vec<u8>>)> {
        self.lists.iter()
    }
}

#[derive(Debug, Default)]
struct State {
    lists: Lists,
    closed: bool,
}

impl State {
    fn open(&self) -> StorageResult<&Lists> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(&self.lists)
    }

    fn open_mut(&mut self) -> StorageResult<&mut Lists> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(&mut self.lists)
    }
}

/// An in-memory list engine.
///
/// This engine keeps every list in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral streams that don't need persistence
///
/// Unlike [`super::FileListStore`] it implements a native
/// [`ListStore::delete_range`].
///
/// # Example
///
/// ```rust
/// use rangestream_storage::{ListStore, MemoryListStore};
///
/// let store = MemoryListStore::new();
/// assert_eq!(store.push(b"s", &[b"a".to_vec()]).unwrap(), 1);
/// assert_eq!(store.keys(10).unwrap(), vec![b"s".to_vec()]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryListStore {
    state: RwLock<State>,
}

impl MemoryListStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `lists`.
    ///
    /// Useful for testing against known contents.
    #[must_use]
    pub fn with_lists<K, I>(lists: I) -> Self
    where
        K: Into<Vec<u8>>,
        I: IntoIterator<Item = (K, Vec<Vec<u8>>)>,
    {
        let mut index = Lists::default();
        for (key, values) in lists {
            index.push(&key.into(), &values);
        }
        Self {
            state: RwLock::new(State {
                lists: index,
                closed: false,
            }),
        }
    }
}

impl ListStore for MemoryListStore {
    fn push(&self, key: &[u8], values: &[Vec<u8>]) -> StorageResult<u64> {
        Ok(self.state.write().open_mut()?.push(key, values))
    }

    fn get(&self, key: &[u8], index: u64) -> StorageResult<Vec<u8>> {
        self.state.read().open()?.get(key, index)
    }

    fn len(&self, key: &[u8]) -> StorageResult<u64> {
        Ok(self.state.read().open()?.len(key))
    }

    fn range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<Vec<Vec<u8>>> {
        self.state.read().open()?.range(key, start, stop)
    }

    fn trim(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        self.state.write().open_mut()?.trim(key, start, stop)
    }

    fn clear(&self, key: &[u8]) -> StorageResult<u64> {
        Ok(self.state.write().open_mut()?.clear(key))
    }

    fn keys(&self, limit: usize) -> StorageResult<Vec<Vec<u8>>> {
        Ok(self.state.read().open()?.keys(limit))
    }

    fn flush_all(&self) -> StorageResult<()> {
        self.state.write().open_mut()?.flush_all();
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        self.state.write().closed = true;
        Ok(())
    }

    fn has_native_range_delete(&self) -> bool {
        true
    }

    fn delete_range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        self.state.write().open_mut()?.delete_range(key, start, stop)
    }
}
