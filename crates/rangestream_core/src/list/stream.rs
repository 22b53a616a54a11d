//! A single list-backed stream.

use super::iter::RangeIter;
use crate::config::ListOptions;
use crate::error::{DelStep, StreamError, StreamResult};
use crate::range;
use crate::stream::{BackendStream, Event, EventIter};
use parking_lot::RwLock;
use rangestream_storage::{push_entry_size, push_overhead, ListStore, StorageError};
use std::sync::Arc;

/// One stream stored as the list `name` in a [`ListStore`].
///
/// All handles for the same name share one `ListStream`. Its lock is taken
/// shared by [`BackendStream::add`] and [`BackendStream::read`] and
/// exclusively by [`BackendStream::del`], so deletes never interleave with
/// appends or with an unfinished read.
///
/// Shared acquisitions queue behind a waiting delete, so a steady flow of
/// appends and reads cannot starve it. The flip side is a caller contract:
/// a thread holding an unfinished [`RangeIter`] must not append to, read or
/// delete from the same stream until it finishes or drops the iterator. If
/// another thread's delete is queued in between, the nested call waits for
/// the delete and the delete waits for the iterator.
pub struct ListStream {
    name: String,
    key: Vec<u8>,
    engine: Arc<dyn ListStore>,
    max_event_size: usize,
    /// Payload budget for the values of one push, after the key.
    push_budget: Option<usize>,
    native_delete: bool,
    lock: RwLock<()>,
}

impl ListStream {
    pub(crate) fn new(name: &str, engine: Arc<dyn ListStore>, options: &ListOptions) -> Self {
        let native_delete = options.prefer_native_delete && engine.has_native_range_delete();
        let push_budget = engine
            .push_payload_limit()
            .map(|limit| limit.saturating_sub(push_overhead(name.len())));
        // An event must also fit a push of its own
        let max_event_size = push_budget.map_or(options.max_event_size, |budget| {
            options
                .max_event_size
                .min(budget.saturating_sub(push_entry_size(0)))
        });
        Self {
            name: name.to_string(),
            key: name.as_bytes().to_vec(),
            engine,
            max_event_size,
            push_budget,
            native_delete,
            lock: RwLock::new(()),
        }
    }

    /// Returns the stream name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Like [`BackendStream::read`] but returns the concrete cursor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` or the engine error from the length query.
    pub fn iter(&self, from: u64, to: i64) -> StreamResult<RangeIter<'_>> {
        let from = range::start_index(from, to)?;
        if from == to {
            return Ok(RangeIter::empty(self.engine.as_ref(), &self.key));
        }

        // Ownership of the guard moves into the cursor
        let guard = self.lock.read();
        let len = self.engine.len(&self.key)?;
        let (from, to) = range::normalize(from, to, len);
        if from == to {
            return Ok(RangeIter::empty(self.engine.as_ref(), &self.key));
        }
        let window = range::check_range(from, to, len)?;
        Ok(RangeIter::new(guard, self.engine.as_ref(), &self.key, window))
    }

    fn failed(&self, step: DelStep) -> impl FnOnce(StorageError) -> StreamError + '_ {
        move |source| StreamError::DeleteFailed {
            stream: self.name.clone(),
            step,
            source,
        }
    }

    fn clear(&self) -> StreamResult<bool> {
        let removed = self.engine.clear(&self.key).map_err(self.failed(DelStep::Clear))?;
        Ok(removed != 0)
    }

    /// Splits `tail` into runs that each fit one push.
    fn batches<'a>(&self, tail: &'a [Event]) -> Result<Vec<&'a [Event]>, StorageError> {
        let Some(budget) = self.push_budget else {
            return Ok(vec![tail]);
        };
        let mut batches = Vec::new();
        let (mut start, mut used) = (0, 0usize);
        for (i, event) in tail.iter().enumerate() {
            let size = push_entry_size(event.len());
            if size > budget {
                return Err(StorageError::TooLarge { size, max: budget });
            }
            if used + size > budget {
                batches.push(&tail[start..i]);
                (start, used) = (i, 0);
            }
            used += size;
        }
        batches.push(&tail[start..]);
        Ok(batches)
    }

    /// Removes `[from, to)` from the middle of the stream: read the tail,
    /// trim to the prefix, append the tail again in as few pushes as the
    /// engine's push limit allows.
    fn splice_out(&self, from: u64, to: u64, len: u64) -> StreamResult<()> {
        let tail = self
            .engine
            .range(&self.key, to, len)
            .map_err(self.failed(DelStep::ReadTail))?;
        let batches = self.batches(&tail).map_err(self.failed(DelStep::ReadTail))?;
        self.engine
            .trim(&self.key, 0, from)
            .map_err(self.failed(DelStep::Trim))?;

        let mut restored = 0;
        for batch in batches {
            if let Err(source) = self.engine.push(&self.key, batch) {
                let lost = tail.len() - restored;
                tracing::error!(
                    stream = %self.name,
                    lost,
                    error = %source,
                    "re-append after trim failed, tail of stream lost"
                );
                return Err(StreamError::PartialDeleteDataLoss {
                    stream: self.name.clone(),
                    lost,
                    source,
                });
            }
            restored += batch.len();
        }
        Ok(())
    }
}

impl BackendStream for ListStream {
    fn add(&self, event: Event) -> StreamResult<()> {
        if event.len() > self.max_event_size {
            return Err(StreamError::InvalidPayload {
                size: event.len(),
                max: self.max_event_size,
            });
        }

        let _guard = self.lock.read();
        self.engine.push(&self.key, std::slice::from_ref(&event))?;
        Ok(())
    }

    fn read(&self, from: u64, to: i64) -> StreamResult<EventIter<'_>> {
        Ok(Box::new(self.iter(from, to)?))
    }

    fn del(&self, from: u64, to: i64) -> StreamResult<bool> {
        let from = range::start_index(from, to)?;
        if from == to {
            return Ok(true);
        }

        let _guard = self.lock.write();

        if from == 0 && to == -1 {
            return self.clear();
        }

        let len = self
            .engine
            .len(&self.key)
            .map_err(self.failed(DelStep::Length))?;
        let (from, to) = range::normalize(from, to, len);
        if from == 0 && to == range::len_index(len) {
            return self.clear();
        }

        let window = range::check_range(from, to, len)?;
        if window.is_empty() {
            return Ok(false);
        }

        if window.start == 0 {
            self.engine
                .trim(&self.key, window.end, len)
                .map_err(self.failed(DelStep::Trim))?;
        } else if window.end == len {
            self.engine
                .trim(&self.key, 0, window.start)
                .map_err(self.failed(DelStep::Trim))?;
        } else if self.native_delete {
            self.engine
                .delete_range(&self.key, window.start, window.end)
                .map_err(self.failed(DelStep::NativeDelete))?;
        } else {
            self.splice_out(window.start, window.end, len)?;
        }
        tracing::trace!(stream = %self.name, from = window.start, to = window.end, "deleted range");
        Ok(true)
    }

    fn len(&self) -> StreamResult<u64> {
        Ok(self.engine.len(&self.key)?)
    }
}

impl std::fmt::Debug for ListStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStream")
            .field("name", &self.name)
            .field("max_event_size", &self.max_event_size)
            .field("native_delete", &self.native_delete)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangestream_storage::{max_value_size, FileListStore, MemoryListStore};
    use tempfile::tempdir;

    fn events(items: &[&str]) -> Vec<Event> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    fn stream_with(items: &[&str], options: &ListOptions) -> ListStream {
        let engine = MemoryListStore::with_lists([("s", events(items))]);
        ListStream::new("s", Arc::new(engine), options)
    }

    /// Forces the read-tail / trim / re-append path.
    fn fallback(items: &[&str]) -> ListStream {
        stream_with(items, &ListOptions::new().prefer_native_delete(false))
    }

    fn contents(stream: &ListStream) -> Vec<Event> {
        stream.read(0, -1).unwrap().collect::<StreamResult<_>>().unwrap()
    }

    #[test]
    fn add_appends_in_order() {
        let stream = fallback(&[]);
        stream.add(b"a".to_vec()).unwrap();
        stream.add(b"b".to_vec()).unwrap();
        assert_eq!(stream.len().unwrap(), 2);
        assert_eq!(contents(&stream), events(&["a", "b"]));
    }

    #[test]
    fn add_rejects_oversized_payload() {
        let stream = stream_with(&[], &ListOptions::new().max_event_size(4));
        let result = stream.add(b"too long".to_vec());
        assert!(matches!(
            result,
            Err(StreamError::InvalidPayload { size: 8, max: 4 })
        ));
        assert_eq!(stream.len().unwrap(), 0);
    }

    #[test]
    fn event_limit_follows_engine_push_limit() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(FileListStore::open(dir.path(), true, false).unwrap());
        let stream = ListStream::new("orders", engine, &ListOptions::default());
        assert_eq!(stream.max_event_size, max_value_size("orders".len()));

        let unbounded = fallback(&[]);
        assert_eq!(unbounded.max_event_size, ListOptions::default().max_event_size);
    }

    #[test]
    fn read_with_negative_end() {
        let stream = fallback(&["a", "b", "c", "d"]);
        let got: Vec<_> = stream.read(1, -2).unwrap().map(Result::unwrap).collect();
        assert_eq!(got, events(&["b", "c"]));
    }

    #[test]
    fn read_equal_indices_is_empty_without_lock() {
        let stream = fallback(&[]);
        let _writer = stream.lock.write();
        let iter = stream.iter(3, 3).unwrap();
        assert!(!iter.holds_lock());
        assert_eq!(iter.count(), 0);
    }

    #[test]
    fn read_normalized_empty_releases_lock() {
        let stream = fallback(&["a", "b"]);
        let iter = stream.iter(2, -1).unwrap();
        assert!(!iter.holds_lock());
        assert!(stream.lock.try_write().is_some());
    }

    #[test]
    fn read_invalid_range_releases_lock() {
        let stream = fallback(&["a", "b"]);
        assert!(matches!(
            stream.iter(1, 5),
            Err(StreamError::InvalidRange { from: 1, to: 5, len: 2 })
        ));
        assert!(stream.lock.try_write().is_some());
    }

    #[test]
    fn iterator_holds_lock_until_exhausted() {
        let stream = fallback(&["a", "b"]);
        let mut iter = stream.iter(0, -1).unwrap();
        assert!(iter.holds_lock());
        assert!(stream.lock.try_write().is_none());

        assert_eq!(iter.next().unwrap().unwrap(), b"a");
        assert_eq!(iter.next().unwrap().unwrap(), b"b");
        assert!(iter.holds_lock());
        assert!(iter.next().is_none());
        assert!(!iter.holds_lock());
        assert!(stream.lock.try_write().is_some());
        assert!(iter.next().is_none());
    }

    #[test]
    fn dropped_iterator_releases_lock() {
        let stream = fallback(&["a", "b", "c"]);
        {
            let mut iter = stream.iter(0, -1).unwrap();
            iter.next();
        }
        assert!(stream.lock.try_write().is_some());
    }

    #[test]
    fn iterator_error_releases_lock_and_fuses() {
        let engine = Arc::new(MemoryListStore::with_lists([("s", events(&["a", "b"]))]));
        let stream = ListStream::new("s", engine.clone(), &ListOptions::default());
        let mut iter = stream.iter(0, -1).unwrap();
        engine.close().unwrap();

        assert!(matches!(
            iter.next(),
            Some(Err(StreamError::Storage(StorageError::Closed)))
        ));
        assert!(!iter.holds_lock());
        assert!(iter.next().is_none());
    }

    #[test]
    fn add_while_reading_without_pending_delete() {
        let stream = fallback(&["a"]);
        let iter = stream.iter(0, -1).unwrap();
        stream.add(b"b".to_vec()).unwrap();
        assert_eq!(iter.count(), 1);
        assert_eq!(stream.len().unwrap(), 2);
    }

    #[test]
    fn del_equal_indices_is_noop_true() {
        let stream = fallback(&["a"]);
        assert!(stream.del(0, 0).unwrap());
        assert!(stream.del(7, 7).unwrap());
        assert_eq!(stream.len().unwrap(), 1);

        let empty = fallback(&[]);
        assert!(empty.del(0, 0).unwrap());
    }

    #[test]
    fn del_whole_stream_sentinel() {
        let stream = fallback(&["a", "b"]);
        assert!(stream.del(0, -1).unwrap());
        assert_eq!(stream.len().unwrap(), 0);
        assert!(!stream.del(0, -1).unwrap());
    }

    #[test]
    fn del_normalized_whole_stream() {
        let stream = fallback(&["a", "b", "c"]);
        assert!(stream.del(0, 3).unwrap());
        assert_eq!(stream.len().unwrap(), 0);
    }

    #[test]
    fn del_prefix() {
        let stream = fallback(&["a", "b", "c", "d"]);
        assert!(stream.del(0, 2).unwrap());
        assert_eq!(contents(&stream), events(&["c", "d"]));
    }

    #[test]
    fn del_suffix_with_negative_end() {
        let stream = fallback(&["a", "b", "c", "d"]);
        assert!(stream.del(1, -1).unwrap());
        assert_eq!(contents(&stream), events(&["a"]));
    }

    #[test]
    fn del_middle_by_fallback() {
        let stream = fallback(&["e0", "e1", "e2", "e3", "e4"]);
        assert!(!stream.native_delete);
        assert!(stream.del(1, 4).unwrap());
        assert_eq!(contents(&stream), events(&["e0", "e4"]));
    }

    #[test]
    fn del_middle_natively() {
        let stream = stream_with(&["e0", "e1", "e2", "e3", "e4"], &ListOptions::default());
        assert!(stream.native_delete);
        assert!(stream.del(1, 4).unwrap());
        assert_eq!(contents(&stream), events(&["e0", "e4"]));
    }

    #[test]
    fn del_invalid_range_changes_nothing() {
        let stream = fallback(&["a", "b", "c"]);
        assert!(matches!(
            stream.del(2, 1),
            Err(StreamError::InvalidRange { .. })
        ));
        assert!(matches!(
            stream.del(0, 9),
            Err(StreamError::InvalidRange { .. })
        ));
        assert!(matches!(
            stream.del(1, 9),
            Err(StreamError::InvalidRange { .. })
        ));
        assert_eq!(contents(&stream), events(&["a", "b", "c"]));
    }

    #[test]
    fn del_range_normalizing_to_empty_returns_false() {
        let stream = fallback(&["a", "b", "c"]);
        assert!(!stream.del(3, -1).unwrap());
        assert_eq!(stream.len().unwrap(), 3);
    }

    #[test]
    fn del_length_failure_is_annotated() {
        let engine = Arc::new(MemoryListStore::with_lists([("s", events(&["a", "b", "c"]))]));
        let stream = ListStream::new("s", engine.clone(), &ListOptions::default());
        engine.close().unwrap();

        assert!(matches!(
            stream.del(1, 2),
            Err(StreamError::DeleteFailed {
                step: DelStep::Length,
                ..
            })
        ));
    }
}
