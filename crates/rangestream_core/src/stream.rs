//! The stream contract and the caller-facing stream handle.

use crate::error::StreamResult;
use std::fmt;
use std::sync::Arc;

/// An opaque event payload. Events have no identity beyond their position.
pub type Event = Vec<u8>;

/// A lazy, forward-only sequence of events returned by a read.
///
/// Implementations may hold a lock on the stream until the sequence ends,
/// fails, or is dropped. Drive it to the end or drop it promptly.
pub type EventIter<'a> = Box<dyn Iterator<Item = StreamResult<Event>> + 'a>;

/// Operations every backend binding implements for one stream.
///
/// Ranges are half-open `[from, to)`; a negative `to` counts from the end
/// (see [`crate::range`]). Equal raw indices are always a successful no-op.
///
/// # Concurrency
///
/// Appends and reads on the same stream may run concurrently. A delete
/// excludes every other operation on that stream while it runs and never
/// exposes a half-finished state to readers.
pub trait BackendStream: Send + Sync {
    /// Appends one event as the new last element.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the event is rejected, or the engine error.
    fn add(&self, event: Event) -> StreamResult<()>;

    /// Returns the events in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if the normalized range does not fit the stream.
    fn read(&self, from: u64, to: i64) -> StreamResult<EventIter<'_>>;

    /// Removes the events in `[from, to)`. Returns whether anything was
    /// removed; equal raw indices return `true` without touching storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange`, `DeleteFailed` (stream unchanged) or
    /// `PartialDeleteDataLoss` (stream truncated).
    fn del(&self, from: u64, to: i64) -> StreamResult<bool>;

    /// Returns the number of events.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    fn len(&self) -> StreamResult<u64>;

    /// Per-stream teardown hook. Does not release the caller's reference;
    /// [`StreamHandle::close`] does that.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn close(&self) -> StreamResult<()> {
        Ok(())
    }
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// A caller's reference to an open stream.
///
/// Every call to [`crate::Backend::get_stream`] returns a new handle, but
/// handles for the same name share one underlying stream and its lock.
/// The backend counts handles per name and forgets the shared stream once
/// the last one is released.
///
/// A handle is released exactly once: by [`StreamHandle::close`], or when
/// it is dropped without being closed.
pub struct StreamHandle {
    name: String,
    stream: Arc<dyn BackendStream>,
    release: Option<Release>,
}

impl StreamHandle {
    /// Wraps a stream that needs no release bookkeeping.
    pub fn new(name: impl Into<String>, stream: Arc<dyn BackendStream>) -> Self {
        Self {
            name: name.into(),
            stream,
            release: None,
        }
    }

    /// Wraps a stream and runs `release` when the handle is closed or dropped.
    pub fn with_release<F>(name: impl Into<String>, stream: Arc<dyn BackendStream>, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            stream,
            release: Some(Box::new(release)),
        }
    }

    /// Returns the stream name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends one event. See [`BackendStream::add`].
    ///
    /// # Errors
    ///
    /// See [`BackendStream::add`].
    pub fn add(&self, event: impl Into<Event>) -> StreamResult<()> {
        self.stream.add(event.into())
    }

    /// Reads `[from, to)` lazily. See [`BackendStream::read`].
    ///
    /// # Errors
    ///
    /// See [`BackendStream::read`].
    pub fn read(&self, from: u64, to: i64) -> StreamResult<EventIter<'_>> {
        self.stream.read(from, to)
    }

    /// Reads `[from, to)` into a vector, releasing any read lock before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns the first error from the read or from the sequence.
    pub fn read_to_vec(&self, from: u64, to: i64) -> StreamResult<Vec<Event>> {
        self.read(from, to)?.collect()
    }

    /// Removes `[from, to)`. See [`BackendStream::del`].
    ///
    /// # Errors
    ///
    /// See [`BackendStream::del`].
    pub fn del(&self, from: u64, to: i64) -> StreamResult<bool> {
        self.stream.del(from, to)
    }

    /// Returns the number of events.
    ///
    /// # Errors
    ///
    /// See [`BackendStream::len`].
    pub fn len(&self) -> StreamResult<u64> {
        self.stream.len()
    }

    /// Returns whether the stream has no events.
    ///
    /// # Errors
    ///
    /// See [`BackendStream::len`].
    pub fn is_empty(&self) -> StreamResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Runs the stream's close hook and releases this handle's reference.
    ///
    /// The reference is released even if the hook fails.
    ///
    /// # Errors
    ///
    /// Returns the hook's error.
    pub fn close(mut self) -> StreamResult<()> {
        let result = self.stream.close();
        self.release();
        result
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("name", &self.name)
            .field("released", &self.release.is_none())
            .finish()
    }
}
