//! Lazy range cursor over a list-backed stream.

use crate::error::StreamResult;
use crate::stream::Event;
use parking_lot::RwLockReadGuard;
use rangestream_storage::ListStore;
use std::iter::FusedIterator;
use std::ops::Range;

/// A forward-only cursor over `[start, end)` of one stream.
///
/// Holds the stream's shared lock from the read that created it until the
/// cursor reaches the end, hits its first error, or is dropped, whichever
/// comes first. While it is held, deletes on the stream wait.
///
/// Events are fetched one at a time as the cursor advances.
pub struct RangeIter<'a> {
    guard: Option<RwLockReadGuard<'a, ()>>,
    engine: &'a dyn ListStore,
    key: &'a [u8],
    next: u64,
    end: u64,
}

impl<'a> RangeIter<'a> {
    pub(crate) fn new(
        guard: RwLockReadGuard<'a, ()>,
        engine: &'a dyn ListStore,
        key: &'a [u8],
        range: Range<u64>,
    ) -> Self {
        Self {
            guard: Some(guard),
            engine,
            key,
            next: range.start,
            end: range.end,
        }
    }

    pub(crate) fn empty(engine: &'a dyn ListStore, key: &'a [u8]) -> Self {
        Self {
            guard: None,
            engine,
            key,
            next: 0,
            end: 0,
        }
    }

    /// Whether the cursor still holds the stream's shared lock.
    #[must_use]
    pub fn holds_lock(&self) -> bool {
        self.guard.is_some()
    }

    fn finish(&mut self) {
        self.guard = None;
    }
}

impl Iterator for RangeIter<'_> {
    type Item = StreamResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.guard.as_ref()?;
        if self.next >= self.end {
            self.finish();
            return None;
        }
        match self.engine.get(self.key, self.next) {
            Ok(event) => {
                self.next += 1;
                Some(Ok(event))
            }
            Err(err) => {
                self.finish();
                Some(Err(err.into()))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.guard.is_none() {
            return (0, Some(0));
        }
        let remaining = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}

impl FusedIterator for RangeIter<'_> {}

impl std::fmt::Debug for RangeIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeIter")
            .field("next", &self.next)
            .field("end", &self.end)
            .field("holds_lock", &self.holds_lock())
            .finish()
    }
}
