//! Test fixtures and backend helpers.
//!
//! Provides backends with automatic cleanup and helpers to seed streams.

use rangestream_core::{Backend, Event, ListBackend, ListOptions, StreamHandle, StreamResult};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A list backend with automatic cleanup.
pub struct TestBackend {
    /// The backend instance.
    pub backend: ListBackend,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestBackend {
    /// Creates a backend over a fresh in-memory engine.
    pub fn memory() -> Self {
        Self {
            backend: ListBackend::in_memory(),
            _temp_dir: None,
        }
    }

    /// Creates a persistent backend in a temporary directory.
    pub fn file() -> Self {
        Self::file_with(ListOptions::default())
    }

    /// Creates a persistent backend with the given options.
    pub fn file_with(options: ListOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backend = ListBackend::open(&temp_dir.path().join("streams"), options)
            .expect("Failed to open list backend");
        Self {
            backend,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the storage directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.backend.dir().map(Path::to_path_buf)
    }

    /// Closes the backend and opens the same directory again.
    ///
    /// # Panics
    ///
    /// Panics for an in-memory fixture.
    pub fn reopen(self, options: ListOptions) -> Self {
        let temp_dir = self._temp_dir.expect("only file fixtures can be reopened");
        self.backend.close().expect("Failed to close backend");
        let backend = ListBackend::open(&temp_dir.path().join("streams"), options)
            .expect("Failed to reopen list backend");
        Self {
            backend,
            _temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestBackend {
    type Target = ListBackend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

/// Runs `f` against an in-memory backend.
pub fn with_memory_backend<F, R>(f: F) -> R
where
    F: FnOnce(&ListBackend) -> R,
{
    let fixture = TestBackend::memory();
    f(&fixture.backend)
}

/// Runs `f` against a persistent backend in a temporary directory.
pub fn with_file_backend<F, R>(f: F) -> R
where
    F: FnOnce(&ListBackend) -> R,
{
    let fixture = TestBackend::file();
    f(&fixture.backend)
}

/// `count` events named `e0`, `e1`, ...
pub fn numbered_events(count: usize) -> Vec<Event> {
    (0..count).map(|i| format!("e{i}").into_bytes()).collect()
}

/// Opens `name` on `backend` and appends `events` in order.
///
/// # Errors
///
/// Returns the first failure from `get_stream` or `add`.
pub fn seeded_stream(
    backend: &dyn Backend,
    name: &str,
    events: &[Event],
) -> StreamResult<StreamHandle> {
    let stream = backend.get_stream(name)?;
    for event in events {
        stream.add(event.clone())?;
    }
    Ok(stream)
}

/// Reads the whole stream into a vector.
pub fn contents(stream: &StreamHandle) -> Vec<Event> {
    stream.read_to_vec(0, -1).expect("Failed to read stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fixture_has_no_path() {
        let fixture = TestBackend::memory();
        assert!(fixture.path().is_none());
    }

    #[test]
    fn file_fixture_reopens_with_data() {
        let fixture = TestBackend::file();
        assert!(fixture.path().is_some());
        seeded_stream(&fixture.backend, "s", &numbered_events(3)).unwrap();

        let fixture = fixture.reopen(ListOptions::default());
        let stream = fixture.get_stream("s").unwrap();
        assert_eq!(contents(&stream), numbered_events(3));
    }

    #[test]
    fn numbered_events_are_named_by_position() {
        assert_eq!(numbered_events(2), vec![b"e0".to_vec(), b"e1".to_vec()]);
    }
}
