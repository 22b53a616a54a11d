//! Backend binding for list engines.

use super::stream::ListStream;
use crate::backend::Backend;
use crate::config::{BackendConfig, ListOptions};
use crate::error::{ErrorList, StreamError, StreamResult};
use crate::registry::{LIST_BACKEND, MEMORY_BACKEND};
use crate::stream::StreamHandle;
use parking_lot::Mutex;
use rangestream_storage::{FileListStore, ListStore, MemoryListStore};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Upper bound on the number of names returned by [`Backend::streams`].
pub const STREAM_SCAN_LIMIT: usize = i32::MAX as usize;

struct Entry {
    stream: Arc<ListStream>,
    refs: usize,
}

struct Shared {
    config: BackendConfig,
    dir: Option<PathBuf>,
    engine: Arc<dyn ListStore>,
    options: ListOptions,
    /// Live streams by name; `None` once the backend is closed.
    table: Mutex<Option<HashMap<String, Entry>>>,
}

impl Shared {
    fn release(&self, name: &str) {
        let mut table = self.table.lock();
        let Some(table) = table.as_mut() else {
            return;
        };
        if let Some(entry) = table.get_mut(name) {
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs == 0 {
                table.remove(name);
                tracing::debug!(stream = name, "evicted stream handle");
            }
        }
    }
}

/// A backend whose streams are lists in a [`ListStore`].
///
/// The backend owns the engine. Streams hold a clone of the engine `Arc` and
/// their key, never a copy of the data.
///
/// # Thread Safety
///
/// The table of live streams is guarded by a mutex held only for lookup,
/// insert and eviction, never across engine calls, so I/O on unrelated
/// streams is not serialized.
///
/// # Example
///
/// ```no_run
/// use rangestream_core::{Backend, ListBackend, ListOptions};
/// use std::path::Path;
///
/// let backend = ListBackend::open(Path::new("streams"), ListOptions::default()).unwrap();
/// let stream = backend.get_stream("orders").unwrap();
/// stream.add("created").unwrap();
/// stream.close().unwrap();
/// backend.close().unwrap();
/// ```
#[derive(Clone)]
pub struct ListBackend {
    shared: Arc<Shared>,
}

impl ListBackend {
    /// Opens or creates a persistent backend in `dir`.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the directory cannot be opened.
    pub fn open(dir: &Path, options: ListOptions) -> StreamResult<Self> {
        let engine = FileListStore::open(dir, options.create_if_missing, options.sync_on_write)?;
        let config = if options == ListOptions::default() {
            BackendConfig::new(LIST_BACKEND, Value::String(dir.display().to_string()))
        } else {
            let mut arg = serde_json::to_value(&options)
                .map_err(|err| StreamError::invalid_config(LIST_BACKEND, err.to_string()))?;
            if let Value::Object(map) = &mut arg {
                map.insert("dir".into(), Value::String(dir.display().to_string()));
            }
            BackendConfig::new(LIST_BACKEND, arg)
        };
        tracing::debug!(dir = %dir.display(), "opened list backend");
        Ok(Self::build(config, Some(dir.to_path_buf()), Arc::new(engine), options))
    }

    /// Creates a backend over a fresh [`MemoryListStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::build(
            BackendConfig::new(MEMORY_BACKEND, Value::Null),
            None,
            Arc::new(MemoryListStore::new()),
            ListOptions::default(),
        )
    }

    /// Creates a backend over any engine.
    ///
    /// `config` is what [`Backend::config`] will report. Dropping the
    /// backend erases the engine's data but removes no directory.
    pub fn with_engine(engine: Arc<dyn ListStore>, config: BackendConfig, options: ListOptions) -> Self {
        Self::build(config, None, engine, options)
    }

    fn build(
        config: BackendConfig,
        dir: Option<PathBuf>,
        engine: Arc<dyn ListStore>,
        options: ListOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                dir,
                engine,
                options,
                table: Mutex::new(Some(HashMap::new())),
            }),
        }
    }

    /// Returns the storage directory, if the engine has one.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.shared.dir.as_deref()
    }

    /// Number of streams with at least one open handle.
    #[must_use]
    pub fn live_streams(&self) -> usize {
        self.shared.table.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Number of open handles for `name`, if any.
    #[must_use]
    pub fn ref_count(&self, name: &str) -> Option<usize> {
        self.shared
            .table
            .lock()
            .as_ref()
            .and_then(|table| table.get(name))
            .map(|entry| entry.refs)
    }

    /// Releases one reference to `name`, evicting the shared stream at zero.
    ///
    /// [`StreamHandle`] calls this on close or drop; calling it directly
    /// for a handle that is still in use lets a later `get_stream` create a
    /// second stream object with its own lock.
    pub fn release(&self, name: &str) {
        self.shared.release(name);
    }
}

impl Backend for ListBackend {
    fn config(&self) -> StreamResult<BackendConfig> {
        Ok(self.shared.config.clone())
    }

    fn streams(&self) -> StreamResult<Vec<String>> {
        let keys = self.shared.engine.keys(STREAM_SCAN_LIMIT)?;
        Ok(keys
            .into_iter()
            .map(|key| String::from_utf8_lossy(&key).into_owned())
            .collect())
    }

    fn get_stream(&self, name: &str) -> StreamResult<StreamHandle> {
        let stream = {
            let mut table = self.shared.table.lock();
            let table = table.as_mut().ok_or(StreamError::Closed)?;
            let entry = table.entry(name.to_string()).or_insert_with(|| Entry {
                stream: Arc::new(ListStream::new(
                    name,
                    Arc::clone(&self.shared.engine),
                    &self.shared.options,
                )),
                refs: 0,
            });
            entry.refs += 1;
            Arc::clone(&entry.stream)
        };

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let owned = name.to_string();
        Ok(StreamHandle::with_release(name, stream, move || {
            if let Some(shared) = shared.upgrade() {
                shared.release(&owned);
            }
        }))
    }

    fn drop_data(&self) -> StreamResult<()> {
        let mut errors = ErrorList::new();
        errors.push_result(self.shared.engine.flush_all());
        if let Some(dir) = &self.shared.dir {
            errors.push_result(std::fs::remove_dir_all(dir));
        }
        tracing::info!(config = ?self.shared.config, failures = errors.len(), "dropped backend data");
        errors.into_result()
    }

    fn close(&self) -> StreamResult<()> {
        let detached = self.shared.table.lock().take();
        if let Err(err) = self.shared.engine.close() {
            tracing::warn!(error = %err, "ignoring engine close failure");
        }
        tracing::debug!(
            config = ?self.shared.config,
            detached = detached.map_or(0, |table| table.len()),
            "closed list backend"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ListBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListBackend")
            .field("config", &self.shared.config)
            .field("live_streams", &self.live_streams())
            .finish()
    }
}
