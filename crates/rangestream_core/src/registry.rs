//! Backend factories keyed by type name.

use crate::backend::Backend;
use crate::config::{BackendConfig, ListOptions};
use crate::error::{StreamError, StreamResult};
use crate::list::ListBackend;
use crate::null::NullBackend;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Type name of [`NullBackend`].
pub const NULL_BACKEND: &str = "nil";

/// Type name of [`ListBackend::in_memory`].
pub const MEMORY_BACKEND: &str = "mem";

/// Type name of [`ListBackend::open`]. The argument is a directory path, or
/// an object with a `dir` field plus any [`ListOptions`] fields.
pub const LIST_BACKEND: &str = "list";

/// Builds a backend from an opaque argument.
pub type BackendFactory = Arc<dyn Fn(&Value) -> StreamResult<Box<dyn Backend>> + Send + Sync>;

/// A table of backend factories.
///
/// Names are write-once: a registered factory is never replaced or removed.
/// All operations take one mutex and are safe to call from many threads.
/// Factories run after the mutex is released, so a slow engine open does
/// not block other callers.
///
/// Use [`BackendRegistry::new`] or [`BackendRegistry::with_defaults`] for an
/// explicit registry, or [`BackendRegistry::global`] for the process-wide one.
///
/// # Example
///
/// ```rust
/// use rangestream_core::{BackendRegistry, NullBackend, StreamError};
///
/// let registry = BackendRegistry::new();
/// registry.register("sink", |_| Ok(Box::new(NullBackend::new()))).unwrap();
///
/// assert!(registry.create("sink", &serde_json::Value::Null).is_ok());
/// assert!(matches!(
///     registry.register("sink", |_| Ok(Box::new(NullBackend::new()))),
///     Err(StreamError::DuplicateType { .. })
/// ));
/// ```
#[derive(Default)]
pub struct BackendRegistry {
    factories: Mutex<HashMap<String, BackendFactory>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the `nil`, `mem` and `list` factories.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        // An empty registry has no names to collide with
        let _ = registry.register_defaults();
        registry
    }

    /// The process-wide registry.
    ///
    /// Initialised with the default factories on first use and never torn
    /// down. Further factories registered here are visible to every caller
    /// in the process.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<BackendRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_defaults)
    }

    /// Registers the `nil`, `mem` and `list` factories.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateType` for the first name already taken; the
    /// defaults before it stay registered.
    pub fn register_defaults(&self) -> StreamResult<()> {
        self.register(NULL_BACKEND, |_| Ok(Box::new(NullBackend::new())))?;
        self.register(MEMORY_BACKEND, |_| Ok(Box::new(ListBackend::in_memory())))?;
        self.register(LIST_BACKEND, create_list_backend)?;
        Ok(())
    }

    /// Registers `factory` under `kind`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateType` if `kind` is already registered.
    pub fn register<F>(&self, kind: &str, factory: F) -> StreamResult<()>
    where
        F: Fn(&Value) -> StreamResult<Box<dyn Backend>> + Send + Sync + 'static,
    {
        let mut factories = self.factories.lock();
        if factories.contains_key(kind) {
            return Err(StreamError::DuplicateType {
                name: kind.to_string(),
            });
        }
        factories.insert(kind.to_string(), Arc::new(factory));
        tracing::debug!(kind, "registered backend factory");
        Ok(())
    }

    /// Creates a backend of type `kind` from `arg`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` if nothing is registered under `kind`, otherwise
    /// whatever the factory returns (typically `InvalidConfig` for an
    /// argument of the wrong shape).
    pub fn create(&self, kind: &str, arg: &Value) -> StreamResult<Box<dyn Backend>> {
        let factory = self
            .factories
            .lock()
            .get(kind)
            .cloned()
            .ok_or_else(|| StreamError::UnknownType {
                name: kind.to_string(),
            })?;
        factory(arg)
    }

    /// Recreates a backend from the value of [`Backend::config`].
    ///
    /// # Errors
    ///
    /// See [`BackendRegistry::create`].
    pub fn create_from_config(&self, config: &BackendConfig) -> StreamResult<Box<dyn Backend>> {
        self.create(&config.kind, &config.arg)
    }

    /// Returns the registered type names in no particular order.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.factories.lock().keys().cloned().collect()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("types", &self.types())
            .finish()
    }
}

/// Splits a list factory argument into the directory and its options.
fn parse_list_arg(arg: &Value) -> Result<(PathBuf, ListOptions), String> {
    match arg {
        Value::String(dir) => Ok((PathBuf::from(dir), ListOptions::default())),
        Value::Object(fields) => {
            let mut fields = fields.clone();
            let Some(Value::String(dir)) = fields.remove("dir") else {
                return Err(format!("missing string field \"dir\" in {arg}"));
            };
            let options = serde_json::from_value(Value::Object(fields))
                .map_err(|err| format!("bad options in {arg}: {err}"))?;
            Ok((PathBuf::from(dir), options))
        }
        _ => Err(format!(
            "expected a directory path or {{\"dir\": ...}}, got {arg}"
        )),
    }
}

fn create_list_backend(arg: &Value) -> StreamResult<Box<dyn Backend>> {
    let (dir, options) =
        parse_list_arg(arg).map_err(|message| StreamError::invalid_config(LIST_BACKEND, message))?;
    Ok(Box::new(ListBackend::open(&dir, options)?))
}
