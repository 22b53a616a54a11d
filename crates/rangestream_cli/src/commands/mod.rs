//! CLI command implementations.

pub mod backend;
pub mod compact;
pub mod stream;

use rangestream_core::{Backend, BackendRegistry, LIST_BACKEND};
use serde_json::Value;
use std::path::Path;

/// Result type for command implementations.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Creates a backend of type `kind` through the process-wide registry.
///
/// The `list` backend needs `path`; other types take no argument.
pub fn open_backend(kind: &str, path: Option<&Path>) -> CommandResult<Box<dyn Backend>> {
    let arg = if kind == LIST_BACKEND {
        let path = path.ok_or("Storage path required for the list backend")?;
        Value::String(path.display().to_string())
    } else {
        Value::Null
    };
    let backend = BackendRegistry::global().create(kind, &arg)?;
    tracing::debug!(kind, "opened backend");
    Ok(backend)
}
