//! Backend-wide commands: types, streams, config, drop.

use super::CommandResult;
use rangestream_core::{Backend, BackendRegistry};

/// Returns the registered backend type names, sorted.
pub fn types() -> Vec<String> {
    let mut types = BackendRegistry::global().types();
    types.sort();
    types
}

/// Returns the names of the streams holding at least one event.
pub fn streams(backend: &dyn Backend) -> CommandResult<Vec<String>> {
    Ok(backend.streams()?)
}

/// Renders the backend configuration as JSON.
pub fn config(backend: &dyn Backend) -> CommandResult<String> {
    Ok(serde_json::to_string_pretty(&backend.config()?)?)
}

/// Erases every stream and the backend's storage.
pub fn drop_data(backend: &dyn Backend, yes: bool) -> CommandResult {
    if !yes {
        return Err("Refusing to drop data without --yes".into());
    }
    let config = backend.config()?;
    backend.drop_data()?;
    println!("Dropped all data of {} backend", config.kind);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangestream_core::ListBackend;

    #[test]
    fn types_are_sorted_defaults() {
        assert_eq!(types(), vec!["list", "mem", "nil"]);
    }

    #[test]
    fn drop_requires_confirmation() {
        let backend = ListBackend::in_memory();
        backend.get_stream("s").unwrap().add("x").unwrap();
        assert!(drop_data(&backend, false).is_err());
        assert_eq!(streams(&backend).unwrap(), vec!["s"]);
        drop_data(&backend, true).unwrap();
        assert!(streams(&backend).unwrap().is_empty());
    }

    #[test]
    fn config_is_json() {
        let backend = ListBackend::in_memory();
        let json = config(&backend).unwrap();
        assert!(json.contains("\"type\": \"mem\""));
    }
}
