//! Backend configuration.

use rangestream_storage::max_value_size;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes how a backend was created.
///
/// Returned by [`crate::Backend::config`] and accepted by
/// [`crate::BackendRegistry::create_from_config`], so a backend can be
/// reopened from a saved description.
///
/// Serializes as `{"type": <name>, "arg": <factory argument>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Registered backend type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// The opaque argument passed to the factory.
    #[serde(default)]
    pub arg: Value,
}

impl BackendConfig {
    /// Creates a configuration for `kind` with `arg`.
    pub fn new(kind: impl Into<String>, arg: Value) -> Self {
        Self {
            kind: kind.into(),
            arg,
        }
    }
}

/// Options for a [`crate::ListBackend`].
///
/// Deserializing rejects unknown fields, so a misspelled option is an error
/// instead of a silent default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListOptions {
    /// Whether to create the storage directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the operation log after every write (safer but slower).
    pub sync_on_write: bool,

    /// Largest accepted event payload in bytes. Streams lower it further
    /// when the engine cannot frame an event this large under their name.
    pub max_event_size: usize,

    /// Use the engine's native range delete when it has one, instead of
    /// read-tail / trim / re-append.
    pub prefer_native_delete: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            max_event_size: max_value_size(0),
            prefer_native_delete: true,
        }
    }
}

impl ListOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the largest accepted event payload.
    #[must_use]
    pub const fn max_event_size(mut self, size: usize) -> Self {
        self.max_event_size = size;
        self
    }

    /// Sets whether a native range delete is preferred.
    #[must_use]
    pub const fn prefer_native_delete(mut self, value: bool) -> Self {
        self.prefer_native_delete = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_options() {
        let options = ListOptions::default();
        assert!(options.create_if_missing);
        assert!(options.sync_on_write);
        assert!(options.prefer_native_delete);
        assert_eq!(options.max_event_size, max_value_size(0));
        assert!(options.max_event_size < u32::MAX as usize);
    }

    #[test]
    fn builder_pattern() {
        let options = ListOptions::new()
            .create_if_missing(false)
            .sync_on_write(false)
            .max_event_size(1024);

        assert!(!options.create_if_missing);
        assert!(!options.sync_on_write);
        assert_eq!(options.max_event_size, 1024);
    }

    #[test]
    fn options_fill_missing_fields_from_defaults() {
        let options: ListOptions = serde_json::from_value(json!({"sync_on_write": false})).unwrap();
        assert_eq!(options, ListOptions::new().sync_on_write(false));
    }

    #[test]
    fn options_reject_unknown_fields() {
        let result = serde_json::from_value::<ListOptions>(json!({"sync_onwrite": false}));
        assert!(result.is_err());
    }

    #[test]
    fn backend_config_uses_type_key() {
        let config = BackendConfig::new("list", json!("/var/lib/streams"));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value, json!({"type": "list", "arg": "/var/lib/streams"}));

        let back: BackendConfig = serde_json::from_value(json!({"type": "nil"})).unwrap();
        assert_eq!(back, BackendConfig::new("nil", Value::Null));
    }
}
