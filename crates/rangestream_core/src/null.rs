//! A backend that stores nothing.

use crate::backend::Backend;
use crate::config::BackendConfig;
use crate::error::StreamResult;
use crate::range;
use crate::registry::NULL_BACKEND;
use crate::stream::{BackendStream, Event, EventIter, StreamHandle};
use serde_json::Value;
use std::sync::Arc;

/// A backend whose streams accept every event and are always empty.
///
/// Useful as a sink in tests and benchmarks. Range arguments are still
/// validated against the (zero) length, so callers see the same errors they
/// would from an empty stream of any other backend.
#[derive(Debug, Default, Clone)]
pub struct NullBackend;

impl NullBackend {
    /// Creates a null backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Backend for NullBackend {
    fn config(&self) -> StreamResult<BackendConfig> {
        Ok(BackendConfig::new(NULL_BACKEND, Value::Null))
    }

    fn streams(&self) -> StreamResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn get_stream(&self, name: &str) -> StreamResult<StreamHandle> {
        Ok(StreamHandle::new(name, Arc::new(NullStream)))
    }

    fn drop_data(&self) -> StreamResult<()> {
        Ok(())
    }

    fn close(&self) -> StreamResult<()> {
        Ok(())
    }
}

/// A stream that discards appended events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStream;

impl BackendStream for NullStream {
    fn add(&self, _event: Event) -> StreamResult<()> {
        Ok(())
    }

    fn read(&self, from: u64, to: i64) -> StreamResult<EventIter<'_>> {
        range::resolve(range::start_index(from, to)?, to, 0)?;
        Ok(Box::new(std::iter::empty()))
    }

    fn del(&self, from: u64, to: i64) -> StreamResult<bool> {
        let from = range::start_index(from, to)?;
        Ok(range::resolve(from, to, 0)?.is_none())
    }

    fn len(&self) -> StreamResult<u64> {
        Ok(0)
    }
}
