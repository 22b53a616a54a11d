//! Backend trait definition.

use crate::config::BackendConfig;
use crate::error::StreamResult;
use crate::stream::StreamHandle;

/// A storage-engine binding that manages a set of named streams.
///
/// Backends are created through [`crate::BackendRegistry`] and selected by
/// type name; callers only see this trait and [`StreamHandle`].
///
/// # Implementors
///
/// - [`crate::ListBackend`] - streams as lists in a [`crate::ListStore`]
/// - [`crate::NullBackend`] - discards everything
pub trait Backend: Send + Sync {
    /// Describes this backend so it can be recreated through the registry.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn config(&self) -> StreamResult<BackendConfig>;

    /// Lists every stream present in storage, not only those with open
    /// handles.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    fn streams(&self) -> StreamResult<Vec<String>>;

    /// Returns a handle to the stream `name`, creating it on first append.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after [`Backend::close`].
    fn get_stream(&self, name: &str) -> StreamResult<StreamHandle>;

    /// Irreversibly erases every stream and removes the storage location.
    ///
    /// Every step runs even if an earlier one fails; all failures are
    /// reported together.
    ///
    /// # Errors
    ///
    /// Returns the collected failures.
    fn drop_data(&self) -> StreamResult<()>;

    /// Detaches open handles and releases the storage engine.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn close(&self) -> StreamResult<()>;
}
