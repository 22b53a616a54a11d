//! Error types for stream and backend operations.

use rangestream_storage::StorageError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// The primitive a range delete was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelStep {
    /// Reading the stream length.
    Length,
    /// Clearing the whole stream.
    Clear,
    /// Trimming the stream to a window.
    Trim,
    /// Reading the tail that will be re-appended.
    ReadTail,
    /// The engine's native range delete.
    NativeDelete,
}

impl fmt::Display for DelStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Length => "length",
            Self::Clear => "clear",
            Self::Trim => "trim",
            Self::ReadTail => "read tail",
            Self::NativeDelete => "native delete",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in registry, backend and stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A factory is already registered under this type name.
    #[error("there already is a backend factory for type {name:?}")]
    DuplicateType {
        /// The type name.
        name: String,
    },

    /// No factory is registered under this type name.
    #[error("no backend type {name:?}")]
    UnknownType {
        /// The type name.
        name: String,
    },

    /// The factory argument does not have the shape the factory expects.
    #[error("invalid config for backend type {kind:?}: {message}")]
    InvalidConfig {
        /// The backend type.
        kind: String,
        /// What was wrong with the argument.
        message: String,
    },

    /// A range does not fit the stream.
    #[error("invalid range [{from}, {to}) for stream of length {len}")]
    InvalidRange {
        /// Normalized start.
        from: i64,
        /// Normalized end.
        to: i64,
        /// Stream length when the range was checked.
        len: u64,
    },

    /// An event payload was rejected before reaching storage.
    #[error("invalid payload: event of {size} bytes exceeds limit of {max} bytes")]
    InvalidPayload {
        /// Payload size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Storage engine error, passed through unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error outside the storage engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A delete failed before the stream was modified.
    #[error("delete on stream {stream:?} failed at {step} step, stream unchanged: {source}")]
    DeleteFailed {
        /// Stream name.
        stream: String,
        /// The failing primitive.
        step: DelStep,
        /// The engine error.
        #[source]
        source: StorageError,
    },

    /// A middle-range delete trimmed the stream but could not re-append the
    /// saved tail. The tail is gone.
    #[error("delete on stream {stream:?} lost {lost} events: re-append after trim failed: {source}")]
    PartialDeleteDataLoss {
        /// Stream name.
        stream: String,
        /// Number of events that were trimmed and not restored.
        lost: usize,
        /// The engine error from the re-append.
        #[source]
        source: StorageError,
    },

    /// The backend has been closed.
    #[error("backend is closed")]
    Closed,

    /// Several independent failures.
    #[error("{0}")]
    Multiple(ErrorList),
}

impl StreamError {
    /// Creates an invalid config error.
    pub fn invalid_config(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Whether the stream was damaged by the failed operation.
    #[must_use]
    pub fn is_data_loss(&self) -> bool {
        match self {
            Self::PartialDeleteDataLoss { .. } => true,
            Self::Multiple(list) => list.iter().any(Self::is_data_loss),
            _ => false,
        }
    }

    /// Whether this is a caller error detected before any side effect.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateType { .. }
                | Self::UnknownType { .. }
                | Self::InvalidConfig { .. }
                | Self::InvalidRange { .. }
                | Self::InvalidPayload { .. }
        )
    }
}

/// Collects failures from steps that must all run.
///
/// ```rust
/// use rangestream_core::{ErrorList, StreamError};
///
/// let mut errors = ErrorList::new();
/// errors.push_result(Ok::<_, StreamError>(()));
/// errors.push_result(Err::<(), _>(StreamError::Closed));
/// assert!(matches!(errors.into_result(), Err(StreamError::Closed)));
/// ```
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<StreamError>,
}

impl ErrorList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of `result`, if any.
    pub fn push_result<T, E: Into<StreamError>>(&mut self, result: Result<T, E>) -> &mut Self {
        if let Err(err) = result {
            self.errors.push(err.into());
        }
        self
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over the recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &StreamError> {
        self.errors.iter()
    }

    /// `Ok` if nothing failed, the single error if one did, otherwise
    /// [`StreamError::Multiple`].
    pub fn into_result(mut self) -> StreamResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(StreamError::Multiple(self)),
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors: ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_list_empty_is_ok() {
        assert!(ErrorList::new().into_result().is_ok());
    }

    #[test]
    fn error_list_collects_all_failures() {
        let mut errors = ErrorList::new();
        errors
            .push_result(Err::<(), _>(StorageError::Closed))
            .push_result(Ok::<_, StreamError>(1))
            .push_result(Err::<(), _>(io::Error::new(io::ErrorKind::Other, "gone")));
        assert_eq!(errors.len(), 2);

        let err = errors.into_result().unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("2 errors: "));
        assert!(message.contains("storage is closed"));
        assert!(message.contains("gone"));
    }

    #[test]
    fn data_loss_is_distinguishable() {
        let loss = StreamError::PartialDeleteDataLoss {
            stream: "s".into(),
            lost: 3,
            source: StorageError::Closed,
        };
        let safe = StreamError::DeleteFailed {
            stream: "s".into(),
            step: DelStep::Trim,
            source: StorageError::Closed,
        };
        assert!(loss.is_data_loss());
        assert!(!safe.is_data_loss());
        assert!(safe.to_string().contains("trim step"));
        assert!(safe.to_string().contains("stream unchanged"));
    }

    #[test]
    fn validation_errors_are_flagged() {
        let range = StreamError::InvalidRange {
            from: 2,
            to: 1,
            len: 3,
        };
        assert!(range.is_validation());
        assert!(!StreamError::Closed.is_validation());
    }
}
