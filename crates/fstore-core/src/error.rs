//! Error taxonomy for containers, stores, preference backends, and config.

use std::sync::Arc;

use thiserror::Error;

/// Error payload carried by a faulted container.
///
/// Stored once by [`Subject::fail`](crate::subject::Subject::fail) and handed
/// back by every later read, so callers can compare with [`Arc::ptr_eq`].
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("container has been disposed")]
    Disposed,

    #[error("container faulted: {0}")]
    Faulted(SharedError),

    #[error("preference backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("preference codec error: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    /// The terminal error, if this is a re-surfaced fault.
    #[must_use]
    pub fn fault(&self) -> Option<&SharedError> {
        match self {
            Self::Faulted(error) => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

/// Failure inside a [`PreferenceBackend`](crate::persist::PreferenceBackend).
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },
}

impl BackendError {
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(Arc::new(error))
    }
}

/// Failure translating between a typed value and its stored preference form.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("stored preference is {found}, expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot parse {kind} from {input:?}: {reason}")]
    Parse {
        kind: &'static str,
        input: String,
        reason: String,
    },

    #[error("JSON codec error: {0}")]
    Json(Arc<serde_json::Error>),
}

impl CodecError {
    #[must_use]
    pub fn parse(kind: &'static str, input: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            kind,
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(Arc::new(error))
    }
}

/// Failure loading a [`PreferencesConfig`](crate::config::PreferencesConfig).
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(Arc<std::io::Error>),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("unsupported config format: {0:?}")]
    UnsupportedFormat(Option<String>),

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}
