//! Error types for SoloRAG operations.
//!
//! A single `Error` enum and `Result<T>` alias are shared by every crate in
//! the workspace. Variants follow the failure classes of the answer pipeline:
//! startup failures, rejected requests, retryable and terminal backend
//! failures, and mid-stream transport failures.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Boxed source error carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in SoloRAG operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path.
    #[error("I/O error at {path}: {source}")]
    IoPath {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The persisted index or text store could not be loaded.
    ///
    /// Raised at startup; a process holding this error must not serve.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The request was rejected before any work was done.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The generation backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// Network-level failure talking to the generation backend.
    #[error("Transport error: {message}")]
    Transport {
        /// What was being attempted.
        message: String,
        /// The underlying client error.
        #[source]
        source: Option<BoxError>,
    },

    /// The token stream failed after it was opened.
    #[error("Stream error: {0}")]
    Stream(String),

    /// A model or index operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),

    /// An invariant was violated; should be unreachable.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an index-unavailable error.
    pub fn index_unavailable(msg: impl Into<String>) -> Self {
        Self::IndexUnavailable(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a backend status error.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error without a source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping the client error.
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a stream error.
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Attach a path to an I/O error.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether a generation attempt that failed with this error may be retried.
    ///
    /// Server-side statuses (5xx) and network-level failures are transient.
    /// Everything else, including 4xx statuses, is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { status, .. } => *status >= 500,
            Self::Transport { .. } => true,
            _ => false,
        }
    }

    /// The HTTP status carried by a backend error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using SoloRAG's Error type.
pub type Result<T> = std::result::Result<T, Error>;
