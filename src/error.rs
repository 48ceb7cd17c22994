//! Error types for subscription access.

use thiserror::Error;

/// Errors surfaced by a document store.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Listener was dropped by the store")]
    ListenerDropped,
}

/// Errors raised while mapping stored documents to domain values.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Missing field `{field}` in document {path}")]
    MissingField { path: String, field: String },

    #[error("Invalid field `{field}` in document {path}: expected {expected}, found {found}")]
    InvalidField {
        path: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Stable error categories exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    NotFound,
    InvalidArgument,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::NotFound => "not-found",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for subscription operations.
#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Infrastructure failure. The original error is kept as the source.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PaymentsError {
    /// Wrap a lower-level failure as an internal error.
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PaymentsError::Internal {
            message: message.into(),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentsError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            PaymentsError::NotFound(_) => ErrorKind::NotFound,
            PaymentsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PaymentsError::Internal { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type for subscription operations.
pub type Result<T> = std::result::Result<T, PaymentsError>;
