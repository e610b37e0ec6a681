//! Error types for stowage.

use thiserror::Error;

/// Caller-visible classification of a failure.
///
/// Every [`StowageError`] maps onto exactly one kind. Only
/// `ResourceExhausted` is worth retrying as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed.
    InvalidArgument,
    /// No metadata record exists for the requested file.
    NotFound,
    /// Admission was denied because the operation class is at capacity.
    ResourceExhausted,
    /// Storage, database, or transfer failure.
    Internal,
}

/// Common error type for stowage.
#[derive(Error, Debug)]
pub enum StowageError {
    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error on the blob store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Admission denied.
    #[error("{0}")]
    ResourceExhausted(String),

    /// Metadata and stored bytes disagree.
    #[error("inconsistent storage state: {0}")]
    Inconsistent(String),

    /// Inbound or outbound stream failure.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StowageError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StowageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StowageError::NotFound(_) => ErrorKind::NotFound,
            StowageError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            StowageError::Database(_)
            | StowageError::Io(_)
            | StowageError::Inconsistent(_)
            | StowageError::Transfer(_)
            | StowageError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller may retry the same request after backing off.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for StowageError {
    fn from(e: sqlx::Error) -> Self {
        StowageError::Database(e.to_string())
    }
}

// Conversion from HTTP client errors
impl From<reqwest::Error> for StowageError {
    fn from(e: reqwest::Error) -> Self {
        StowageError::Transfer(e.to_string())
    }
}

/// Result type alias for stowage operations.
pub type Result<T> = std::result::Result<T, StowageError>;
