//! Error types for raw chain extraction.

use thiserror::Error;

/// Result type alias using gtp's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gtp operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Extraction could not finish within its wait budget at the current
    /// concurrency. The only error the adaptive retry loop recovers from.
    #[error("Max wait time exceeded: {0}")]
    ResourceWaitExceeded(String),

    /// Extraction failed for any other reason
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// An attempt ran past its execution budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error signals resource-wait exhaustion.
    pub fn is_resource_wait_exceeded(&self) -> bool {
        matches!(self, Error::ResourceWaitExceeded(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
