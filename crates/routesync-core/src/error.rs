//! Error types for routesync.

use thiserror::Error;

/// Result type alias using routesync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for routesync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Upstream tracking API returned a non-2xx status
    #[error("Upstream API error: HTTP {status} from {url}")]
    Upstream { status: u16, url: String },

    /// Authentication against the upstream API failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP/network request failed before a response was received
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
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
