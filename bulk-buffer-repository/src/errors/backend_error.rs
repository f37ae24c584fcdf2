//! Backend error types.
//!
//! This module defines the errors a `BulkWriter` returns when a bulk write
//! fails as a whole, before any document could be processed.

use thiserror::Error;

/// Errors that can occur while talking to the indexing backend.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// Client configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to reach the backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered the bulk request with a non-success status.
    #[error("Bulk request failed with status {status}: {body}")]
    ResponseError { status: u16, body: String },

    /// Failed to parse the backend's response.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a document for the bulk request.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BackendError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a response error.
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        Self::ResponseError {
            status,
            body: body.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Determine if the error is transient and the request may be resent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::ResponseError { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::ConfigError(_) | Self::ParseError(_) | Self::SerializationError(_) => false,
        }
    }
}
