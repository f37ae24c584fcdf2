//! Configuration types for the OpenSearch bulk writer.

use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::BackendError;

/// Default OpenSearch URL.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Retry policy for bulk requests that fail transiently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts for a failed bulk request.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Configuration for the OpenSearch bulk writer.
///
/// The buffer passes this through untouched, apart from defaulting
/// `chunk_size` to its own capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The OpenSearch server URL.
    pub url: String,
    /// Basic auth user name.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Index used for documents that carry no `_index` field.
    pub default_index: Option<String>,
    /// Maximum number of documents per bulk request. None sends the whole batch at once.
    pub chunk_size: Option<usize>,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OPENSEARCH_URL.to_string(),
            username: None,
            password: None,
            default_index: None,
            chunk_size: None,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the default index.
    pub fn with_default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = Some(index.into());
        self
    }

    /// Set basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the per-request chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: basic auth credentials
    /// - `OPENSEARCH_INDEX`: default index for documents without `_index`
    /// - `BULK_CHUNK_SIZE`: maximum documents per bulk request
    /// - `BULK_MAX_RETRIES`: retry attempts for transient failures (default: 3)
    pub fn from_env() -> Result<Self, BackendError> {
        let mut config = Self {
            url: env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string()),
            username: env::var("OPENSEARCH_USERNAME").ok(),
            password: env::var("OPENSEARCH_PASSWORD").ok(),
            default_index: env::var("OPENSEARCH_INDEX").ok(),
            ..Self::default()
        };

        if let Ok(chunk_size) = env::var("BULK_CHUNK_SIZE") {
            let chunk_size = chunk_size
                .parse()
                .map_err(|e| BackendError::config(format!("Invalid BULK_CHUNK_SIZE: {}", e)))?;
            config.chunk_size = Some(chunk_size);
        }
        if let Ok(max_retries) = env::var("BULK_MAX_RETRIES") {
            config.retry.max_retries = max_retries
                .parse()
                .map_err(|e| BackendError::config(format!("Invalid BULK_MAX_RETRIES: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings that would otherwise fail at request time.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.chunk_size == Some(0) {
            return Err(BackendError::config("chunk_size must be positive"));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(BackendError::config(
                "username and password must be set together",
            ));
        }
        Ok(())
    }
}
