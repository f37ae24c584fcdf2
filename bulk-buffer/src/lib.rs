//! # Bulk Buffer Loader
//!
//! Reads documents from NDJSON or CSV input and writes them to OpenSearch
//! through a `BulkBuffer`.
//!
//! This crate provides the wiring (environment and CLI configuration), the
//! input readers, and the load loop used by the `bulk-buffer` binary.

pub mod config;
pub mod input;
pub mod loader;

pub use config::{Dependencies, LoadSettings};
pub use input::InputFormat;
pub use loader::load;

use thiserror::Error;

/// Errors that can occur while setting up or running a load.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Buffer error.
    #[error("Buffer error: {0}")]
    BufferError(#[from] bulk_buffer_core::BufferError),

    /// Backend client error.
    #[error("Backend error: {0}")]
    BackendError(#[from] bulk_buffer_repository::BackendError),

    /// Malformed input record.
    #[error("Input error at record {record}: {message}")]
    InputError { record: usize, message: String },

    /// CSV error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LoadError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an input error for the record at `record` (1-based).
    pub fn input(record: usize, msg: impl Into<String>) -> Self {
        Self::InputError {
            record,
            message: msg.into(),
        }
    }
}
