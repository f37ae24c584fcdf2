//! # Bulk Buffer Repository
//!
//! This crate provides the external collaborators of the bulk buffer: the
//! `BulkWriter` interface with its OpenSearch implementation, and the
//! `DumpSink` interface with a file-backed implementation used to persist
//! buffer contents when a scope exits with an error.

pub mod config;
pub mod dump;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::{ClientConfig, RetryConfig};
pub use dump::FileDumpSink;
pub use errors::{BackendError, PersistenceError};
pub use interfaces::{BulkWriter, DumpSink};
pub use opensearch::OpenSearchBulkWriter;
pub use types::{BulkItemFailure, BulkWriteSummary};
