//! OpenSearch implementation of the bulk writer.
//!
//! This module provides a concrete implementation of `BulkWriter` using the
//! OpenSearch `_bulk` API as the backend.

mod actions;
mod client;

pub use client::OpenSearchBulkWriter;
