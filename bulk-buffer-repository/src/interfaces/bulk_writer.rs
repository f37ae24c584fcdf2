//! Bulk writer trait definition.
//!
//! This module defines the abstract interface for submitting a batch of
//! documents to an indexing backend in one round trip.

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::types::BulkWriteSummary;
use bulk_buffer_shared::Document;

/// Abstracts the underlying indexing backend (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into the buffer to enable dependency injection
/// and testing with mock implementations.
#[async_trait]
pub trait BulkWriter: Send + Sync {
    /// Write documents in bulk and return a summary of successful and failed documents.
    ///
    /// Each document may carry the reserved `_index`, `_id` and `_routing` fields,
    /// which the implementation moves out of the document source and into the
    /// bulk action.
    ///
    /// # Arguments
    ///
    /// * `documents` - Flat documents, in the order they were buffered
    ///
    /// # Returns
    ///
    /// * `Ok(BulkWriteSummary)` - Success count plus one failure per rejected document,
    ///   tied to its position in `documents`
    /// * `Err(BackendError)` - If the write failed before any document was processed
    async fn bulk_write(&self, documents: &[Document]) -> Result<BulkWriteSummary, BackendError>;
}
