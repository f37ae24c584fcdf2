//! Result types for bulk write operations.

use serde::Serialize;
use std::fmt;

/// A document the backend rejected during a bulk write.
///
/// `position` is the document's offset in the slice passed to `bulk_write`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemFailure {
    /// Offset of the document in the submitted batch.
    pub position: usize,
    /// Destination index, when known.
    pub index: Option<String>,
    /// Document identifier, when known.
    pub id: Option<String>,
    /// HTTP status the backend reported for the item, if any.
    pub status: Option<u16>,
    /// Backend-provided reason for the failure.
    pub reason: String,
}

impl fmt::Display for BulkItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {}", self.position)?;
        if let Some(ref id) = self.id {
            write!(f, " (_id={})", id)?;
        }
        if let Some(status) = self.status {
            write!(f, " status {}", status)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Summary of a bulk write.
///
/// This allows callers to handle partial failures: `succeeded` counts the
/// documents the backend accepted and `failures` lists the ones it rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkWriteSummary {
    /// Number of documents submitted.
    pub total: usize,
    /// Number of documents written.
    pub succeeded: usize,
    /// Individual failures.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkWriteSummary {
    /// Summary for a batch in which every document was written.
    pub fn all_succeeded(total: usize) -> Self {
        Self {
            total,
            succeeded: total,
            failures: vec![],
        }
    }

    /// Number of documents not written.
    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.succeeded)
    }

    /// Whether every submitted document was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.succeeded == self.total
    }
}
