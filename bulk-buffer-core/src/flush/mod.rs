//! Flush controller.
//!
//! Submits buffered documents to the bulk writer and turns the writer's
//! summary into a `FlushOutcome` or a `FlushError`.

use std::time::Instant;

use tracing::{error, info, instrument, warn};

use crate::buffer::BulkBuffer;
use crate::errors::FlushError;
use bulk_buffer_repository::PersistenceError;

/// Destination hint passed to the dump sink.
pub const DUMP_HINT: &str = "bulk_buffer_dump";

/// A successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Number of documents the backend wrote.
    pub written: usize,
}

impl BulkBuffer {
    /// Write every buffered document in one bulk request.
    ///
    /// The buffer is empty afterwards whether or not the write succeeded.
    /// When the request fails as a whole and a dump sink is configured, the
    /// documents are persisted before they are dropped.
    ///
    /// # Returns
    ///
    /// * `Ok(FlushOutcome)` - If every document was written (or the buffer was empty)
    /// * `Err(FlushError)` - If the request failed or some documents were rejected
    #[instrument(skip(self), fields(count = self.documents.len()))]
    pub async fn flush(&mut self) -> Result<FlushOutcome, FlushError> {
        let count = self.documents.len();
        self.write_leading(count, None).await
    }

    /// Write every complete batch once the buffer has reached capacity.
    ///
    /// The documents left over stay buffered with `admitted_at` as their
    /// admission instant.
    pub(crate) async fn flush_full_batches(
        &mut self,
        admitted_at: Instant,
    ) -> Result<Option<FlushOutcome>, FlushError> {
        let len = self.documents.len();
        let size = self.config.size;
        if len < size {
            return Ok(None);
        }

        let count = len - len % size;
        info!(count = count, remainder = len - count, "Buffer reached capacity");
        self.write_leading(count, Some(admitted_at)).await.map(Some)
    }

    /// Write the first `count` documents and remove them from the buffer.
    ///
    /// Documents stay buffered until the write completes, so dropping the
    /// returned future part way loses nothing.
    async fn write_leading(
        &mut self,
        count: usize,
        remainder_admitted: Option<Instant>,
    ) -> Result<FlushOutcome, FlushError> {
        if count == 0 {
            return Ok(FlushOutcome { written: 0 });
        }

        let verbose = self.config.verbose_errors;
        let result = match self.writer.bulk_write(&self.documents[..count]).await {
            Ok(summary) if summary.is_complete() => {
                info!(written = summary.succeeded, "Flushed documents");
                Ok(FlushOutcome {
                    written: summary.succeeded,
                })
            }
            Ok(summary) => {
                warn!(
                    total = summary.total,
                    succeeded = summary.succeeded,
                    failed = summary.failed(),
                    "Bulk write partially failed"
                );
                Err(FlushError::partial(summary, verbose))
            }
            Err(e) => {
                error!(count = count, error = %e, "Bulk write failed");
                let dump = self.dump_leading(count).await;
                Err(FlushError::transport(count, e, verbose).with_dump(dump))
            }
        };

        self.documents.drain(..count);
        self.oldest_admitted = if self.documents.is_empty() {
            None
        } else {
            remainder_admitted.or(self.oldest_admitted)
        };

        result
    }

    /// Persist the first `count` documents through the dump sink, one JSON
    /// document per line.
    ///
    /// Returns `None` when no sink is configured.
    pub(crate) async fn dump_leading(&self, count: usize) -> Option<Result<String, PersistenceError>> {
        let sink = self.dump_sink.as_ref()?;

        let lines: Result<Vec<String>, PersistenceError> = self.documents[..count]
            .iter()
            .map(|document| {
                serde_json::to_string(document)
                    .map_err(|e| PersistenceError::Serialization(e.to_string()))
            })
            .collect();

        let result = match lines {
            Ok(lines) => sink.write_lines(&lines, DUMP_HINT).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(path) => info!(path = %path, count = count, "Dumped buffer contents"),
            Err(e) => error!(error = %e, count = count, "Failed to dump buffer contents"),
        }
        Some(result)
    }
}
