//! Error types for the bulk buffer.

use std::error::Error as StdError;
use std::fmt;

use bulk_buffer_repository::{BackendError, BulkItemFailure, BulkWriteSummary, PersistenceError};
use thiserror::Error;

/// Error type metadata functions return.
pub type MetadataFnError = Box<dyn StdError + Send + Sync>;

/// Errors that can occur while adding documents to a buffer.
#[derive(Error, Debug)]
pub enum BufferError {
    /// The input batch has an unsupported shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A metadata function failed; no document of the call was admitted.
    #[error("Metadata function for field `{field}` failed: {source}")]
    MetadataFunction {
        field: String,
        #[source]
        source: MetadataFnError,
    },

    /// An automatic flush triggered by reaching capacity failed.
    #[error(transparent)]
    Flush(#[from] FlushError),

    /// Invalid buffer settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The backend client could not be constructed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl BufferError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a metadata function error.
    pub fn metadata_function(field: impl Into<String>, source: MetadataFnError) -> Self {
        Self::MetadataFunction {
            field: field.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Why a flush failed.
#[derive(Debug)]
pub enum FlushFailure {
    /// The bulk write failed before any document was processed.
    Transport(BackendError),
    /// The backend processed the batch but did not write every document.
    Partial { failures: Vec<BulkItemFailure> },
}

/// A failed bulk write.
///
/// The flushed documents have already been removed from the buffer when this
/// error is returned. `summary()` is a one-line description safe for routine
/// logging; `detail()` includes the backend's full response, which can embed
/// the rejected documents. `Display` uses one or the other depending on the
/// buffer's `verbose_errors` setting.
#[derive(Debug)]
pub struct FlushError {
    attempted: usize,
    written: usize,
    cause: FlushFailure,
    verbose: bool,
    dumped_to: Option<String>,
    persistence_error: Option<PersistenceError>,
}

impl FlushError {
    /// A bulk write that failed as a whole.
    pub fn transport(attempted: usize, cause: BackendError, verbose: bool) -> Self {
        Self {
            attempted,
            written: 0,
            cause: FlushFailure::Transport(cause),
            verbose,
            dumped_to: None,
            persistence_error: None,
        }
    }

    /// A bulk write in which some documents were rejected.
    pub fn partial(summary: BulkWriteSummary, verbose: bool) -> Self {
        Self {
            attempted: summary.total,
            written: summary.succeeded,
            cause: FlushFailure::Partial {
                failures: summary.failures,
            },
            verbose,
            dumped_to: None,
            persistence_error: None,
        }
    }

    /// Record the outcome of persisting the unwritten documents.
    pub(crate) fn with_dump(mut self, dump: Option<Result<String, PersistenceError>>) -> Self {
        match dump {
            Some(Ok(path)) => self.dumped_to = Some(path),
            Some(Err(e)) => self.persistence_error = Some(e),
            None => {}
        }
        self
    }

    /// Number of documents submitted.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Number of documents the backend wrote.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Number of documents not written.
    pub fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.written)
    }

    pub fn cause(&self) -> &FlushFailure {
        &self.cause
    }

    /// Per-document failures reported by the backend. Empty for transport failures.
    pub fn failures(&self) -> &[BulkItemFailure] {
        match &self.cause {
            FlushFailure::Partial { failures } => failures.as_slice(),
            FlushFailure::Transport(_) => &[],
        }
    }

    /// Whether the bulk write failed before any document was processed.
    pub fn is_transport(&self) -> bool {
        matches!(self.cause, FlushFailure::Transport(_))
    }

    /// Where the unwritten documents were persisted, if they were.
    pub fn dumped_to(&self) -> Option<&str> {
        self.dumped_to.as_deref()
    }

    /// Failure to persist the unwritten documents, if persisting was attempted and failed.
    pub fn persistence_error(&self) -> Option<&PersistenceError> {
        self.persistence_error.as_ref()
    }

    /// Compact description of the failure.
    pub fn summary(&self) -> String {
        match &self.cause {
            FlushFailure::Transport(_) => {
                format!("Bulk write of {} documents failed", self.attempted)
            }
            FlushFailure::Partial { .. } => {
                format!("Failed to insert {} of {} documents", self.failed(), self.attempted)
            }
        }
    }

    /// Full description of the failure including the underlying cause.
    pub fn detail(&self) -> String {
        match &self.cause {
            FlushFailure::Transport(e) => format!("{}: {}", self.summary(), e),
            FlushFailure::Partial { failures } if failures.is_empty() => self.summary(),
            FlushFailure::Partial { failures } => {
                let items: Vec<String> = failures.iter().map(ToString::to_string).collect();
                format!("{}: bulk insertion errors: [{}]", self.summary(), items.join("; "))
            }
        }
    }
}

impl fmt::Display for FlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verbose {
            f.write_str(&self.detail())
        } else {
            f.write_str(&self.summary())
        }
    }
}

impl StdError for FlushError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            FlushFailure::Transport(e) => Some(e),
            FlushFailure::Partial { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected_summary() -> BulkWriteSummary {
        BulkWriteSummary {
            total: 3,
            succeeded: 2,
            failures: vec![BulkItemFailure {
                position: 1,
                index: Some("logs".to_string()),
                id: Some("b".to_string()),
                status: Some(400),
                reason: "mapper_parsing_exception: failed to parse".to_string(),
            }],
        }
    }

    #[test]
    fn test_partial_error_verbose_display() {
        let err = FlushError::partial(rejected_summary(), true);

        assert_eq!(err.failed(), 1);
        assert_eq!(err.summary(), "Failed to insert 1 of 3 documents");
        assert_eq!(
            err.to_string(),
            "Failed to insert 1 of 3 documents: bulk insertion errors: \
             [document 1 (_id=b) status 400: mapper_parsing_exception: failed to parse]"
        );
    }

    #[test]
    fn test_partial_error_quiet_display() {
        let err = FlushError::partial(rejected_summary(), false);

        assert_eq!(err.to_string(), "Failed to insert 1 of 3 documents");
        assert!(err.detail().contains("mapper_parsing_exception"));
    }

    #[test]
    fn test_short_count_without_item_errors() {
        let summary = BulkWriteSummary {
            total: 4,
            succeeded: 3,
            failures: vec![],
        };
        let err = FlushError::partial(summary, true);

        assert_eq!(err.to_string(), "Failed to insert 1 of 4 documents");
        assert!(err.failures().is_empty());
    }

    #[test]
    fn test_transport_error_exposes_source() {
        let err = FlushError::transport(5, BackendError::connection("refused"), true);

        assert!(err.is_transport());
        assert_eq!(err.written(), 0);
        assert_eq!(err.summary(), "Bulk write of 5 documents failed");
        assert_eq!(
            err.to_string(),
            "Bulk write of 5 documents failed: Connection error: refused"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_with_dump_records_outcome() {
        let err = FlushError::transport(1, BackendError::connection("refused"), false)
            .with_dump(Some(Ok("/tmp/dump.ndjson".to_string())));
        assert_eq!(err.dumped_to(), Some("/tmp/dump.ndjson"));
        assert!(err.persistence_error().is_none());

        let err = FlushError::transport(1, BackendError::connection("refused"), false).with_dump(
            Some(Err(PersistenceError::Serialization("bad".to_string()))),
        );
        assert!(err.dumped_to().is_none());
        assert!(err.persistence_error().is_some());
    }

    #[test]
    fn test_buffer_error_wraps_flush_transparently() {
        let err: BufferError =
            FlushError::transport(2, BackendError::connection("refused"), false).into();
        assert_eq!(err.to_string(), "Bulk write of 2 documents failed");
    }
}
