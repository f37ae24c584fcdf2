//! Mock collaborators for buffer tests.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use bulk_buffer_repository::{
    BackendError, BulkItemFailure, BulkWriteSummary, BulkWriter, DumpSink, PersistenceError,
};
use bulk_buffer_shared::Document;

/// Build a document from a `json!` object literal.
pub(crate) fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

/// How the mock writer answers a bulk write.
#[derive(Debug, Clone)]
pub(crate) enum WriterBehavior {
    /// Write every document.
    Succeed,
    /// Reject the documents at these positions.
    Reject(Vec<usize>),
    /// Report fewer successes than submitted, without item errors.
    ShortCount(usize),
    /// Fail the whole request.
    Fail,
}

/// Mock writer recording every batch it receives.
pub(crate) struct MockWriter {
    pub batches: Arc<Mutex<Vec<Vec<Document>>>>,
    behavior: WriterBehavior,
}

impl MockWriter {
    pub fn new() -> Self {
        Self::with_behavior(WriterBehavior::Succeed)
    }

    pub fn with_behavior(behavior: WriterBehavior) -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
            behavior,
        }
    }

    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().await.iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl BulkWriter for MockWriter {
    async fn bulk_write(&self, documents: &[Document]) -> Result<BulkWriteSummary, BackendError> {
        self.batches.lock().await.push(documents.to_vec());

        match &self.behavior {
            WriterBehavior::Succeed => Ok(BulkWriteSummary::all_succeeded(documents.len())),
            WriterBehavior::Reject(positions) => {
                let failures: Vec<BulkItemFailure> = positions
                    .iter()
                    .filter(|&&position| position < documents.len())
                    .map(|&position| BulkItemFailure {
                        position,
                        index: Some("test".to_string()),
                        id: documents[position]
                            .get("_id")
                            .map(|id| id.to_string()),
                        status: Some(400),
                        reason: "mapper_parsing_exception".to_string(),
                    })
                    .collect();
                Ok(BulkWriteSummary {
                    total: documents.len(),
                    succeeded: documents.len() - failures.len(),
                    failures,
                })
            }
            WriterBehavior::ShortCount(missing) => Ok(BulkWriteSummary {
                total: documents.len(),
                succeeded: documents.len().saturating_sub(*missing),
                failures: Vec::new(),
            }),
            WriterBehavior::Fail => Err(BackendError::connection("Mock failure")),
        }
    }
}

/// Mock dump sink keeping written lines in memory.
pub(crate) struct MockDumpSink {
    pub dumps: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    should_fail: bool,
}

impl MockDumpSink {
    pub fn new() -> Self {
        Self {
            dumps: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl DumpSink for MockDumpSink {
    async fn write_lines(
        &self,
        lines: &[String],
        destination_hint: &str,
    ) -> Result<String, PersistenceError> {
        if self.should_fail {
            return Err(PersistenceError::io(
                "/unwritable",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Mock failure"),
            ));
        }
        self.dumps
            .lock()
            .await
            .push((destination_hint.to_string(), lines.to_vec()));
        Ok(format!("{}.ndjson", destination_hint))
    }
}
