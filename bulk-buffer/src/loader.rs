//! The load loop.

use tracing::{info, instrument};

use bulk_buffer_core::{BufferError, BulkBuffer, ScopeError};
use bulk_buffer_shared::DocumentBundle;

/// Add every bundle to `buffer` inside a scope and flush at the end.
///
/// On failure the scope dumps whatever is still buffered (when the buffer
/// has a dump sink) before returning the error.
///
/// # Returns
///
/// * `Ok(usize)` - Number of documents written
/// * `Err(ScopeError<BufferError>)` - If a bundle was rejected or a flush failed
#[instrument(skip(buffer, bundles), fields(bundles = bundles.len()))]
pub async fn load(
    buffer: &mut BulkBuffer,
    bundles: Vec<DocumentBundle>,
) -> Result<usize, ScopeError<BufferError>> {
    let written = buffer
        .scope(|buffer| {
            Box::pin(async move {
                let mut written = 0;
                for bundle in bundles {
                    if let Some(outcome) = buffer.add(bundle).await? {
                        written += outcome.written;
                    }
                }
                written += buffer.flush().await?.written;
                Ok::<_, BufferError>(written)
            })
        })
        .await?;

    info!(written = written, "Load completed");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dependencies, LoadSettings};
    use async_trait::async_trait;
    use bulk_buffer_repository::{BackendError, BulkItemFailure, BulkWriteSummary, BulkWriter};
    use bulk_buffer_shared::Document;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Mock writer rejecting documents whose `_id` is in `reject_ids`.
    struct MockWriter {
        batches: Arc<Mutex<Vec<Vec<Document>>>>,
        reject_ids: Vec<String>,
    }

    impl MockWriter {
        fn new() -> Self {
            Self {
                batches: Arc::new(Mutex::new(Vec::new())),
                reject_ids: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BulkWriter for MockWriter {
        async fn bulk_write(&self, documents: &[Document]) -> Result<BulkWriteSummary, BackendError> {
            self.batches.lock().await.push(documents.to_vec());

            let failures: Vec<BulkItemFailure> = documents
                .iter()
                .enumerate()
                .filter_map(|(position, document)| {
                    let id = document.get("_id")?.as_str()?.to_string();
                    self.reject_ids.contains(&id).then(|| BulkItemFailure {
                        position,
                        index: None,
                        id: Some(id),
                        status: Some(409),
                        reason: "version_conflict_engine_exception".to_string(),
                    })
                })
                .collect();

            Ok(BulkWriteSummary {
                total: documents.len(),
                succeeded: documents.len() - failures.len(),
                failures,
            })
        }
    }

    fn settings(size: usize) -> LoadSettings {
        LoadSettings {
            size,
            id_field: Some("key".to_string()),
            ..LoadSettings::default()
        }
    }

    #[tokio::test]
    async fn test_load_writes_everything() {
        let writer = Arc::new(MockWriter::new());
        let mut deps = Dependencies::with_writer(&settings(2), writer.clone()).unwrap();

        let bundles = vec![
            DocumentBundle::Json(json!({"key": "a"})),
            DocumentBundle::Json(json!([{"key": "b"}, {"key": "c"}])),
        ];
        let written = load(&mut deps.buffer, bundles).await.unwrap();

        assert_eq!(written, 3);
        let batches = writer.batches.lock().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][1]["_id"], json!("b"));
        assert!(deps.buffer.is_empty());
    }

    #[tokio::test]
    async fn test_load_dumps_on_missing_id_field() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(MockWriter::new());
        let settings = LoadSettings {
            dump_dir: Some(dir.path().to_path_buf()),
            ..settings(10)
        };
        let mut deps = Dependencies::with_writer(&settings, writer.clone()).unwrap();

        let bundles = vec![
            DocumentBundle::Json(json!({"key": "a"})),
            DocumentBundle::Json(json!({"other": "b"})),
        ];
        let err = load(&mut deps.buffer, bundles).await.unwrap_err();

        let dumped_to = match err {
            ScopeError::Body {
                error: BufferError::MetadataFunction { field, .. },
                dumped_to,
                ..
            } => {
                assert_eq!(field, "_id");
                dumped_to.unwrap()
            }
            other => panic!("unexpected error: {other}"),
        };
        let contents = std::fs::read_to_string(dumped_to).unwrap();
        assert_eq!(contents, "{\"key\":\"a\",\"_id\":\"a\"}\n");
        assert!(writer.batches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_reports_rejected_documents() {
        let writer = Arc::new(MockWriter {
            reject_ids: vec!["b".to_string()],
            ..MockWriter::new()
        });
        let mut deps = Dependencies::with_writer(&settings(10), writer.clone()).unwrap();

        let bundles = vec![DocumentBundle::Json(json!([{"key": "a"}, {"key": "b"}]))];
        let err = load(&mut deps.buffer, bundles).await.unwrap_err();

        match err {
            ScopeError::Body {
                error: BufferError::Flush(e),
                ..
            } => {
                assert_eq!(e.failed(), 1);
                assert_eq!(e.failures()[0].id.as_deref(), Some("b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
