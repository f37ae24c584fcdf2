//! The document buffer.
//!
//! Holds normalized, annotated documents in insertion order and flushes them
//! to the configured `BulkWriter` whenever a full batch has accumulated.

mod config;

pub use config::BufferConfig;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::errors::{BufferError, MetadataFnError};
use crate::flush::FlushOutcome;
use crate::metadata::MetadataInjector;
use crate::normalizer;
use bulk_buffer_repository::{BulkWriter, ClientConfig, DumpSink, OpenSearchBulkWriter};
use bulk_buffer_shared::{Document, DocumentBundle};

/// A size-triggered document buffer.
///
/// Documents are admitted with [`add`](BulkBuffer::add) or
/// [`append`](BulkBuffer::append). Once the buffer holds `size` documents or
/// more, every complete batch is written in a single bulk request before the
/// call returns; documents beyond the last complete batch stay buffered.
///
/// # Example
///
/// ```ignore
/// let mut buffer = BulkBuffer::builder(writer)
///     .size(500)
///     .metadata_fn("_index", |_| Ok(json!("events")))
///     .build()?;
///
/// buffer.add(json!({"user": "ada", "action": "login"})).await?;
/// buffer.flush().await?;
/// ```
pub struct BulkBuffer {
    pub(crate) config: BufferConfig,
    pub(crate) writer: Arc<dyn BulkWriter>,
    pub(crate) injector: MetadataInjector,
    pub(crate) dump_sink: Option<Arc<dyn DumpSink>>,
    pub(crate) documents: Vec<Document>,
    pub(crate) oldest_admitted: Option<Instant>,
}

impl BulkBuffer {
    /// Create a buffer without metadata functions or a dump sink.
    pub fn new(writer: Arc<dyn BulkWriter>, config: BufferConfig) -> Result<Self, BufferError> {
        Self::builder(writer).config(config).build()
    }

    pub fn builder(writer: Arc<dyn BulkWriter>) -> BulkBufferBuilder {
        BulkBufferBuilder::new(writer)
    }

    /// Start building a buffer that writes to OpenSearch.
    ///
    /// When `client.chunk_size` is unset, bulk requests are split into chunks
    /// of the buffer size.
    pub fn connect(mut client: ClientConfig, config: BufferConfig) -> Result<BulkBufferBuilder, BufferError> {
        config.validate()?;
        if client.chunk_size.is_none() {
            client.chunk_size = Some(config.size);
        }
        let writer = OpenSearchBulkWriter::new(client)?;
        Ok(Self::builder(Arc::new(writer)).config(config))
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Number of documents currently buffered.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Buffered documents, in insertion order.
    pub fn contents(&self) -> &[Document] {
        &self.documents
    }

    /// Time since the oldest buffered document was admitted.
    ///
    /// Returns `None` when the buffer is empty. Successive calls never
    /// return a smaller value while the same document remains buffered.
    pub fn oldest_elapsed(&self) -> Option<Duration> {
        self.oldest_admitted.map(|admitted| admitted.elapsed())
    }

    /// Normalize, annotate and admit an input batch.
    ///
    /// Either every document of the batch is admitted or none is: metadata
    /// is computed for the whole batch before anything enters the buffer.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(FlushOutcome))` - If the batch filled the buffer and a flush ran
    /// * `Ok(None)` - If the documents were buffered without flushing
    /// * `Err(BufferError)` - If the input was rejected or the automatic flush failed
    #[instrument(skip(self, bundle), fields(buffered = self.documents.len()))]
    pub async fn add(&mut self, bundle: impl Into<DocumentBundle>) -> Result<Option<FlushOutcome>, BufferError> {
        let mut staged = normalizer::normalize(bundle.into())?;
        self.injector.annotate_all(&mut staged)?;
        self.append(staged).await
    }

    /// Admit documents that are already normalized and annotated.
    ///
    /// An empty batch is a no-op. The whole batch is admitted before the
    /// capacity check, so a batch larger than the buffer is never split
    /// on admission.
    pub async fn append(&mut self, documents: Vec<Document>) -> Result<Option<FlushOutcome>, BufferError> {
        if documents.is_empty() {
            return Ok(None);
        }

        let admitted_at = Instant::now();
        if self.documents.is_empty() {
            self.oldest_admitted = Some(admitted_at);
        }

        let count = documents.len();
        self.documents.extend(documents);
        debug!(admitted = count, buffered = self.documents.len(), "Admitted documents");

        Ok(self.flush_full_batches(admitted_at).await?)
    }

    /// Discard all buffered documents without writing them.
    pub(crate) fn discard(&mut self) -> usize {
        let discarded = self.documents.len();
        self.documents.clear();
        self.oldest_admitted = None;
        discarded
    }
}

impl fmt::Display for BulkBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BulkBuffer containing {} documents", self.documents.len())
    }
}

impl fmt::Debug for BulkBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkBuffer")
            .field("config", &self.config)
            .field("injector", &self.injector)
            .field("dump_sink", &self.dump_sink.is_some())
            .field("len", &self.documents.len())
            .finish()
    }
}

impl Drop for BulkBuffer {
    fn drop(&mut self) {
        if !self.documents.is_empty() {
            warn!(
                lost = self.documents.len(),
                "BulkBuffer dropped with unflushed documents"
            );
        }
    }
}

/// Builder for [`BulkBuffer`].
///
/// Metadata registration errors are reported by [`build`](Self::build).
pub struct BulkBufferBuilder {
    writer: Arc<dyn BulkWriter>,
    config: BufferConfig,
    injector: MetadataInjector,
    dump_sink: Option<Arc<dyn DumpSink>>,
    error: Option<BufferError>,
}

impl BulkBufferBuilder {
    fn new(writer: Arc<dyn BulkWriter>) -> Self {
        Self {
            writer,
            config: BufferConfig::default(),
            injector: MetadataInjector::new(),
            dump_sink: None,
            error: None,
        }
    }

    pub fn config(mut self, config: BufferConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of documents that triggers an automatic flush.
    pub fn size(mut self, size: usize) -> Self {
        self.config.size = size;
        self
    }

    pub fn verbose_errors(mut self, verbose: bool) -> Self {
        self.config.verbose_errors = verbose;
        self
    }

    /// Compute `field` for every added document.
    pub fn metadata_fn<F>(mut self, field: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Document) -> Result<Value, MetadataFnError> + Send + Sync + 'static,
    {
        if self.error.is_none() {
            if let Err(e) = self.injector.register(field, function) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Set `field` to a constant on every added document.
    pub fn metadata_field(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.metadata_fn(field, move |_: &Document| Ok(value.clone()))
    }

    /// Persist unwritten documents through `sink` when a write or scope fails.
    pub fn dump_to(mut self, sink: Arc<dyn DumpSink>) -> Self {
        self.dump_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<BulkBuffer, BufferError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.config.validate()?;

        info!(
            size = self.config.size,
            metadata_fields = ?self.injector.fields().collect::<Vec<_>>(),
            dump = self.dump_sink.is_some(),
            "Created bulk buffer"
        );

        Ok(BulkBuffer {
            config: self.config,
            writer: self.writer,
            injector: self.injector,
            dump_sink: self.dump_sink,
            documents: Vec::new(),
            oldest_admitted: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{doc, MockWriter, WriterBehavior};
    use bulk_buffer_shared::{RowIndex, TabularBatch};
    use serde_json::json;

    fn buffer_with(writer: &Arc<MockWriter>, size: usize) -> BulkBuffer {
        BulkBuffer::builder(writer.clone()).size(size).build().unwrap()
    }

    #[tokio::test]
    async fn test_capacity_two_flushes_automatically() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = buffer_with(&writer, 2);

        assert!(buffer.add(doc(json!({"a": 1}))).await.unwrap().is_none());
        assert_eq!(buffer.len(), 1);

        let outcome = buffer.add(doc(json!({"a": 2}))).await.unwrap();

        assert_eq!(outcome, Some(FlushOutcome { written: 2 }));
        assert_eq!(buffer.len(), 0);
        assert!(buffer.oldest_elapsed().is_none());
        assert_eq!(writer.batch_sizes().await, vec![2]);
    }

    #[tokio::test]
    async fn test_oversized_batch_flushes_complete_batches_and_keeps_remainder() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = buffer_with(&writer, 2);

        buffer.add(doc(json!({"n": 0}))).await.unwrap();
        let batch: Vec<Document> = (1..=4).map(|n| doc(json!({"n": n}))).collect();
        let outcome = buffer.add(batch).await.unwrap();

        assert_eq!(outcome, Some(FlushOutcome { written: 4 }));
        assert_eq!(buffer.contents(), &[doc(json!({"n": 4}))]);
        assert!(buffer.oldest_elapsed().is_some());

        let batches = writer.batches.lock().await;
        assert_eq!(batches.len(), 1);
        let written: Vec<i64> = batches[0].iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(written, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = buffer_with(&writer, 1);

        assert!(buffer.append(Vec::new()).await.unwrap().is_none());
        assert!(buffer.add(Vec::<Document>::new()).await.unwrap().is_none());

        assert!(buffer.is_empty());
        assert!(buffer.oldest_elapsed().is_none());
        assert!(writer.batches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_oldest_elapsed_tracks_first_admission() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = buffer_with(&writer, 10);

        assert!(buffer.oldest_elapsed().is_none());
        buffer.add(doc(json!({"a": 1}))).await.unwrap();
        let first = buffer.oldest_elapsed().unwrap();

        std::thread::sleep(Duration::from_millis(5));
        buffer.add(doc(json!({"a": 2}))).await.unwrap();
        let second = buffer.oldest_elapsed().unwrap();

        assert!(second >= first + Duration::from_millis(5));

        buffer.flush().await.unwrap();
        assert!(buffer.oldest_elapsed().is_none());
    }

    #[tokio::test]
    async fn test_metadata_applied_to_table_rows() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = BulkBuffer::builder(writer.clone())
            .size(10)
            .metadata_field("_index", "scores")
            .metadata_fn("_id", |d: &Document| {
                let total: i64 = d.values().filter_map(Value::as_i64).sum();
                Ok(json!(total))
            })
            .build()
            .unwrap();

        let table = TabularBatch::new(["a", "b"], vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]])
            .with_index(RowIndex::unnamed(vec![json!(0), json!(1)]));
        buffer.add(table).await.unwrap();

        assert_eq!(
            buffer.contents(),
            &[
                doc(json!({"a": 1, "b": 2, "_index": "scores", "_id": 3})),
                doc(json!({"a": 3, "b": 4, "_index": "scores", "_id": 7})),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_metadata_admits_nothing() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = BulkBuffer::builder(writer.clone())
            .size(10)
            .metadata_fn("_id", |d: &Document| {
                d.get("key").cloned().ok_or_else(|| "no key".into())
            })
            .build()
            .unwrap();

        let batch = vec![doc(json!({"key": 1})), doc(json!({"other": 2}))];
        let result = buffer.add(batch).await;

        assert!(matches!(result, Err(BufferError::MetadataFunction { .. })));
        assert!(buffer.is_empty());
        assert!(buffer.oldest_elapsed().is_none());
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = buffer_with(&writer, 10);

        let result = buffer.add(json!(42)).await;

        assert!(matches!(result, Err(BufferError::InvalidInput(_))));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_failed_automatic_flush_surfaces_as_buffer_error() {
        let writer = Arc::new(MockWriter::with_behavior(WriterBehavior::Fail));
        let mut buffer = buffer_with(&writer, 2);

        let batch = vec![doc(json!({"a": 1})), doc(json!({"a": 2})), doc(json!({"a": 3}))];
        let result = buffer.add(batch).await;

        match result {
            Err(BufferError::Flush(e)) => {
                assert!(e.is_transport());
                assert_eq!(e.attempted(), 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(buffer.contents(), &[doc(json!({"a": 3}))]);
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        let writer: Arc<dyn BulkWriter> = Arc::new(MockWriter::new());

        assert!(matches!(
            BulkBuffer::builder(writer.clone()).size(0).build(),
            Err(BufferError::ConfigError(_))
        ));
        assert!(matches!(
            BulkBuffer::builder(writer.clone())
                .metadata_field("_id", 1)
                .metadata_field("_id", 2)
                .build(),
            Err(BufferError::ConfigError(_))
        ));
        assert!(matches!(
            BulkBuffer::builder(writer).metadata_field("", 1).build(),
            Err(BufferError::ConfigError(_))
        ));
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let result = BulkBuffer::connect(ClientConfig::new("not a url"), BufferConfig::default());
        assert!(matches!(result, Err(BufferError::Backend(_))));
    }

    #[tokio::test]
    async fn test_display() {
        let writer = Arc::new(MockWriter::new());
        let mut buffer = buffer_with(&writer, 10);
        buffer.add(vec![doc(json!({"a": 1})), doc(json!({"a": 2}))]).await.unwrap();

        assert_eq!(buffer.to_string(), "BulkBuffer containing 2 documents");
        buffer.flush().await.unwrap();
    }
}
