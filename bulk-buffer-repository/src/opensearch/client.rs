//! OpenSearch bulk writer implementation.
//!
//! This module provides the concrete implementation of `BulkWriter` using the
//! OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::BackendError;
use crate::interfaces::BulkWriter;
use crate::opensearch::actions::{self, BulkAction, ItemOutcome};
use crate::types::{BulkItemFailure, BulkWriteSummary};
use bulk_buffer_shared::Document;

/// Per-item status OpenSearch uses when a shard queue rejects a document.
const TOO_MANY_REQUESTS: u16 = 429;

/// OpenSearch bulk writer.
///
/// Sends documents through the `_bulk` API, split into chunks of
/// `chunk_size` documents when configured.
///
/// # Example
///
/// ```ignore
/// let config = ClientConfig::new("http://localhost:9200").with_default_index("events");
/// let writer = OpenSearchBulkWriter::new(config)?;
///
/// let summary = writer.bulk_write(&documents).await?;
/// assert_eq!(summary.succeeded, documents.len());
/// ```
pub struct OpenSearchBulkWriter {
    client: OpenSearch,
    config: ClientConfig,
}

impl OpenSearchBulkWriter {
    /// Create a new bulk writer connected to the configured URL.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBulkWriter)` - A new writer instance
    /// * `Err(BackendError)` - If the configuration is invalid or transport setup fails
    pub fn new(config: ClientConfig) -> Result<Self, BackendError> {
        config.validate()?;

        let parsed_url = Url::parse(&config.url)
            .map_err(|e| BackendError::config(format!("Invalid OpenSearch URL {}: {}", config.url, e)))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }
        let transport = builder
            .build()
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            default_index = ?config.default_index,
            chunk_size = ?config.chunk_size,
            "Created OpenSearch bulk writer"
        );

        Ok(Self { client, config })
    }

    /// The configuration this writer was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one bulk request.
    async fn send(&self, pending: &[(usize, BulkAction)]) -> Result<Value, BackendError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(pending.len() * 2);
        for (_, action) in pending {
            body.push(action.action.clone().into());
            body.push(action.source.clone().into());
        }

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(BackendError::response(status.as_u16(), error_body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))
    }

    /// Send one bulk request with exponential backoff on transient failures.
    async fn send_with_retry(&self, pending: &[(usize, BulkAction)]) -> Result<Value, BackendError> {
        let retry = &self.config.retry;
        let mut delay_ms = retry.initial_retry_delay_ms;
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..=retry.max_retries {
            match self.send(pending).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(
                            attempt = attempt,
                            count = pending.len(),
                            "Bulk request succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        debug!(error = %e, "Non-retryable error encountered");
                        return Err(e);
                    }

                    // Don't wait after the last attempt
                    if attempt < retry.max_retries {
                        warn!(
                            attempt = attempt + 1,
                            max_retries = retry.max_retries,
                            delay_ms = delay_ms,
                            error = %e,
                            "Bulk request failed, retrying"
                        );

                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = std::cmp::min(delay_ms * 2, retry.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| BackendError::connection("Unknown error after retries")))
    }

    /// Send a request and parse its per-item outcomes.
    async fn submit(&self, pending: &[(usize, BulkAction)]) -> Result<Vec<ItemOutcome>, BackendError> {
        let response = self.send_with_retry(pending).await?;
        actions::parse_items(&response, pending.len())
    }

    /// Write one chunk starting at `offset` in the caller's batch.
    ///
    /// Items rejected with status 429 are resent on their own, up to
    /// `max_retries` times. Returns `Err` only when nothing in the chunk was
    /// processed by the backend.
    async fn write_chunk(&self, offset: usize, chunk: &[Document]) -> Result<BulkWriteSummary, BackendError> {
        let retry = &self.config.retry;
        let mut progress = ChunkProgress::new(
            offset,
            chunk,
            self.config.default_index.as_deref(),
            retry.max_retries,
        );

        let mut delay_ms = retry.initial_retry_delay_ms;
        while !progress.pending.is_empty() {
            let outcomes = match self.submit(&progress.pending).await {
                Ok(outcomes) => outcomes,
                Err(e) if progress.round == 0 => return Err(e),
                Err(e) => {
                    progress.abandon(&e.to_string());
                    break;
                }
            };

            progress.record(outcomes);

            if !progress.pending.is_empty() {
                warn!(
                    count = progress.pending.len(),
                    attempt = progress.round,
                    delay_ms = delay_ms,
                    "Documents rejected with 429, resending"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = std::cmp::min(delay_ms * 2, retry.max_retry_delay_ms);
            }
        }

        Ok(progress.finish())
    }
}

/// Bookkeeping for one chunk across its resend rounds.
///
/// Positions are offsets into the caller's whole batch, not the chunk.
struct ChunkProgress {
    summary: BulkWriteSummary,
    pending: Vec<(usize, BulkAction)>,
    round: u32,
    max_retries: u32,
}

impl ChunkProgress {
    /// Compose every document of the chunk. Documents that cannot be
    /// composed fail immediately and are never sent.
    fn new(offset: usize, chunk: &[Document], default_index: Option<&str>, max_retries: u32) -> Self {
        let mut summary = BulkWriteSummary {
            total: chunk.len(),
            ..BulkWriteSummary::default()
        };

        let mut pending = Vec::with_capacity(chunk.len());
        for (i, document) in chunk.iter().enumerate() {
            let position = offset + i;
            match actions::compose(document, default_index) {
                Ok(action) => pending.push((position, action)),
                Err(reason) => summary.failures.push(BulkItemFailure {
                    position,
                    index: None,
                    id: None,
                    status: None,
                    reason,
                }),
            }
        }

        Self {
            summary,
            pending,
            round: 0,
            max_retries,
        }
    }

    /// Apply the outcomes of one round, in the order the pending actions
    /// were sent. Items rejected with 429 stay pending while rounds remain.
    fn record(&mut self, outcomes: Vec<ItemOutcome>) {
        let resend_allowed = self.round < self.max_retries;
        let mut rejected = Vec::new();

        for ((position, action), outcome) in self.pending.drain(..).zip(outcomes) {
            match outcome {
                ItemOutcome::Written => self.summary.succeeded += 1,
                ItemOutcome::Rejected { status, .. }
                    if status == Some(TOO_MANY_REQUESTS) && resend_allowed =>
                {
                    rejected.push((position, action));
                }
                ItemOutcome::Rejected { status, reason } => {
                    self.summary.failures.push(action.failure(position, status, reason));
                }
            }
        }

        self.pending = rejected;
        self.round += 1;
    }

    /// Fail everything still pending with `reason`.
    fn abandon(&mut self, reason: &str) {
        for (position, action) in self.pending.drain(..) {
            self.summary
                .failures
                .push(action.failure(position, None, reason));
        }
    }

    fn finish(mut self) -> BulkWriteSummary {
        self.summary.failures.sort_by_key(|failure| failure.position);
        self.summary
    }
}

/// Failures for every document of a chunk whose request never reached the
/// backend.
fn chunk_failures(offset: usize, len: usize, reason: &str) -> impl Iterator<Item = BulkItemFailure> + '_ {
    (offset..offset + len).map(move |position| BulkItemFailure {
        position,
        index: None,
        id: None,
        status: None,
        reason: reason.to_string(),
    })
}

#[async_trait]
impl BulkWriter for OpenSearchBulkWriter {
    /// Write documents through the `_bulk` API.
    ///
    /// A transport failure on the first chunk fails the whole call. A
    /// transport failure on a later chunk is recorded as a failure of every
    /// document in that chunk, since earlier chunks were already written.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_write(&self, documents: &[Document]) -> Result<BulkWriteSummary, BackendError> {
        let mut summary = BulkWriteSummary {
            total: documents.len(),
            ..BulkWriteSummary::default()
        };
        if documents.is_empty() {
            return Ok(summary);
        }

        let chunk_size = self.config.chunk_size.unwrap_or(documents.len());
        for (chunk_number, chunk) in documents.chunks(chunk_size).enumerate() {
            let offset = chunk_number * chunk_size;
            match self.write_chunk(offset, chunk).await {
                Ok(chunk_summary) => {
                    summary.succeeded += chunk_summary.succeeded;
                    summary.failures.extend(chunk_summary.failures);
                }
                Err(e) if chunk_number == 0 => return Err(e),
                Err(e) => {
                    error!(
                        offset = offset,
                        count = chunk.len(),
                        error = %e,
                        "Bulk chunk failed after earlier chunks were written"
                    );
                    let reason = e.to_string();
                    summary
                        .failures
                        .extend(chunk_failures(offset, chunk.len(), &reason));
                }
            }
        }

        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed(),
            "Bulk write completed"
        );
        Ok(summary)
    }
}
