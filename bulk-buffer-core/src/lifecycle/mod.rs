//! Scoped use of a buffer.
//!
//! A scope flushes the buffer when its body succeeds. When the body fails,
//! the buffered documents are persisted through the dump sink (if one is
//! configured) and discarded, and the body's error is returned.

use std::error::Error as StdError;
use std::fmt;
use std::ops::{Deref, DerefMut};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::buffer::BulkBuffer;
use crate::errors::FlushError;
use bulk_buffer_repository::PersistenceError;

/// Error returned when a buffer scope ends.
#[derive(Debug)]
pub enum ScopeError<E> {
    /// The scope body failed. Buffered documents were discarded, after
    /// being dumped when a sink is configured.
    Body {
        error: E,
        /// Where the buffered documents were dumped.
        dumped_to: Option<String>,
        /// Set when dumping was attempted and failed.
        persistence: Option<PersistenceError>,
    },
    /// The body succeeded but the final flush failed.
    Flush(FlushError),
}

impl<E> ScopeError<E> {
    /// The body's error, if the body failed.
    pub fn into_body(self) -> Option<E> {
        match self {
            Self::Body { error, .. } => Some(error),
            Self::Flush(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ScopeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body { error, .. } => write!(f, "{}", error),
            Self::Flush(e) => write!(f, "Final flush failed: {}", e),
        }
    }
}

impl<E> StdError for ScopeError<E>
where
    E: StdError + 'static,
{
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Body { error, .. } => Some(error),
            Self::Flush(e) => Some(e),
        }
    }
}

/// An entered buffer scope.
///
/// Dereferences to the buffer. Call [`exit`](Self::exit) with the outcome of
/// the work done inside the scope.
pub struct BufferScope<'a> {
    buffer: &'a mut BulkBuffer,
}

impl BulkBuffer {
    /// Enter a scope. Has no side effect on the buffer.
    pub fn enter(&mut self) -> BufferScope<'_> {
        debug!(buffered = self.documents.len(), "Entered buffer scope");
        BufferScope { buffer: self }
    }

    /// Run `body` inside a scope, then flush or dump depending on its result.
    ///
    /// # Example
    ///
    /// ```ignore
    /// buffer
    ///     .scope(|buffer| {
    ///         Box::pin(async move {
    ///             buffer.add(document).await?;
    ///             Ok::<_, BufferError>(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn scope<T, E, F>(&mut self, body: F) -> Result<T, ScopeError<E>>
    where
        F: for<'b> FnOnce(&'b mut BulkBuffer) -> BoxFuture<'b, Result<T, E>>,
    {
        let mut scope = self.enter();
        let result = body(&mut *scope).await;
        scope.exit(result).await
    }
}

impl<'a> BufferScope<'a> {
    /// Leave the scope.
    ///
    /// On `Ok`, flushes the buffer and returns the value. On `Err`, dumps
    /// and discards the buffered documents and returns the error.
    pub async fn exit<T, E>(self, result: Result<T, E>) -> Result<T, ScopeError<E>> {
        match result {
            Ok(value) => {
                self.buffer.flush().await.map_err(ScopeError::Flush)?;
                Ok(value)
            }
            Err(error) => {
                let count = self.buffer.documents.len();
                let dump = if count > 0 {
                    self.buffer.dump_leading(count).await
                } else {
                    None
                };

                let discarded = self.buffer.discard();
                if discarded > 0 {
                    warn!(discarded = discarded, "Buffer scope failed, discarded buffered documents");
                }

                let (dumped_to, persistence) = match dump {
                    Some(Ok(path)) => (Some(path), None),
                    Some(Err(e)) => (None, Some(e)),
                    None => (None, None),
                };
                Err(ScopeError::Body {
                    error,
                    dumped_to,
                    persistence,
                })
            }
        }
    }
}

impl Deref for BufferScope<'_> {
    type Target = BulkBuffer;

    fn deref(&self) -> &BulkBuffer {
        self.buffer
    }
}

impl DerefMut for BufferScope<'_> {
    fn deref_mut(&mut self) -> &mut BulkBuffer {
        self.buffer
    }
}
