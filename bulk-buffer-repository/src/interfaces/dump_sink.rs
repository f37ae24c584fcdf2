//! Dump sink trait definition.

use async_trait::async_trait;

use crate::errors::PersistenceError;

/// A durable target for buffer contents that could not be flushed.
#[async_trait]
pub trait DumpSink: Send + Sync {
    /// Durably write `lines`, one per line, in order.
    ///
    /// `destination_hint` is a short name the sink may use when naming the
    /// destination. Returns an identifier for what was written (a file path for
    /// file-backed sinks).
    async fn write_lines(
        &self,
        lines: &[String],
        destination_hint: &str,
    ) -> Result<String, PersistenceError>;
}
