//! Metadata injector.
//!
//! Computes extra fields (typically `_index`, `_id` or `_routing`) from each
//! normalized document and writes them into it before admission.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::{BufferError, MetadataFnError};
use bulk_buffer_shared::Document;

/// A function computing one metadata field from a document.
pub type MetadataFn = Arc<dyn Fn(&Document) -> Result<Value, MetadataFnError> + Send + Sync>;

/// A fixed set of named metadata functions.
///
/// Every function sees the document as it was before any metadata was
/// written, so functions cannot observe each other's results. Results then
/// overwrite fields of the same name.
#[derive(Clone, Default)]
pub struct MetadataInjector {
    functions: Vec<(String, MetadataFn)>,
}

impl MetadataInjector {
    /// Create an injector with no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function for `field`.
    ///
    /// # Returns
    ///
    /// * `Err(BufferError::ConfigError)` - If `field` is empty or already registered
    pub fn register<F>(&mut self, field: impl Into<String>, function: F) -> Result<(), BufferError>
    where
        F: Fn(&Document) -> Result<Value, MetadataFnError> + Send + Sync + 'static,
    {
        let field = field.into();
        if field.is_empty() {
            return Err(BufferError::config("metadata field name must not be empty"));
        }
        if self.functions.iter().any(|(existing, _)| *existing == field) {
            return Err(BufferError::config(format!(
                "metadata field `{}` registered more than once",
                field
            )));
        }
        self.functions.push((field, Arc::new(function)));
        Ok(())
    }

    /// Names of the fields this injector writes, in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(field, _)| field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Compute and write every metadata field of one document.
    pub fn annotate(&self, document: &mut Document) -> Result<(), BufferError> {
        if self.functions.is_empty() {
            return Ok(());
        }

        let mut computed = Vec::with_capacity(self.functions.len());
        for (field, function) in &self.functions {
            let value = function(document)
                .map_err(|source| BufferError::metadata_function(field.as_str(), source))?;
            if value.is_object() {
                return Err(BufferError::invalid_input(format!(
                    "metadata function for field `{}` returned an object; metadata values must not be nested",
                    field
                )));
            }
            computed.push((field, value));
        }

        for (field, value) in computed {
            document.insert(field.clone(), value);
        }
        Ok(())
    }

    /// Annotate a batch, failing on the first error.
    ///
    /// Documents are modified in place; on error the caller should discard
    /// the whole batch.
    #[instrument(skip(self, documents), fields(count = documents.len(), functions = self.functions.len()))]
    pub fn annotate_all(&self, documents: &mut [Document]) -> Result<(), BufferError> {
        for document in documents.iter_mut() {
            self.annotate(document)?;
        }
        if !self.functions.is_empty() {
            debug!("Injected metadata fields");
        }
        Ok(())
    }
}

impl fmt::Debug for MetadataInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataInjector")
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}
