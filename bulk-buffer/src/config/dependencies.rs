//! Dependency initialization and wiring for the loader.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::LoadError;
use bulk_buffer_core::{BufferConfig, BulkBuffer, BulkBufferBuilder, BulkWriter};
use bulk_buffer_repository::{ClientConfig, FileDumpSink};
use bulk_buffer_shared::{Document, ID_FIELD};

/// Settings taken from the command line.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Buffer size that triggers a bulk write.
    pub size: usize,
    /// Default index, overriding `OPENSEARCH_INDEX`.
    pub index: Option<String>,
    /// Field copied into `_id` for every document.
    pub id_field: Option<String>,
    /// Directory for dump files written when a load fails.
    pub dump_dir: Option<PathBuf>,
    /// Whether flush errors include the backend's full response.
    pub verbose_errors: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        let buffer = BufferConfig::default();
        Self {
            size: buffer.size,
            index: None,
            id_field: None,
            dump_dir: None,
            verbose_errors: buffer.verbose_errors,
        }
    }
}

impl LoadSettings {
    fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            size: self.size,
            verbose_errors: self.verbose_errors,
        }
    }

    /// Apply metadata and dump settings to a buffer builder.
    fn configure(&self, mut builder: BulkBufferBuilder) -> BulkBufferBuilder {
        if let Some(field) = self.id_field.clone() {
            builder = builder.metadata_fn(ID_FIELD, move |document: &Document| {
                document
                    .get(&field)
                    .cloned()
                    .ok_or_else(|| format!("document has no `{}` field", field).into())
            });
        }
        if let Some(dir) = &self.dump_dir {
            builder = builder.dump_to(Arc::new(FileDumpSink::new(dir)));
        }
        builder
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The buffer documents are loaded through.
    pub buffer: BulkBuffer,
}

impl Dependencies {
    /// Initialize dependencies from environment variables and CLI settings.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: basic auth credentials
    /// - `OPENSEARCH_INDEX`: default index (overridden by `--index`)
    /// - `BULK_CHUNK_SIZE`: documents per bulk request (default: the buffer size)
    /// - `BULK_MAX_RETRIES`: retry attempts for transient failures (default: 3)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(LoadError)` - If initialization fails
    pub fn new(settings: &LoadSettings) -> Result<Self, LoadError> {
        let mut client = ClientConfig::from_env()?;
        if let Some(index) = &settings.index {
            client.default_index = Some(index.clone());
        }

        info!(
            opensearch_url = %client.url,
            default_index = ?client.default_index,
            size = settings.size,
            dump_dir = ?settings.dump_dir,
            "Initializing dependencies"
        );

        let builder = BulkBuffer::connect(client, settings.buffer_config())?;
        let buffer = settings.configure(builder).build()?;

        Ok(Self { buffer })
    }

    /// Build dependencies around an existing writer.
    pub fn with_writer(settings: &LoadSettings, writer: Arc<dyn BulkWriter>) -> Result<Self, LoadError> {
        let builder = BulkBuffer::builder(writer).config(settings.buffer_config());
        let buffer = settings.configure(builder).build()?;
        Ok(Self { buffer })
    }
}
