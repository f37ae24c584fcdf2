use std::io;

use thiserror::Error;

/// Failure to durably write buffer contents through a `DumpSink`.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write dump file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize document for dump: {0}")]
    Serialization(String),
}

impl PersistenceError {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
