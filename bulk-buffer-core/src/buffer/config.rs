use crate::errors::BufferError;

/// Configuration for a bulk buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Number of documents that triggers an automatic flush.
    pub size: usize,
    /// Whether flush errors display the backend's full response.
    pub verbose_errors: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            size: 5000,
            verbose_errors: true,
        }
    }
}

impl BufferConfig {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        if self.size == 0 {
            return Err(BufferError::config("buffer size must be positive"));
        }
        Ok(())
    }
}
