//! File-backed dump sink.
//!
//! Writes buffer contents as newline-delimited JSON under a directory, one
//! uniquely named file per dump.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::errors::PersistenceError;
use crate::interfaces::DumpSink;

/// Dump sink writing one `.ndjson` file per call.
///
/// File names have the form `<hint>_<unix millis>_<uuid>.ndjson`, so two
/// dumps with the same hint never overwrite each other.
#[derive(Debug, Clone)]
pub struct FileDumpSink {
    directory: PathBuf,
}

impl FileDumpSink {
    /// Create a sink writing under `directory`. The directory is created on first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Sink writing to the current working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, destination_hint: &str) -> PathBuf {
        let file_name = format!(
            "{}_{}_{}.ndjson",
            destination_hint,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        self.directory.join(file_name)
    }
}

#[async_trait]
impl DumpSink for FileDumpSink {
    async fn write_lines(
        &self,
        lines: &[String],
        destination_hint: &str,
    ) -> Result<String, PersistenceError> {
        let path = self.file_path(destination_hint);
        let path_str = path.display().to_string();

        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| PersistenceError::io(self.directory.display().to_string(), e))?;

        let mut file = File::create(&path)
            .await
            .map_err(|e| PersistenceError::io(&path_str, e))?;

        let mut contents = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }

        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| PersistenceError::io(&path_str, e))?;
        file.sync_all()
            .await
            .map_err(|e| PersistenceError::io(&path_str, e))?;

        info!(path = %path_str, lines = lines.len(), "Wrote buffer dump");
        Ok(path_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_lines_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDumpSink::new(dir.path());

        let lines = vec![r#"{"a":1}"#.to_string(), r#"{"a":2}"#.to_string()];
        let path = sink.write_lines(&lines, "buffer_dump").await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"a\":2}\n");
        assert!(Path::new(&path)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("buffer_dump_"));
    }

    #[tokio::test]
    async fn test_write_lines_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDumpSink::new(dir.path());
        let lines = vec!["{}".to_string()];

        let first = sink.write_lines(&lines, "dump").await.unwrap();
        let second = sink.write_lines(&lines, "dump").await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_write_lines_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDumpSink::new(dir.path().join("nested").join("dumps"));

        let path = sink.write_lines(&["{}".to_string()], "dump").await.unwrap();

        assert!(Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_write_lines_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let sink = FileDumpSink::new(&blocker);

        let result = sink.write_lines(&["{}".to_string()], "dump").await;

        assert!(matches!(result, Err(PersistenceError::Io { .. })));
    }
}
