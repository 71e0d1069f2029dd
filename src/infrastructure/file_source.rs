// File sample source - Reads the documents a producer writes to local disk
use crate::application::sample_source::{SampleSource, SourceError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileSampleSource {
    current_path: PathBuf,
    history_path: PathBuf,
}

impl FileSampleSource {
    pub fn new(current_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            current_path: current_path.into(),
            history_path: history_path.into(),
        }
    }

    async fn read_json(path: &Path) -> Result<Value, SourceError> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| SourceError::Fetch(format!("{}: {}", path.display(), e)))?;
        serde_json::from_slice(&contents)
            .map_err(|e| SourceError::Parse(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SampleSource for FileSampleSource {
    async fn fetch_current(&self) -> Result<Value, SourceError> {
        Self::read_json(&self.current_path).await
    }

    async fn fetch_history(&self) -> Result<Value, SourceError> {
        Self::read_json(&self.history_path).await
    }

    fn describe(&self) -> String {
        self.current_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_documents_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("data.json");
        let history = dir.path().join("history.json");
        std::fs::write(&current, r#"{ "ph": 7.1, "timestamp": "2024-05-01T10:00:00" }"#).unwrap();
        std::fs::write(&history, r#"[{ "ph": 7.0 }]"#).unwrap();

        let source = FileSampleSource::new(&current, &history);
        assert_eq!(source.fetch_current().await.unwrap()["ph"], 7.1);
        assert!(source.fetch_history().await.unwrap().is_array());
    }

    #[tokio::test]
    async fn test_missing_and_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("data.json");
        std::fs::write(&current, r#"{ "ph": 7."#).unwrap();

        let source = FileSampleSource::new(&current, dir.path().join("absent.json"));
        assert!(matches!(source.fetch_current().await, Err(SourceError::Parse(_))));
        assert!(matches!(source.fetch_history().await, Err(SourceError::Fetch(_))));
    }
}
