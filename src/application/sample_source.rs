// Port for fetching reading documents from the monitor's data source
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("unparseable document: {0}")]
    Parse(String),
}

#[async_trait]
pub trait SampleSource: Send + Sync {
    /// The current-sample document, a single JSON object
    async fn fetch_current(&self) -> Result<Value, SourceError>;

    /// The history document, a JSON array ordered oldest first
    async fn fetch_history(&self) -> Result<Value, SourceError>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}
