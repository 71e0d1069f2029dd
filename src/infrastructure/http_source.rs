// HTTP sample source - Fetches the JSON documents with per-request cache busting
use crate::application::sample_source::{SampleSource, SourceError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSampleSource {
    client: reqwest::Client,
    current_url: String,
    history_url: String,
}

impl HttpSampleSource {
    pub fn new(current_url: String, history_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            current_url,
            history_url,
        })
    }

    /// Append a `ts` query parameter so intermediaries never serve a cached copy
    fn cache_busted(url: &str, millis: i64) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}ts={}", url, separator, millis)
    }

    async fn get_json(&self, url: &str) -> Result<Value, SourceError> {
        let url = Self::cache_busted(url, Utc::now().timestamp_millis());

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Fetch(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SampleSource for HttpSampleSource {
    async fn fetch_current(&self) -> Result<Value, SourceError> {
        self.get_json(&self.current_url).await
    }

    async fn fetch_history(&self) -> Result<Value, SourceError> {
        self.get_json(&self.history_url).await
    }

    fn describe(&self) -> String {
        self.current_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_busted_url() {
        assert_eq!(
            HttpSampleSource::cache_busted("http://monitor/data/data.json", 1714550400000),
            "http://monitor/data/data.json?ts=1714550400000"
        );
        assert_eq!(
            HttpSampleSource::cache_busted("http://monitor/data.json?site=reef", 5),
            "http://monitor/data.json?site=reef&ts=5"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_fetch_failure() {
        let source = HttpSampleSource::new(
            "http://127.0.0.1:9/data.json".to_string(),
            "http://127.0.0.1:9/history.json".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();

        let result = source.fetch_current().await;
        assert!(matches!(result, Err(SourceError::Fetch(_))));
    }
}
