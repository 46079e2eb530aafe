use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::UploadConfig;

pub const MAX_QUERY_LENGTH: usize = 200;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query must be between 1 and 200 characters")]
    InvalidQuery,

    #[error("Search is not configured")]
    NotConfigured,

    #[error("Search provider request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Search provider responded with status {0}")]
    UpstreamStatus(u16),
}

/// Forwards text queries to the configured third-party search API.
#[derive(Clone)]
pub struct SearchService {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl SearchService {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint,
            api_key,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.search_api_url.clone(), config.search_api_key.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn normalize_query(query: &str) -> Result<&str, SearchError> {
        let trimmed = query.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > MAX_QUERY_LENGTH {
            return Err(SearchError::InvalidQuery);
        }
        Ok(trimmed)
    }

    /// Returns the provider's JSON body as-is.
    pub async fn search(&self, query: &str) -> Result<Value, SearchError> {
        let query = Self::normalize_query(query)?;
        let endpoint = self.endpoint.as_deref().ok_or(SearchError::NotConfigured)?;

        let mut request = self.client.get(endpoint).query(&[("q", query)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Search provider returned {}", status);
            return Err(SearchError::UpstreamStatus(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}
