//! Tavily search API client.

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchProvider, SearchResult};
use crate::config::SearchSettings;
use crate::error::WorkflowError;

const TAVILY_URL: &str = "https://api.tavily.com/search";

pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

impl TavilySearch {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: settings.api_key.clone(),
            max_results: settings.max_results,
            endpoint: TAVILY_URL.to_string(),
        }
    }

    /// Point at a different endpoint (self-hosted proxy, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn body(&self, query: &str) -> serde_json::Value {
        serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": self.max_results,
            "search_depth": "advanced",
        })
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, WorkflowError> {
        if self.api_key.is_empty() {
            return Err(WorkflowError::Tool(
                "Search is not configured: set TAVILY_API_KEY".to_string(),
            ));
        }
        tracing::info!("[TavilySearch] Searching: {}", query);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.body(query))
            .send()
            .await
            .map_err(|e| WorkflowError::Tool(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Tool(format!(
                "Search API returned {}: {}",
                status, text
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Tool(format!("Failed to parse search response: {}", e)))?;
        let mut results = parsed.results;
        results.truncate(self.max_results);
        Ok(results)
    }
}
