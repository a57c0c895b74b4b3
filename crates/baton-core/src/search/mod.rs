//! Web search used by the planner and the researcher.

pub mod tavily;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

pub use tavily::TavilySearch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, WorkflowError>;
}

/// Serialise results for inclusion in a prompt.
pub fn results_to_prompt(results: &[SearchResult]) -> String {
    let compact: Vec<serde_json::Value> = results
        .iter()
        .map(|r| serde_json::json!({ "title": r.title, "url": r.url, "content": r.content }))
        .collect();
    serde_json::to_string_pretty(&compact).unwrap_or_else(|_| "[]".to_string())
}
