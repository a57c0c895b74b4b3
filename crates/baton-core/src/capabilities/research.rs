//! Researcher: search, then synthesise from the results.

use std::sync::Arc;

use async_trait::async_trait;

use super::{WorkerCapability, WorkerContext, WorkerOutcome};
use crate::error::WorkflowError;
use crate::llm::ChatRequest;
use crate::models::Message;
use crate::search::{results_to_prompt, SearchProvider};

pub struct WebResearch {
    search: Option<Arc<dyn SearchProvider>>,
}

impl WebResearch {
    pub fn new(search: Option<Arc<dyn SearchProvider>>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl WorkerCapability for WebResearch {
    async fn invoke(&self, ctx: &WorkerContext<'_>) -> Result<WorkerOutcome, WorkflowError> {
        let search = self.search.as_ref().ok_or_else(|| {
            WorkflowError::Tool("Web search is not configured for the researcher".to_string())
        })?;
        let query = match ctx.current_step() {
            Some(step) => format!("{} {}", step.title, step.description),
            None => ctx.state.user_query().to_string(),
        };
        tracing::info!("[Researcher] Searching for: {}", query);

        let results = ctx
            .tracer
            .tool("tavily_search", &query, ctx.guard(), search.search(&query))
            .await?;

        let mut messages = ctx.prompt_messages()?;
        messages.push(Message::user(format!(
            "# Search Results\n\n{}",
            results_to_prompt(&results)
        )));
        let content = ctx.generate(ChatRequest::new(messages)).await?;
        Ok(WorkerOutcome::text(content))
    }
}
