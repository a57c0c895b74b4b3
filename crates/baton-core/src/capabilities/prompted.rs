//! Plain prompted generation, used by the coder, browser and reporter.

use async_trait::async_trait;

use super::{WorkerCapability, WorkerContext, WorkerOutcome};
use crate::error::WorkflowError;
use crate::llm::ChatRequest;

pub struct PromptedCapability;

#[async_trait]
impl WorkerCapability for PromptedCapability {
    async fn invoke(&self, ctx: &WorkerContext<'_>) -> Result<WorkerOutcome, WorkflowError> {
        tracing::info!("[{}] Working", ctx.worker);
        let messages = ctx.prompt_messages()?;
        let content = ctx.generate(ChatRequest::new(messages)).await?;
        tracing::debug!("[{}] Response: {}", ctx.worker, content);
        Ok(WorkerOutcome::text(content))
    }
}
