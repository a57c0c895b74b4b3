//! Biomedical researcher: structured findings for the reporter.

use std::sync::Arc;

use async_trait::async_trait;

use super::{WorkerCapability, WorkerContext, WorkerOutcome};
use crate::error::WorkflowError;
use crate::graph::validator::json_candidate;
use crate::llm::ChatRequest;
use crate::models::{BiomedicalFindings, Message};
use crate::search::{results_to_prompt, SearchProvider};

pub struct BiomedicalResearch {
    search: Option<Arc<dyn SearchProvider>>,
}

impl BiomedicalResearch {
    pub fn new(search: Option<Arc<dyn SearchProvider>>) -> Self {
        Self { search }
    }

    async fn findings(&self, ctx: &WorkerContext<'_>) -> Result<BiomedicalFindings, WorkflowError> {
        let mut messages = ctx.prompt_messages()?;

        if let Some(search) = &self.search {
            let query = match ctx.current_step() {
                Some(step) => step.description,
                None => ctx.state.user_query().to_string(),
            };
            match ctx
                .tracer
                .tool("literature_search", &query, ctx.guard(), search.search(&query))
                .await
            {
                Ok(results) => messages.push(Message::user(format!(
                    "# Literature Search Results\n\n{}",
                    results_to_prompt(&results)
                ))),
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => tracing::warn!("[BiomedicalResearcher] Literature search failed: {}", e),
            }
        }

        let raw = ctx.generate(ChatRequest::new(messages).json()).await?;
        parse_findings(&raw)
    }
}

pub fn parse_findings(raw: &str) -> Result<BiomedicalFindings, WorkflowError> {
    serde_json::from_str::<BiomedicalFindings>(json_candidate(raw))
        .map(BiomedicalFindings::normalized)
        .map_err(|e| WorkflowError::MalformedOutput(format!("Invalid findings JSON: {}", e)))
}

#[async_trait]
impl WorkerCapability for BiomedicalResearch {
    async fn invoke(&self, ctx: &WorkerContext<'_>) -> Result<WorkerOutcome, WorkflowError> {
        tracing::info!("[BiomedicalResearcher] Researching");
        let findings = match self.findings(ctx).await {
            Ok(findings) => findings,
            Err(e) if e.is_interruption() => return Err(e),
            Err(e) => {
                tracing::warn!("[BiomedicalResearcher] {}", e);
                BiomedicalFindings::from_error(e)
            }
        };
        tracing::info!(
            "[BiomedicalResearcher] {} findings, confidence {:.2}",
            findings.key_findings.len(),
            findings.confidence_level
        );
        Ok(WorkerOutcome {
            content: format!("Biomedical Research Summary: {}", findings.summary),
            biomedical_findings: Some(findings),
            sql_retries: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_findings() {
        let findings = parse_findings(
            "```json\n{\"summary\":\"Metformin lowers HbA1c\",\"key_findings\":[\"-1.1%\"],\"sources\":[{\"title\":\"Trial\",\"url\":\"https://pubmed.ncbi.nlm.nih.gov/1\"}],\"recommendations\":[],\"confidence_level\":0.9}\n```",
        )
        .unwrap();
        assert_eq!(findings.summary, "Metformin lowers HbA1c");
        assert_eq!(findings.sources[0].title, "Trial");
    }

    #[test]
    fn test_parse_failure_is_malformed_output() {
        assert!(matches!(
            parse_findings("not json"),
            Err(WorkflowError::MalformedOutput(_))
        ));
    }
}
