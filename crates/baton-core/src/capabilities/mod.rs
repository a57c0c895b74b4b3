//! Worker capabilities and the exhaustive dispatch table over [`Worker`].

pub mod biomedical;
pub mod data_team;
pub mod prompted;
pub mod research;

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::SqlDatabase;
use crate::error::WorkflowError;
use crate::graph::validate_plan;
use crate::guard::RunGuard;
use crate::llm::{ChatModel, ChatRequest, ModelRegistry};
use crate::models::{BiomedicalFindings, Message, Node, PlanStep, Worker};
use crate::prompts::PromptLibrary;
use crate::search::SearchProvider;
use crate::state::State;
use crate::tracer::NodeTracer;

pub use biomedical::BiomedicalResearch;
pub use data_team::DataTeam;
pub use prompted::PromptedCapability;
pub use research::WebResearch;

/// What a capability hands back to the worker adapter.
#[derive(Debug, Clone, Default)]
pub struct WorkerOutcome {
    pub content: String,
    /// Side-channel payload; only kept for the biomedical researcher.
    pub biomedical_findings: Option<BiomedicalFindings>,
    pub sql_retries: Option<u32>,
}

impl WorkerOutcome {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Read-only view a capability gets of the run.
pub struct WorkerContext<'a> {
    pub worker: Worker,
    pub state: &'a State,
    pub models: &'a ModelRegistry,
    pub prompts: &'a PromptLibrary,
    pub tracer: &'a NodeTracer,
}

impl<'a> WorkerContext<'a> {
    pub fn guard(&self) -> &RunGuard {
        self.state.guard()
    }

    pub fn model(&self) -> Arc<dyn ChatModel> {
        self.models.for_node(
            Node::Worker(self.worker),
            self.state.options().deep_thinking_mode,
        )
    }

    pub async fn generate(&self, request: ChatRequest) -> Result<String, WorkflowError> {
        let model = self.model();
        self.tracer.generate(model.as_ref(), request, self.guard()).await
    }

    /// The plan step this invocation is working on: the n-th step assigned to
    /// this worker, where n counts its earlier responses.
    pub fn current_step(&self) -> Option<PlanStep> {
        let plan = validate_plan(self.state.full_plan()?).outcome.ok()?;
        let done = self
            .state
            .messages()
            .iter()
            .filter(|m| m.name.as_deref() == Some(self.worker.as_str()))
            .count();
        let step = plan.steps_for(self.worker.as_str()).nth(done).cloned();
        step
    }

    /// Role prompt plus history, ending with the current step if known.
    pub fn prompt_messages(&self) -> Result<Vec<Message>, WorkflowError> {
        let mut messages = self.prompts.apply(self.worker.as_str(), self.state)?;
        if let Some(step) = self.current_step() {
            let mut text = format!("# Current Step\n\n## {}\n\n{}", step.title, step.description);
            if let Some(note) = &step.note {
                text.push_str(&format!("\n\nNote: {}", note));
            }
            messages.push(Message::user(text));
        }
        Ok(messages)
    }
}

#[async_trait]
pub trait WorkerCapability: Send + Sync {
    async fn invoke(&self, ctx: &WorkerContext<'_>) -> Result<WorkerOutcome, WorkflowError>;
}

/// One capability per worker.
#[derive(Clone)]
pub struct Capabilities {
    researcher: Arc<dyn WorkerCapability>,
    coder: Arc<dyn WorkerCapability>,
    browser: Arc<dyn WorkerCapability>,
    data_analyst: Arc<dyn WorkerCapability>,
    biomedical_researcher: Arc<dyn WorkerCapability>,
    reporter: Arc<dyn WorkerCapability>,
}

impl Capabilities {
    pub fn standard(
        search: Option<Arc<dyn SearchProvider>>,
        database: Option<Arc<dyn SqlDatabase>>,
        max_sql_retries: u32,
    ) -> Self {
        Self {
            researcher: Arc::new(WebResearch::new(search.clone())),
            coder: Arc::new(PromptedCapability),
            browser: Arc::new(PromptedCapability),
            data_analyst: Arc::new(DataTeam::new(database, max_sql_retries)),
            biomedical_researcher: Arc::new(BiomedicalResearch::new(search)),
            reporter: Arc::new(PromptedCapability),
        }
    }

    pub fn get(&self, worker: Worker) -> &dyn WorkerCapability {
        match worker {
            Worker::Researcher => self.researcher.as_ref(),
            Worker::Coder => self.coder.as_ref(),
            Worker::Browser => self.browser.as_ref(),
            Worker::DataAnalyst => self.data_analyst.as_ref(),
            Worker::BiomedicalResearcher => self.biomedical_researcher.as_ref(),
            Worker::Reporter => self.reporter.as_ref(),
        }
    }

    /// Replace one worker's capability.
    pub fn with(mut self, worker: Worker, capability: Arc<dyn WorkerCapability>) -> Self {
        let slot = match worker {
            Worker::Researcher => &mut self.researcher,
            Worker::Coder => &mut self.coder,
            Worker::Browser => &mut self.browser,
            Worker::DataAnalyst => &mut self.data_analyst,
            Worker::BiomedicalResearcher => &mut self.biomedical_researcher,
            Worker::Reporter => &mut self.reporter,
        };
        *slot = capability;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::state::{StateUpdate, WorkflowOptions};
    use crate::tracer::Tracer;

    const PLAN: &str = r#"{"thought":"t","title":"x","steps":[
        {"agent_name":"coder","title":"First","description":"compute a"},
        {"agent_name":"reporter","title":"Report","description":"write"},
        {"agent_name":"coder","title":"Second","description":"compute b","note":"use numpy"}]}"#;

    #[test]
    fn test_current_step_tracks_prior_responses() {
        let mut state = State::new(
            vec![Message::user("q")],
            Worker::ALL.to_vec(),
            WorkflowOptions::default(),
            RunGuard::unbounded(),
        );
        state.apply(StateUpdate::default().full_plan(PLAN));
        let models = ModelRegistry::uniform(Arc::new(ScriptedModel::new(Vec::<String>::new())));
        let prompts = PromptLibrary::builtin();
        let tracer = Tracer::disabled().for_node(Node::Worker(Worker::Coder));

        let step = WorkerContext {
            worker: Worker::Coder,
            state: &state,
            models: &models,
            prompts: &prompts,
            tracer: &tracer,
        }
        .current_step()
        .unwrap();
        assert_eq!(step.title, "First");

        state.apply(StateUpdate::default().message(Message::user("done a").with_name("coder")));
        let ctx = WorkerContext {
            worker: Worker::Coder,
            state: &state,
            models: &models,
            prompts: &prompts,
            tracer: &tracer,
        };
        assert_eq!(ctx.current_step().unwrap().title, "Second");
        let messages = ctx.prompt_messages().unwrap();
        assert!(messages.last().unwrap().content.contains("use numpy"));
    }
}
