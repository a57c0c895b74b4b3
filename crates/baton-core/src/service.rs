//! Entry point: run one workflow and stream its events.

use std::pin::Pin;
use std::sync::Arc;

use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::config::BatonConfig;
use crate::error::WorkflowError;
use crate::events::{EventTranslator, WorkflowEvent};
use crate::graph::{run_workflow, RunOutcome, Runtime};
use crate::guard::RunGuard;
use crate::models::{Message, Worker};
use crate::state::{State, WorkflowOptions};
use crate::tracer::Tracer;

pub type EventStream = Pin<Box<dyn Stream<Item = WorkflowEvent> + Send>>;

/// Shared across runs; every run gets its own state, guard and translator.
#[derive(Clone)]
pub struct WorkflowService {
    runtime: Arc<Runtime>,
    team_members: Vec<Worker>,
}

impl WorkflowService {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime: Arc::new(runtime),
            team_members: Worker::ALL.to_vec(),
        }
    }

    pub fn from_config(config: &BatonConfig) -> Result<Self, WorkflowError> {
        Ok(Self::new(Runtime::from_config(config)?))
    }

    /// Restrict the roster for every run started by this service.
    pub fn with_team(mut self, team_members: Vec<Worker>) -> Self {
        self.team_members = team_members;
        self
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn team_members(&self) -> &[Worker] {
        &self.team_members
    }

    fn validate_input(messages: &[Message]) -> Result<(), WorkflowError> {
        if messages.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "Input messages are empty".to_string(),
            ));
        }
        Ok(())
    }

    fn new_state(&self, messages: Vec<Message>, options: WorkflowOptions, token: CancellationToken) -> State {
        let guard = RunGuard::new(token, self.runtime.settings.deadline());
        State::new(messages, self.team_members.clone(), options, guard)
    }

    /// Start a run and return its event stream. The stream always ends with
    /// exactly one `end_of_workflow`; dropping it cancels the run.
    pub fn run_agent_workflow(
        &self,
        messages: Vec<Message>,
        options: WorkflowOptions,
    ) -> Result<EventStream, WorkflowError> {
        Self::validate_input(&messages)?;

        let workflow_id = uuid::Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        let state = self.new_state(messages.clone(), options, token.clone());
        let (tracer, mut trace_rx) = Tracer::channel();
        let runtime = self.runtime.clone();

        tracing::info!(
            "[Workflow] Starting {} (deep_thinking: {}, search_before_planning: {})",
            workflow_id,
            options.deep_thinking_mode,
            options.search_before_planning
        );
        let handle = tokio::spawn(async move { run_workflow(&runtime, state, &tracer).await });

        let mut translator = EventTranslator::new(workflow_id, self.team_members.clone(), messages);
        let stream = async_stream::stream! {
            let _cancel_on_drop = token.drop_guard();
            while let Some(event) = trace_rx.recv().await {
                for out in translator.translate(event) {
                    yield out;
                }
            }
            let outcome = match handle.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!("[Workflow] {} task failed: {}", translator.workflow_id(), e);
                    None
                }
            };
            yield translator.finish(outcome.as_ref());
        };
        Ok(Box::pin(stream))
    }

    /// Run to completion without translating the trace.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        options: WorkflowOptions,
    ) -> Result<RunOutcome, WorkflowError> {
        Self::validate_input(&messages)?;
        let state = self.new_state(messages, options, CancellationToken::new());
        Ok(run_workflow(&self.runtime, state, &Tracer::disabled()).await)
    }
}

/// Convenience wrapper over [`WorkflowService::run_agent_workflow`].
pub fn run_agent_workflow(
    service: &WorkflowService,
    messages: Vec<Message>,
    options: WorkflowOptions,
) -> Result<EventStream, WorkflowError> {
    service.run_agent_workflow(messages, options)
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;
    use crate::llm::{ModelRegistry, ScriptedModel};

    fn service(replies: Vec<&str>) -> WorkflowService {
        WorkflowService::new(Runtime::new(ModelRegistry::uniform(Arc::new(
            ScriptedModel::new(replies),
        ))))
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = service(vec![]).run_agent_workflow(Vec::new(), WorkflowOptions::default());
        assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_direct_answer_stream() {
        let stream = service(vec!["Hello!"])
            .run_agent_workflow(vec![Message::user("hi")], WorkflowOptions::default())
            .unwrap();
        let events: Vec<WorkflowEvent> = stream.collect().await;
        let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "start_of_agent",
                "start_of_llm",
                "message",
                "end_of_llm",
                "end_of_agent",
                "end_of_workflow"
            ]
        );
        let data = events.last().unwrap().data();
        assert_eq!(data["messages"][1]["content"], "Hello!");
    }

    #[tokio::test]
    async fn test_run_without_stream() {
        let outcome = service(vec!["Hello!"])
            .run(vec![Message::user("hi")], WorkflowOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.steps, 1);
    }
}
