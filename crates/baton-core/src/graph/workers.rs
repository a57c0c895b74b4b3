//! Worker adapter: run one capability, wrap its output, return to the router.

use crate::capabilities::{WorkerContext, WorkerOutcome};
use crate::error::WorkflowError;
use crate::models::{Goto, Message, Node, Worker};
use crate::state::{Command, State, StateUpdate};
use crate::tracer::NodeTracer;

use super::Runtime;

/// The fixed wrapper every worker reply travels in.
pub fn envelope(worker: Worker, content: &str) -> String {
    format!(
        "Response from {}:\n\n<response>\n{}\n</response>\n\n*Please execute the next step.*",
        worker, content
    )
}

/// Invoke `worker`'s capability. Always transitions to the supervisor;
/// only cancellation or deadline expiry escape as `Err`.
pub async fn worker_node(
    runtime: &Runtime,
    worker: Worker,
    state: &State,
    tracer: &NodeTracer,
) -> Result<Command, WorkflowError> {
    let ctx = WorkerContext {
        worker,
        state,
        models: &runtime.models,
        prompts: &runtime.prompts,
        tracer,
    };

    let outcome = match runtime.capabilities.get(worker).invoke(&ctx).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_interruption() => return Err(e),
        Err(e) => {
            tracing::warn!("[{}] Capability failed: {}", worker, e);
            WorkerOutcome::text(format!("Error: {}", e))
        }
    };
    if let Some(retries) = outcome.sql_retries {
        tracing::info!("[{}] sql_retries: {}", worker, retries);
    }

    let mut update = StateUpdate::default().message(
        Message::user(envelope(worker, &outcome.content)).with_name(worker.as_str()),
    );
    // Single writer of the side channel.
    if worker == Worker::BiomedicalResearcher {
        update.biomedical_findings = outcome.biomedical_findings;
    }

    tracing::info!("[{}] Completed task", worker);
    Ok(Command::new(update, Goto::Node(Node::Supervisor)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::capabilities::{Capabilities, WorkerCapability};
    use crate::guard::RunGuard;
    use crate::llm::{ModelRegistry, ScriptedModel, ScriptedReply};
    use crate::models::BiomedicalFindings;
    use crate::state::WorkflowOptions;
    use crate::tracer::Tracer;

    struct LeakyCapability;

    #[async_trait]
    impl WorkerCapability for LeakyCapability {
        async fn invoke(&self, _ctx: &WorkerContext<'_>) -> Result<WorkerOutcome, WorkflowError> {
            Ok(WorkerOutcome {
                content: "done".into(),
                biomedical_findings: Some(BiomedicalFindings::from_error("not mine")),
                sql_retries: None,
            })
        }
    }

    fn state() -> State {
        State::new(
            vec![Message::user("question")],
            Worker::ALL.to_vec(),
            WorkflowOptions::default(),
            RunGuard::unbounded(),
        )
    }

    #[test]
    fn test_envelope_format() {
        assert_eq!(
            envelope(Worker::Coder, "42"),
            "Response from coder:\n\n<response>\n42\n</response>\n\n*Please execute the next step.*"
        );
    }

    #[tokio::test]
    async fn test_every_worker_returns_to_supervisor_even_on_failure() {
        let replies: Vec<ScriptedReply> = Worker::ALL
            .iter()
            .map(|_| ScriptedReply::Error {
                error: "backend down".into(),
            })
            .collect();
        let runtime = Runtime::new(ModelRegistry::uniform(Arc::new(ScriptedModel::new(replies))));
        let state = state();
        for worker in Worker::ALL {
            let tracer = Tracer::disabled().for_node(Node::Worker(worker));
            let command = worker_node(&runtime, worker, &state, &tracer).await.unwrap();
            assert_eq!(command.goto, Goto::Node(Node::Supervisor), "{}", worker);
            let message = &command.update.messages[0];
            assert_eq!(message.name.as_deref(), Some(worker.as_str()));
            assert!(message.content.starts_with(&format!("Response from {}:", worker)));
        }
    }

    #[tokio::test]
    async fn test_only_biomedical_writes_side_channel() {
        let capabilities = Capabilities::standard(None, None, 2)
            .with(Worker::Coder, Arc::new(LeakyCapability))
            .with(Worker::BiomedicalResearcher, Arc::new(LeakyCapability));
        let runtime = Runtime::new(ModelRegistry::uniform(Arc::new(ScriptedModel::new(
            Vec::<String>::new(),
        ))))
        .with_capabilities(capabilities);
        let state = state();

        let tracer = Tracer::disabled().for_node(Node::Worker(Worker::Coder));
        let coder = worker_node(&runtime, Worker::Coder, &state, &tracer).await.unwrap();
        assert!(coder.update.biomedical_findings.is_none());

        let tracer = Tracer::disabled().for_node(Node::Worker(Worker::BiomedicalResearcher));
        let bio = worker_node(&runtime, Worker::BiomedicalResearcher, &state, &tracer)
            .await
            .unwrap();
        assert!(bio.update.biomedical_findings.is_some());
    }

    #[tokio::test]
    async fn test_cancellation_escapes() {
        let runtime = Runtime::new(ModelRegistry::uniform(Arc::new(ScriptedModel::new(vec![
            "never",
        ]))));
        let state = state();
        state.guard().cancel();
        let tracer = Tracer::disabled().for_node(Node::Worker(Worker::Coder));
        let err = worker_node(&runtime, Worker::Coder, &state, &tracer)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Cancelled));
    }
}
