//! Front-door triage: answer directly or hand off to the planner.

use crate::error::WorkflowError;
use crate::llm::ChatRequest;
use crate::models::{Goto, Message, Node};
use crate::state::{Command, State, StateUpdate};
use crate::tracer::NodeTracer;

use super::Runtime;

/// Literal the coordinator emits to pass the request to the planner.
pub const HANDOFF_MARKER: &str = "handoff_to_planner";

pub async fn coordinator_node(
    runtime: &Runtime,
    state: &State,
    tracer: &NodeTracer,
) -> Result<Command, WorkflowError> {
    tracing::info!("[Coordinator] Talking");
    let messages = runtime.prompts.apply(Node::Coordinator.as_str(), state)?;
    let model = runtime
        .models
        .for_node(Node::Coordinator, state.options().deep_thinking_mode);
    let response = tracer
        .generate(model.as_ref(), ChatRequest::new(messages), state.guard())
        .await?;
    tracing::debug!("[Coordinator] Response: {}", response);

    if response.contains(HANDOFF_MARKER) {
        tracing::info!("[Coordinator] Handing off to planner");
        let goto = Goto::Node(Node::Planner);
        return Ok(Command::new(StateUpdate::default().next(goto), goto));
    }

    Ok(
        Command::new(StateUpdate::default().next(Goto::End), Goto::End)
            .with_reply(Message::assistant(response).with_name(Node::Coordinator.as_str())),
    )
}
