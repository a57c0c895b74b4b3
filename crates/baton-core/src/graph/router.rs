//! Supervisor: picks the next worker or finishes the run.

use serde::Deserialize;

use crate::error::WorkflowError;
use crate::llm::ChatRequest;
use crate::models::{Goto, Message, Node, Worker, FINISH};
use crate::prompts::SUPERVISOR_DEEP;
use crate::state::{Command, State, StateUpdate};
use crate::tracer::NodeTracer;

use super::validator::json_candidate;
use super::Runtime;

/// Structured routing reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouterDecision {
    pub next: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteRejection {
    #[error("routing reply is not a valid decision object: {0}")]
    Unparseable(String),

    #[error("'{0}' is not a team member or FINISH")]
    NotAllowed(String),
}

/// Parse and check a routing reply against the allowed set.
pub fn parse_decision(
    raw: &str,
    team_members: &[Worker],
) -> Result<(Goto, RouterDecision), RouteRejection> {
    let decision: RouterDecision = serde_json::from_str(json_candidate(raw))
        .map_err(|e| RouteRejection::Unparseable(e.to_string()))?;
    let next = decision.next.trim();
    if next == FINISH {
        return Ok((Goto::End, decision));
    }
    match Worker::from_name(next) {
        Some(worker) if team_members.contains(&worker) => {
            Ok((Goto::Node(Node::Worker(worker)), decision))
        }
        _ => Err(RouteRejection::NotAllowed(decision.next.clone())),
    }
}

fn corrective_prompt(rejection: &RouteRejection, team_members: &[Worker]) -> String {
    let allowed: Vec<&str> = team_members
        .iter()
        .map(|w| w.as_str())
        .chain(std::iter::once(FINISH))
        .collect();
    format!(
        "Your previous reply was rejected: {}. Reply again with only a JSON object whose \"next\" is one of: {}.",
        rejection,
        allowed.join(", ")
    )
}

pub async fn supervisor_node(
    runtime: &Runtime,
    state: &State,
    tracer: &NodeTracer,
) -> Result<Command, WorkflowError> {
    let deep = state.options().deep_thinking_mode;
    let role = if deep {
        SUPERVISOR_DEEP
    } else {
        Node::Supervisor.as_str()
    };
    let mut messages = runtime.prompts.apply(role, state)?;
    let model = runtime.models.for_node(Node::Supervisor, deep);

    let raw = tracer
        .generate(model.as_ref(), ChatRequest::new(messages.clone()).json(), state.guard())
        .await?;
    let parsed = match parse_decision(&raw, state.team_members()) {
        Ok(parsed) => parsed,
        Err(rejection) => {
            tracing::warn!("[Router] {}; re-prompting once", rejection);
            messages.push(Message::assistant(raw));
            messages.push(Message::user(corrective_prompt(&rejection, state.team_members())));
            let retry = tracer
                .generate(model.as_ref(), ChatRequest::new(messages).json(), state.guard())
                .await?;
            parse_decision(&retry, state.team_members()).map_err(|rejection| {
                tracing::error!("[Router] Second routing violation: {}", rejection);
                WorkflowError::MalformedOutput(format!("Supervisor {}", rejection))
            })?
        }
    };

    let (goto, decision) = parsed;
    if let Some(reasoning) = &decision.reasoning {
        tracing::debug!("[Router] Reasoning: {}", reasoning);
    }
    match goto {
        Goto::End => tracing::info!("[Router] Workflow completed"),
        Goto::Node(node) => tracing::info!("[Router] Delegating to: {}", node),
    }
    Ok(Command::new(StateUpdate::default().next(goto), goto))
}
