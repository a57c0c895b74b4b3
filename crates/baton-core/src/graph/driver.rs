//! Drives one run from the coordinator to a terminal state.

use serde::Serialize;

use crate::error::WorkflowError;
use crate::models::{Goto, Message, Node};
use crate::state::{Command, State, StateUpdate};
use crate::tracer::{NodeTracer, TraceEvent, Tracer};

use super::coordinator::coordinator_node;
use super::planner::planner_node;
use super::router::supervisor_node;
use super::workers::worker_node;
use super::Runtime;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The coordinator answered without planning.
    DirectAnswer,
    PlanRejected,
    /// The router chose FINISH.
    Finished,
    StepLimit,
    /// A control node failed; see the last message.
    Failed,
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub termination: Termination,
    pub state: State,
    /// The coordinator's direct answer, when there was one.
    pub reply: Option<Message>,
    pub steps: usize,
}

impl RunOutcome {
    /// Final messages including the coordinator's direct answer.
    pub fn final_messages(&self) -> Vec<Message> {
        let mut messages = self.state.messages().to_vec();
        messages.extend(self.reply.clone());
        messages
    }
}

async fn execute(
    runtime: &Runtime,
    node: Node,
    state: &State,
    tracer: &NodeTracer,
) -> Result<Command, WorkflowError> {
    match node {
        Node::Coordinator => coordinator_node(runtime, state, tracer).await,
        Node::Planner => planner_node(runtime, state, tracer).await,
        Node::Supervisor => supervisor_node(runtime, state, tracer).await,
        Node::Worker(worker) => worker_node(runtime, worker, state, tracer).await,
    }
}

fn stop_message(text: String) -> StateUpdate {
    StateUpdate::default().message(Message::assistant(text))
}

/// Execute nodes one at a time until a terminal state. Never returns `Err`:
/// every failure ends the run with an explanatory message.
pub async fn run_workflow(runtime: &Runtime, mut state: State, tracer: &Tracer) -> RunOutcome {
    let max_steps = runtime.settings.max_steps;
    let mut node = Node::Coordinator;
    let mut steps = 0;
    let mut reply = None;

    let termination = loop {
        if let Err(e) = state.guard().check() {
            tracing::warn!("[Workflow] Stopping before {}: {}", node, e);
            state.apply(stop_message(format!("The workflow was stopped: {}.", e)));
            break interruption(&e);
        }
        if steps >= max_steps {
            tracing::warn!("[Workflow] Step limit of {} reached before {}", max_steps, node);
            state.apply(stop_message(format!(
                "The workflow stopped after {} steps without finishing.",
                max_steps
            )));
            break Termination::StepLimit;
        }
        steps += 1;

        tracer.emit(TraceEvent::NodeStart { node, step: steps });
        let result = execute(runtime, node, &state, &tracer.for_node(node)).await;
        tracer.emit(TraceEvent::NodeEnd { node, step: steps });

        match result {
            Ok(command) => {
                if command.reply.is_some() {
                    reply = command.reply;
                }
                state.apply(command.update);
                match command.goto {
                    Goto::Node(next) => node = next,
                    Goto::End => {
                        break match node {
                            Node::Coordinator => Termination::DirectAnswer,
                            Node::Planner => Termination::PlanRejected,
                            _ => Termination::Finished,
                        };
                    }
                }
            }
            Err(e) if e.is_interruption() => {
                tracing::warn!("[Workflow] {} interrupted: {}", node, e);
                state.apply(stop_message(format!("The workflow was stopped: {}.", e)));
                break interruption(&e);
            }
            Err(e) => {
                tracing::error!("[Workflow] {} failed: {}", node, e);
                state.apply(stop_message(format!(
                    "The workflow stopped because the {} failed: {}",
                    node, e
                )));
                break Termination::Failed;
            }
        }
    };

    tracing::info!("[Workflow] Finished after {} steps: {:?}", steps, termination);
    RunOutcome {
        termination,
        state,
        reply,
        steps,
    }
}

fn interruption(e: &WorkflowError) -> Termination {
    match e {
        WorkflowError::DeadlineExceeded => Termination::DeadlineExceeded,
        _ => Termination::Cancelled,
    }
}
