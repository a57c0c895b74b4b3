//! Normalised event stream for external consumers, translated from the
//! internal trace of one run.

use serde::Serialize;
use serde_json::Value;

use crate::graph::coordinator::HANDOFF_MARKER;
use crate::graph::{RunOutcome, Termination};
use crate::llm::Fragment;
use crate::models::{Message, Node, Worker};
use crate::tracer::TraceEvent;

/// Coordinator content fragments held back before deciding on a handoff.
pub const COORDINATOR_BUFFER: usize = 2;

/// One generated fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delta {
    Content(String),
    ReasoningContent(String),
}

/// `{event, data}` records of the external protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StartOfWorkflow {
        workflow_id: String,
        input: Vec<Message>,
    },
    StartOfAgent {
        agent_name: String,
        agent_id: String,
    },
    EndOfAgent {
        agent_name: String,
        agent_id: String,
    },
    StartOfLlm {
        agent_name: String,
    },
    EndOfLlm {
        agent_name: String,
    },
    Message {
        message_id: String,
        delta: Delta,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        tool_input: Value,
    },
    ToolCallResult {
        tool_call_id: String,
        tool_name: String,
        tool_result: Value,
    },
    EndOfWorkflow {
        workflow_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        messages: Option<Vec<Message>>,
    },
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartOfWorkflow { .. } => "start_of_workflow",
            Self::StartOfAgent { .. } => "start_of_agent",
            Self::EndOfAgent { .. } => "end_of_agent",
            Self::StartOfLlm { .. } => "start_of_llm",
            Self::EndOfLlm { .. } => "end_of_llm",
            Self::Message { .. } => "message",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolCallResult { .. } => "tool_call_result",
            Self::EndOfWorkflow { .. } => "end_of_workflow",
        }
    }

    /// The `data` payload alone.
    pub fn data(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .unwrap_or(Value::Null)
    }
}

/// Does the buffered coordinator text announce a handoff?
///
/// A partial marker only counts once the buffer is full; before that the
/// text must already carry the whole marker.
fn is_handoff(buffered: &str, full: bool) -> bool {
    let text = buffered.trim_start_matches(|c: char| c.is_whitespace() || c == '`');
    text.starts_with(HANDOFF_MARKER)
        || (full && text.len() >= "handoff".len() && HANDOFF_MARKER.starts_with(text))
}

/// Per-run translator. Owns the coordinator buffer and handoff flag, so
/// nothing leaks between runs.
#[derive(Debug)]
pub struct EventTranslator {
    workflow_id: String,
    team_members: Vec<Worker>,
    input: Vec<Message>,
    workflow_started: bool,
    coordinator_buffer: Vec<String>,
    coordinator_message_id: Option<String>,
    coordinator_flushed: bool,
    handoff: bool,
}

impl EventTranslator {
    pub fn new(
        workflow_id: impl Into<String>,
        team_members: Vec<Worker>,
        input: Vec<Message>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            team_members,
            input,
            workflow_started: false,
            coordinator_buffer: Vec::new(),
            coordinator_message_id: None,
            coordinator_flushed: false,
            handoff: false,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Whether the coordinator handed off during this run.
    pub fn handoff(&self) -> bool {
        self.handoff
    }

    fn agent_id(&self, node: Node, step: usize) -> String {
        format!("{}_{}_{}", self.workflow_id, node, step)
    }

    fn owns_tools(&self, node: Node) -> bool {
        node.worker()
            .is_some_and(|worker| self.team_members.contains(&worker))
    }

    pub fn translate(&mut self, event: TraceEvent) -> Vec<WorkflowEvent> {
        match event {
            TraceEvent::NodeStart { node, step } => {
                let mut out = Vec::new();
                if node == Node::Planner && !self.workflow_started {
                    self.workflow_started = true;
                    out.push(WorkflowEvent::StartOfWorkflow {
                        workflow_id: self.workflow_id.clone(),
                        input: self.input.clone(),
                    });
                }
                out.push(WorkflowEvent::StartOfAgent {
                    agent_name: node.to_string(),
                    agent_id: self.agent_id(node, step),
                });
                out
            }
            TraceEvent::NodeEnd { node, step } => vec![WorkflowEvent::EndOfAgent {
                agent_name: node.to_string(),
                agent_id: self.agent_id(node, step),
            }],
            TraceEvent::LlmStart { node } => vec![WorkflowEvent::StartOfLlm {
                agent_name: node.to_string(),
            }],
            TraceEvent::LlmEnd { node } => {
                let mut out = Vec::new();
                if node == Node::Coordinator {
                    out.extend(self.flush_coordinator());
                }
                out.push(WorkflowEvent::EndOfLlm {
                    agent_name: node.to_string(),
                });
                out
            }
            TraceEvent::LlmFragment {
                node,
                message_id,
                fragment,
            } => {
                if node == Node::Coordinator {
                    self.coordinator_fragment(message_id, fragment)
                } else {
                    fragment_events(message_id, fragment)
                }
            }
            TraceEvent::ToolStart {
                node,
                run_id,
                tool_name,
                input,
            } => {
                if !self.owns_tools(node) {
                    return Vec::new();
                }
                vec![WorkflowEvent::ToolCall {
                    tool_call_id: format!("{}_{}_{}_{}", self.workflow_id, node, tool_name, run_id),
                    tool_name,
                    tool_input: input,
                }]
            }
            TraceEvent::ToolEnd {
                node,
                run_id,
                tool_name,
                result,
            } => {
                if !self.owns_tools(node) {
                    return Vec::new();
                }
                vec![WorkflowEvent::ToolCallResult {
                    tool_call_id: format!("{}_{}_{}_{}", self.workflow_id, node, tool_name, run_id),
                    tool_name,
                    tool_result: result,
                }]
            }
        }
    }

    fn coordinator_fragment(&mut self, message_id: String, fragment: Fragment) -> Vec<WorkflowEvent> {
        if self.handoff {
            return Vec::new();
        }
        let mut out = Vec::new();
        if let Some(reasoning) = fragment.reasoning_content.filter(|r| !r.is_empty()) {
            out.push(WorkflowEvent::Message {
                message_id: message_id.clone(),
                delta: Delta::ReasoningContent(reasoning),
            });
        }
        if fragment.content.is_empty() {
            return out;
        }
        if self.coordinator_flushed {
            out.push(WorkflowEvent::Message {
                message_id,
                delta: Delta::Content(fragment.content),
            });
            return out;
        }

        self.coordinator_message_id = Some(message_id);
        self.coordinator_buffer.push(fragment.content);
        let full = self.coordinator_buffer.len() >= COORDINATOR_BUFFER;
        if is_handoff(&self.coordinator_buffer.concat(), full) {
            tracing::debug!("[EventTranslator] Coordinator handoff detected");
            self.handoff = true;
            self.coordinator_buffer.clear();
            return Vec::new();
        }
        if full {
            out.extend(self.flush_coordinator());
        }
        out
    }

    fn flush_coordinator(&mut self) -> Option<WorkflowEvent> {
        if self.handoff || self.coordinator_buffer.is_empty() {
            return None;
        }
        self.coordinator_flushed = true;
        let content = self.coordinator_buffer.concat();
        self.coordinator_buffer.clear();
        Some(WorkflowEvent::Message {
            message_id: self.coordinator_message_id.clone().unwrap_or_default(),
            delta: Delta::Content(content),
        })
    }

    /// The closing event. Messages are included only for direct answers.
    pub fn finish(&mut self, outcome: Option<&RunOutcome>) -> WorkflowEvent {
        let messages = outcome
            .filter(|o| o.termination == Termination::DirectAnswer)
            .map(RunOutcome::final_messages);
        WorkflowEvent::EndOfWorkflow {
            workflow_id: self.workflow_id.clone(),
            messages,
        }
    }
}

fn fragment_events(message_id: String, fragment: Fragment) -> Vec<WorkflowEvent> {
    let mut out = Vec::new();
    if let Some(reasoning) = fragment.reasoning_content.filter(|r| !r.is_empty()) {
        out.push(WorkflowEvent::Message {
            message_id: message_id.clone(),
            delta: Delta::ReasoningContent(reasoning),
        });
    }
    if !fragment.content.is_empty() {
        out.push(WorkflowEvent::Message {
            message_id,
            delta: Delta::Content(fragment.content),
        });
    }
    out
}
