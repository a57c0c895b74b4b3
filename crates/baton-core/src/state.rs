//! Per-run workflow state threaded through every node.

use serde::{Deserialize, Serialize};

use crate::guard::RunGuard;
use crate::models::{BiomedicalFindings, Goto, Message, MessageRole, Worker};

/// Mode flags fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOptions {
    #[serde(default, alias = "deep_thinking")]
    pub deep_thinking_mode: bool,
    #[serde(default)]
    pub search_before_planning: bool,
}

/// The record every node reads. Only the driver applies updates to it.
#[derive(Debug, Clone)]
pub struct State {
    messages: Vec<Message>,
    team_members: Vec<Worker>,
    next: Option<Goto>,
    full_plan: Option<String>,
    options: WorkflowOptions,
    biomedical_findings: Option<BiomedicalFindings>,
    guard: RunGuard,
}

impl State {
    pub fn new(
        messages: Vec<Message>,
        team_members: Vec<Worker>,
        options: WorkflowOptions,
        guard: RunGuard,
    ) -> Self {
        Self {
            messages,
            team_members,
            next: None,
            full_plan: None,
            options,
            biomedical_findings: None,
            guard,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn team_members(&self) -> &[Worker] {
        &self.team_members
    }

    /// Last routing decision, including the terminal sentinel.
    pub fn next(&self) -> Option<Goto> {
        self.next
    }

    pub fn full_plan(&self) -> Option<&str> {
        self.full_plan.as_deref()
    }

    pub fn options(&self) -> WorkflowOptions {
        self.options
    }

    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    /// Biomedical findings for the reporter's prompt.
    ///
    /// Written only by the biomedical researcher; read only by the reporter.
    pub fn biomedical_findings(&self) -> Option<&BiomedicalFindings> {
        self.biomedical_findings.as_ref()
    }

    /// The most recent message typed by the user.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_from_user())
    }

    /// Content of the first user message; used as the run's query.
    pub fn user_query(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(next) = update.next {
            self.next = Some(next);
        }
        if let Some(plan) = update.full_plan {
            self.full_plan = Some(plan);
        }
        if let Some(findings) = update.biomedical_findings {
            self.biomedical_findings = Some(findings);
        }
    }
}

/// Changes a node wants applied to `State`.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub next: Option<Goto>,
    pub full_plan: Option<String>,
    pub(crate) biomedical_findings: Option<BiomedicalFindings>,
}

impl StateUpdate {
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn next(mut self, next: Goto) -> Self {
        self.next = Some(next);
        self
    }

    pub fn full_plan(mut self, plan: impl Into<String>) -> Self {
        self.full_plan = Some(plan.into());
        self
    }
}

/// A node's result: what to change, and where to go.
#[derive(Debug, Clone)]
pub struct Command {
    pub update: StateUpdate,
    pub goto: Goto,
    /// Direct answer produced by the coordinator, kept out of `messages`.
    pub reply: Option<Message>,
}

impl Command {
    pub fn new(update: StateUpdate, goto: Goto) -> Self {
        Self {
            update,
            goto,
            reply: None,
        }
    }

    pub fn with_reply(mut self, reply: Message) -> Self {
        self.reply = Some(reply);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    fn state() -> State {
        State::new(
            vec![Message::user("What is Rust?")],
            Worker::ALL.to_vec(),
            WorkflowOptions::default(),
            RunGuard::unbounded(),
        )
    }

    #[test]
    fn test_apply_appends_and_sets() {
        let mut state = state();
        state.apply(
            StateUpdate::default()
                .message(Message::user("{}").with_name("planner"))
                .next(Goto::Node(Node::Supervisor))
                .full_plan("{}"),
        );
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.next(), Some(Goto::Node(Node::Supervisor)));
        assert_eq!(state.full_plan(), Some("{}"));

        state.apply(StateUpdate::default());
        assert_eq!(state.full_plan(), Some("{}"));
        assert_eq!(state.next(), Some(Goto::Node(Node::Supervisor)));
    }

    #[test]
    fn test_last_user_message_skips_named_entries() {
        let mut state = state();
        state.apply(StateUpdate::default().message(Message::user("envelope").with_name("coder")));
        assert_eq!(state.last_user_message().unwrap().content, "What is Rust?");
        assert_eq!(state.user_query(), "What is Rust?");
    }

    #[test]
    fn test_options_accept_both_flag_spellings() {
        let opts: WorkflowOptions =
            serde_json::from_str(r#"{"deep_thinking": true, "search_before_planning": true}"#)
                .unwrap();
        assert!(opts.deep_thinking_mode);
        assert!(opts.search_before_planning);
    }
}
