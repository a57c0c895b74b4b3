//! Planner node: one generation, validated into a plan.

use crate::error::WorkflowError;
use crate::llm::ChatRequest;
use crate::models::{Goto, Message, Node};
use crate::search::results_to_prompt;
use crate::state::{Command, State, StateUpdate};
use crate::tracer::NodeTracer;

use super::validator::{check_agents, validate_plan};
use super::Runtime;

const SEARCH_TOOL: &str = "tavily_search";

pub async fn planner_node(
    runtime: &Runtime,
    state: &State,
    tracer: &NodeTracer,
) -> Result<Command, WorkflowError> {
    tracing::info!("[Planner] Generating full plan");
    let options = state.options();
    let mut messages = runtime.prompts.apply(Node::Planner.as_str(), state)?;

    if options.search_before_planning {
        search_into_prompt(runtime, state, tracer, &mut messages).await?;
    }

    let model = runtime
        .models
        .for_node(Node::Planner, options.deep_thinking_mode);
    let raw = tracer
        .generate(model.as_ref(), ChatRequest::new(messages), state.guard())
        .await?;
    tracing::debug!("[Planner] Raw response: {}", raw);

    let validation = validate_plan(&raw);
    let outcome = validation
        .outcome
        .and_then(|plan| check_agents(&plan, state.team_members()).map(|_| plan));

    let update = StateUpdate::default()
        .message(Message::user(validation.cleaned.clone()).with_name(Node::Planner.as_str()))
        .full_plan(validation.cleaned);

    match outcome {
        Ok(plan) => {
            tracing::info!(
                "[Planner] Accepted plan '{}' with {} steps",
                plan.title,
                plan.steps.len()
            );
            let goto = Goto::Node(Node::Supervisor);
            Ok(Command::new(update.next(goto), goto))
        }
        Err(rejection) => {
            tracing::warn!("[Planner] Plan rejected: {}", rejection);
            let notice = Message::assistant(format!(
                "Plan rejected: {}. The workflow has stopped.",
                rejection
            ))
            .with_name(Node::Planner.as_str());
            Ok(Command::new(update.message(notice).next(Goto::End), Goto::End))
        }
    }
}

/// Single search round appended to the last prompt message.
async fn search_into_prompt(
    runtime: &Runtime,
    state: &State,
    tracer: &NodeTracer,
    messages: &mut [Message],
) -> Result<(), WorkflowError> {
    let Some(search) = &runtime.search else {
        tracing::warn!("[Planner] search_before_planning set but no search provider configured");
        return Ok(());
    };
    let query = state
        .last_user_message()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    match tracer
        .tool(SEARCH_TOOL, &query, state.guard(), search.search(&query))
        .await
    {
        Ok(results) => {
            if let Some(last) = messages.last_mut() {
                last.content.push_str("\n\n# Relative Search Results\n\n");
                last.content.push_str(&results_to_prompt(&results));
            }
            Ok(())
        }
        Err(e) if e.is_interruption() => Err(e),
        Err(e) => {
            tracing::warn!("[Planner] Search before planning failed: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::guard::RunGuard;
    use crate::llm::{ModelRegistry, ScriptedModel};
    use crate::models::Worker;
    use crate::search::{SearchProvider, SearchResult};
    use crate::state::WorkflowOptions;
    use crate::tracer::Tracer;

    const PLAN: &str = r#"{"thought":"t","title":"Rust","steps":[{"agent_name":"researcher","title":"a","description":"b"}]}"#;

    struct FixedSearch;

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, WorkflowError> {
            Ok(vec![SearchResult {
                title: "Rust".into(),
                url: "https://rust-lang.org".into(),
                content: "A language empowering everyone".into(),
            }])
        }
    }

    fn state(options: WorkflowOptions) -> State {
        State::new(
            vec![Message::user("What is Rust?")],
            Worker::ALL.to_vec(),
            options,
            RunGuard::unbounded(),
        )
    }

    async fn plan_with(reply: &str, options: WorkflowOptions) -> (Command, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(vec![reply]));
        let runtime =
            Runtime::new(ModelRegistry::uniform(model.clone())).with_search(Arc::new(FixedSearch));
        let tracer = Tracer::disabled().for_node(Node::Planner);
        let command = planner_node(&runtime, &state(options), &tracer).await.unwrap();
        (command, model)
    }

    #[tokio::test]
    async fn test_valid_plan_routes_to_supervisor() {
        let (command, _) = plan_with(&format!("```json\n{}\n```", PLAN), WorkflowOptions::default()).await;
        assert_eq!(command.goto, Goto::Node(Node::Supervisor));
        assert_eq!(command.update.full_plan.as_deref(), Some(PLAN));
        assert_eq!(command.update.messages.len(), 1);
        assert_eq!(command.update.messages[0].name.as_deref(), Some("planner"));
        assert_eq!(command.update.messages[0].content, PLAN);
    }

    #[tokio::test]
    async fn test_invalid_plan_terminates_with_audit_text() {
        let (command, _) = plan_with("Let me think about it.", WorkflowOptions::default()).await;
        assert_eq!(command.goto, Goto::End);
        assert_eq!(command.update.next, Some(Goto::End));
        assert_eq!(command.update.full_plan.as_deref(), Some("Let me think about it."));
        assert!(command.update.messages[1].content.starts_with("Plan rejected"));
    }

    #[tokio::test]
    async fn test_unknown_agent_is_rejected() {
        let plan = PLAN.replace("researcher", "astronaut");
        let (command, _) = plan_with(&plan, WorkflowOptions::default()).await;
        assert_eq!(command.goto, Goto::End);
        assert!(command.update.messages[1].content.contains("astronaut"));
    }

    #[tokio::test]
    async fn test_search_results_appended_to_prompt() {
        let options = WorkflowOptions {
            deep_thinking_mode: false,
            search_before_planning: true,
        };
        let (_, model) = plan_with(PLAN, options).await;
        let request = &model.requests()[0];
        let last = request.messages.last().unwrap();
        assert!(last.content.starts_with("What is Rust?"));
        assert!(last.content.contains("# Relative Search Results"));
        assert!(last.content.contains("https://rust-lang.org"));
    }
}
