//! Role prompt templates and their rendering.
//!
//! Templates use `<<VAR>>` placeholders. Built-ins can be overridden by
//! `<role>.md` files in a prompts directory.

mod builtin;

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::WorkflowError;
use crate::models::{Message, Worker};
use crate::state::State;

pub const SUPERVISOR_DEEP: &str = "supervisor_deep";
pub const SQL_GENERATOR: &str = "sql_generator";
pub const SQL_VALIDATOR: &str = "sql_validator";
pub const SQL_FORMATTER: &str = "sql_formatter";

/// Per-call template variables.
pub type PromptVars = HashMap<&'static str, String>;

fn builtin_template(role: &str) -> Option<&'static str> {
    let template = match role {
        "coordinator" => builtin::COORDINATOR,
        "planner" => builtin::PLANNER,
        "supervisor" => builtin::SUPERVISOR,
        SUPERVISOR_DEEP => builtin::SUPERVISOR_DEEP,
        SQL_GENERATOR => builtin::SQL_GENERATOR,
        SQL_VALIDATOR => builtin::SQL_VALIDATOR,
        SQL_FORMATTER => builtin::SQL_FORMATTER,
        other => match Worker::from_name(other)? {
            Worker::Researcher => builtin::RESEARCHER,
            Worker::Coder => builtin::CODER,
            Worker::Browser => builtin::BROWSER,
            Worker::DataAnalyst => builtin::DATA_ANALYST,
            Worker::BiomedicalResearcher => builtin::BIOMEDICAL_RESEARCHER,
            Worker::Reporter => builtin::REPORTER,
        },
    };
    Some(template)
}

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<<([A-Z_]+)>>").expect("valid placeholder pattern"))
}

/// Replace `<<VAR>>` placeholders; unknown names are left in place.
pub fn render_template(template: &str, vars: &PromptVars) -> String {
    placeholder()
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    overrides: HashMap<String, String>,
}

impl PromptLibrary {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load `<role>.md` overrides from `dir`. Files for unknown roles are ignored.
    pub fn from_dir(dir: &Path) -> Result<Self, WorkflowError> {
        if !dir.is_dir() {
            return Err(WorkflowError::Config(format!(
                "Prompts directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut overrides = HashMap::new();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            WorkflowError::Config(format!("Failed to read '{}': {}", dir.display(), e))
        })?;
        for entry in entries {
            let path = entry
                .map_err(|e| WorkflowError::Config(format!("Directory entry error: {}", e)))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(role) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if builtin_template(role).is_none() {
                tracing::warn!("[Prompts] Ignoring prompt for unknown role: {}", path.display());
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| {
                WorkflowError::Config(format!("Failed to read '{}': {}", path.display(), e))
            })?;
            tracing::info!("[Prompts] Loaded override for '{}'", role);
            overrides.insert(role.to_string(), content);
        }
        Ok(Self { overrides })
    }

    pub fn load(dir: Option<&Path>) -> Result<Self, WorkflowError> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Ok(Self::builtin()),
        }
    }

    pub fn template(&self, role: &str) -> Result<&str, WorkflowError> {
        if let Some(content) = self.overrides.get(role) {
            return Ok(content);
        }
        builtin_template(role)
            .ok_or_else(|| WorkflowError::Config(format!("No prompt for role '{}'", role)))
    }

    pub fn render(&self, role: &str, vars: &PromptVars) -> Result<String, WorkflowError> {
        Ok(render_template(self.template(role)?, vars))
    }

    /// `[system prompt] + state.messages`.
    pub fn apply(&self, role: &str, state: &State) -> Result<Vec<Message>, WorkflowError> {
        self.apply_with(role, state, PromptVars::new())
    }

    /// Like [`apply`](Self::apply) with extra variables taking precedence.
    pub fn apply_with(
        &self,
        role: &str,
        state: &State,
        extra: PromptVars,
    ) -> Result<Vec<Message>, WorkflowError> {
        let mut vars = state_vars(role, state);
        vars.extend(extra);
        let system = self.render(role, &vars)?;
        let mut messages = Vec::with_capacity(state.messages().len() + 1);
        messages.push(Message::system(system));
        messages.extend(state.messages().iter().cloned());
        Ok(messages)
    }
}

pub fn current_time() -> String {
    chrono::Local::now().format("%a %b %d %Y %H:%M:%S %z").to_string()
}

fn state_vars(role: &str, state: &State) -> PromptVars {
    let members = state.team_members();
    let mut vars = PromptVars::new();
    vars.insert("CURRENT_TIME", current_time());
    vars.insert(
        "TEAM_MEMBERS",
        members
            .iter()
            .map(|w| w.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    vars.insert(
        "TEAM_DESCRIPTIONS",
        members
            .iter()
            .map(|w| format!("- **`{}`**: {}", w, w.description()))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    vars.insert(
        "FULL_PLAN",
        state.full_plan().unwrap_or("(no plan yet)").to_string(),
    );
    vars.insert(
        "DEEP_THINKING_MODE",
        if state.options().deep_thinking_mode {
            "Deep thinking mode is on: reason carefully about dependencies between steps and justify each assignment in `thought`.".to_string()
        } else {
            String::new()
        },
    );
    if role == Worker::Reporter.as_str() {
        vars.insert("BIOMEDICAL_RESEARCH_RESULT", biomedical_section(state));
    }
    vars
}

/// The reporter's view of the biomedical side channel.
fn biomedical_section(state: &State) -> String {
    match state.biomedical_findings() {
        Some(findings) => {
            let json = serde_json::to_string_pretty(findings).unwrap_or_default();
            format!(
                "Biomedical research findings are available. Incorporate them into the report:\n\n```json\n{}\n```",
                json
            )
        }
        None => "No biomedical research findings are available for this request.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::RunGuard;
    use crate::models::BiomedicalFindings;
    use crate::state::{StateUpdate, WorkflowOptions};

    fn state() -> State {
        State::new(
            vec![Message::user("Compare aspirin and ibuprofen")],
            vec![Worker::Researcher, Worker::Reporter],
            WorkflowOptions::default(),
            RunGuard::unbounded(),
        )
    }

    #[test]
    fn test_render_template_leaves_unknown() {
        let mut vars = PromptVars::new();
        vars.insert("NAME", "Baton".to_string());
        assert_eq!(
            render_template("Hi <<NAME>>, <<OTHER>>", &vars),
            "Hi Baton, <<OTHER>>"
        );
    }

    #[test]
    fn test_apply_prepends_system_prompt() {
        let prompts = PromptLibrary::builtin();
        let messages = prompts.apply("planner", &state()).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("researcher, reporter"));
        assert!(!messages[0].content.contains("<<TEAM_MEMBERS>>"));
        assert_eq!(messages[1].content, "Compare aspirin and ibuprofen");
    }

    #[test]
    fn test_reporter_sees_side_channel() {
        let prompts = PromptLibrary::builtin();
        let without = prompts.apply("reporter", &state()).unwrap();
        assert!(without[0].content.contains("No biomedical research findings"));

        let mut state = state();
        let mut update = StateUpdate::default();
        update.biomedical_findings = Some(BiomedicalFindings {
            summary: "NSAIDs compared".into(),
            key_findings: vec!["similar efficacy".into()],
            sources: vec![],
            recommendations: vec![],
            confidence_level: 0.8,
        });
        state.apply(update);
        let with = prompts.apply("reporter", &state).unwrap();
        assert!(with[0].content.contains("NSAIDs compared"));

        // Other roles never read the side channel.
        let coder = prompts.apply("researcher", &state).unwrap();
        assert!(!coder[0].content.contains("NSAIDs compared"));
    }

    #[test]
    fn test_overrides_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("coordinator.md"), "Custom <<TEAM_MEMBERS>>").unwrap();
        std::fs::write(dir.path().join("unknown_role.md"), "ignored").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = PromptLibrary::from_dir(dir.path()).unwrap();
        let messages = prompts.apply("coordinator", &state()).unwrap();
        assert_eq!(messages[0].content, "Custom researcher, reporter");
        assert!(prompts.template("planner").unwrap().contains("professional planner"));
        assert!(prompts.template("unknown_role").is_err());
    }

    #[test]
    fn test_missing_dir_is_config_error() {
        let err = PromptLibrary::from_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));
    }
}
