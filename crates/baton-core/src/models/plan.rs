use serde::{Deserialize, Serialize};

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub agent_name: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Structured plan produced by the planner. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub thought: String,
    pub title: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Steps assigned to the given worker name, in plan order.
    pub fn steps_for<'a>(&'a self, agent_name: &'a str) -> impl Iterator<Item = &'a PlanStep> + 'a {
        self.steps.iter().filter(move |s| s.agent_name == agent_name)
    }
}

/// Why a planner output was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanRejection {
    #[error("plan output is empty")]
    Empty,

    #[error("plan is not valid JSON: {0}")]
    Parse(String),

    #[error("plan must be a JSON object")]
    NotAnObject,

    #[error("plan is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("plan field 'steps' must be a list")]
    StepsNotAList,

    #[error("step {index} is missing required field '{field}'")]
    StepMissingField { index: usize, field: &'static str },

    #[error("step {index} names unknown agent '{agent_name}'")]
    UnknownAgent { index: usize, agent_name: String },
}
