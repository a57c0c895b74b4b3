//! Plan validation: raw planner text to a [`Plan`] or a typed rejection.

use serde_json::Value;

use crate::models::{Plan, PlanRejection, Worker};

/// Result of validating one planner output.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanValidation {
    /// Text after trimming, fence stripping and embedded-object extraction.
    pub cleaned: String,
    pub outcome: Result<Plan, PlanRejection>,
}

impl PlanValidation {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Trim and drop one leading fence opener (with optional language tag)
/// and one trailing fence.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        text = rest[tag_len..].trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// The span from the first `{` to the last `}`, if any.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Best-effort JSON object extraction for structured replies.
pub(crate) fn json_candidate(text: &str) -> &str {
    let stripped = strip_code_fence(text);
    brace_span(stripped).unwrap_or(stripped)
}

fn clean(raw: &str) -> &str {
    let stripped = strip_code_fence(raw);
    match brace_span(stripped) {
        // Only when the object is clearly embedded in surrounding prose.
        Some(candidate) if candidate.chars().count() * 5 < stripped.chars().count() * 4 => {
            candidate
        }
        _ => stripped,
    }
}

fn is_present(object: &serde_json::Map<String, Value>, field: &str) -> bool {
    object.get(field).is_some_and(|v| !v.is_null())
}

fn check_shape(value: &Value) -> Result<(), PlanRejection> {
    let object = value.as_object().ok_or(PlanRejection::NotAnObject)?;
    for field in ["thought", "title", "steps"] {
        if !is_present(object, field) {
            return Err(PlanRejection::MissingField(field));
        }
    }
    let steps = object["steps"]
        .as_array()
        .ok_or(PlanRejection::StepsNotAList)?;
    for (index, step) in steps.iter().enumerate() {
        for field in ["agent_name", "title", "description"] {
            let present = step.as_object().is_some_and(|s| is_present(s, field));
            if !present {
                return Err(PlanRejection::StepMissingField { index, field });
            }
        }
    }
    Ok(())
}

/// Validate raw planner output. Never panics or returns `Err` outward;
/// every failure is a [`PlanRejection`].
pub fn validate_plan(raw: &str) -> PlanValidation {
    let cleaned = clean(raw).to_string();
    let outcome = parse(&cleaned);
    PlanValidation { cleaned, outcome }
}

fn parse(cleaned: &str) -> Result<Plan, PlanRejection> {
    if cleaned.is_empty() {
        return Err(PlanRejection::Empty);
    }
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| PlanRejection::Parse(e.to_string()))?;
    check_shape(&value)?;
    serde_json::from_value(value).map_err(|e| PlanRejection::Parse(e.to_string()))
}

/// Every step must name a member of the team.
pub fn check_agents(plan: &Plan, team_members: &[Worker]) -> Result<(), PlanRejection> {
    for (index, step) in plan.steps.iter().enumerate() {
        let known = Worker::from_name(&step.agent_name).is_some_and(|w| team_members.contains(&w));
        if !known {
            return Err(PlanRejection::UnknownAgent {
                index,
                agent_name: step.agent_name.clone(),
            });
        }
    }
    Ok(())
}
