//! `baton plan validate` — Run the plan validator on a saved planner output.

use std::path::Path;

use baton_core::graph::check_agents;
use baton_core::{validate_plan, Plan, Worker};

/// Resolve roster names; an empty list means every worker.
pub fn parse_team(names: &[String]) -> Result<Vec<Worker>, String> {
    if names.is_empty() {
        return Ok(Worker::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| {
            Worker::from_name(name.trim()).ok_or_else(|| {
                format!(
                    "Unknown worker '{}'. Known workers: {}",
                    name,
                    Worker::ALL.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(", ")
                )
            })
        })
        .collect()
}

/// Validate raw planner text against the roster.
pub fn check_plan(raw: &str, team: &[Worker]) -> Result<Plan, String> {
    let validation = validate_plan(raw);
    let plan = validation
        .outcome
        .map_err(|rejection| format!("Plan rejected: {}", rejection))?;
    check_agents(&plan, team).map_err(|rejection| format!("Plan rejected: {}", rejection))?;
    Ok(plan)
}

pub fn validate(file: &Path, team: &[String]) -> Result<(), String> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let team = parse_team(team)?;
    let plan = check_plan(&raw, &team)?;

    println!("Plan is valid: {} ({} steps)", plan.title, plan.steps.len());
    super::print_json(&serde_json::to_value(&plan).map_err(|e| e.to_string())?);
    Ok(())
}
