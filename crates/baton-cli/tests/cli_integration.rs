//! Integration tests for the baton-cli commands.
//!
//! These tests exercise the same code paths as the binary, using replay
//! scripts instead of a live model backend.

use std::io::Write;

use baton_cli::commands::plan::{check_plan, parse_team};
use baton_cli::commands::run::{run_with_output, RunArgs};
use baton_core::{Worker, WorkflowOptions};

const PLAN: &str = r#"{"thought":"Needs code","title":"Math","steps":[{"agent_name":"coder","title":"Multiply","description":"6*7"}]}"#;

/// Write a replay script and a minimal config into a temp dir.
fn replay_fixture(replies: &[&str]) -> (tempfile::TempDir, RunArgs) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");

    let replay = dir.path().join("replay.yaml");
    let script: Vec<serde_json::Value> = replies.iter().map(|r| serde_json::json!(r)).collect();
    // JSON is valid YAML.
    std::fs::write(&replay, serde_json::to_string(&script).unwrap()).unwrap();

    let config = dir.path().join("baton.yaml");
    let mut file = std::fs::File::create(&config).unwrap();
    writeln!(file, "workflow:\n  max_steps: 10").unwrap();

    let args = RunArgs {
        query: "What is 6*7?".to_string(),
        options: WorkflowOptions::default(),
        config: Some(config),
        json: true,
        replay: Some(replay),
    };
    (dir, args)
}

fn event_lines(output: Vec<u8>) -> Vec<serde_json::Value> {
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is one JSON event"))
        .collect()
}

#[tokio::test]
async fn test_run_replay_json_output() {
    let (_dir, args) = replay_fixture(&[
        "handoff_to_planner()",
        PLAN,
        r#"{"next":"coder"}"#,
        "The answer is 42",
        r#"{"next":"FINISH"}"#,
    ]);
    let mut out = Vec::new();
    run_with_output(args, &mut out).await.expect("run should succeed");

    let events = event_lines(out);
    assert_eq!(events.first().unwrap()["event"], "start_of_agent");
    assert_eq!(events.last().unwrap()["event"], "end_of_workflow");
    assert!(events.iter().any(|e| e["event"] == "start_of_workflow"));

    let content: String = events
        .iter()
        .filter(|e| e["event"] == "message")
        .filter_map(|e| e["data"]["delta"]["content"].as_str())
        .collect();
    assert!(content.contains("The answer is 42"));
}

#[tokio::test]
async fn test_run_replay_direct_answer() {
    let (_dir, args) = replay_fixture(&["Hi! How can I help?"]);
    let mut out = Vec::new();
    run_with_output(args, &mut out).await.unwrap();

    let events = event_lines(out);
    let end = events.last().unwrap();
    assert_eq!(end["data"]["messages"][1]["content"], "Hi! How can I help?");
}

#[tokio::test]
async fn test_run_rejects_blank_query() {
    let (_dir, mut args) = replay_fixture(&[]);
    args.query = "   ".to_string();
    let mut out = Vec::new();
    assert!(run_with_output(args, &mut out).await.is_err());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_run_missing_config_file() {
    let (dir, mut args) = replay_fixture(&[]);
    args.config = Some(dir.path().join("missing.yaml"));
    let mut out = Vec::new();
    let err = run_with_output(args, &mut out).await.unwrap_err();
    assert!(err.contains("missing.yaml"));
}

#[test]
fn test_plan_validate_accepts_fenced_plan() {
    let raw = format!("```json\n{}\n```", PLAN);
    let plan = check_plan(&raw, &Worker::ALL).unwrap();
    assert_eq!(plan.title, "Math");
    assert_eq!(plan.steps[0].agent_name, "coder");
}

#[test]
fn test_plan_validate_rejections() {
    let err = check_plan("not a plan", &Worker::ALL).unwrap_err();
    assert!(err.starts_with("Plan rejected"));

    let team = parse_team(&["researcher".to_string()]).unwrap();
    let err = check_plan(PLAN, &team).unwrap_err();
    assert!(err.contains("coder"));
}

#[test]
fn test_parse_team() {
    assert_eq!(parse_team(&[]).unwrap().len(), Worker::ALL.len());
    let team = parse_team(&["coder".to_string(), " reporter".to_string()]).unwrap();
    assert_eq!(team, vec![Worker::Coder, Worker::Reporter]);
    assert!(parse_team(&["pilot".to_string()]).is_err());
}
