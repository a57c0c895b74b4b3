//! Chat API Integration Tests
//!
//! Full HTTP request/response cycles against a router backed by a scripted model.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use baton_core::llm::{ModelRegistry, ScriptedModel};
use baton_core::{Runtime, WorkflowService};
use baton_server::build_router;
use baton_server::state::AppStateInner;

fn setup_test_app(replies: Vec<&str>) -> axum::Router {
    let model = Arc::new(ScriptedModel::new(replies));
    let service = WorkflowService::new(Runtime::new(ModelRegistry::uniform(model)));
    build_router(Arc::new(AppStateInner::new(service)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// `(event name, data)` pairs of an SSE body.
fn parse_sse(text: &str) -> Vec<(String, Value)> {
    text.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = serde_json::from_str(rest.trim()).ok();
                }
            }
            Some((name?, data?))
        })
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "baton-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_stream_direct_answer() {
    let app = setup_test_app(vec!["Hello there!"]);
    let response = app
        .oneshot(post_json(
            "/api/chat/stream",
            json!({ "messages": [{ "role": "user", "content": "hi" }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let events = parse_sse(&body_text(response).await);
    let names: Vec<&str> = events.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names.first(), Some(&"start_of_agent"));
    assert_eq!(names.last(), Some(&"end_of_workflow"));

    let (_, end) = events.last().unwrap();
    assert_eq!(end["messages"][1]["content"], "Hello there!");
    assert_eq!(events[0].1["agent_name"], "coordinator");
}

#[tokio::test]
async fn test_stream_full_run() {
    let app = setup_test_app(vec![
        "handoff_to_planner()",
        r#"{"thought":"t","title":"Math","steps":[{"agent_name":"coder","title":"Multiply","description":"6*7"}]}"#,
        r#"{"next":"coder"}"#,
        "42",
        r#"{"next":"FINISH"}"#,
    ]);
    let response = app
        .oneshot(post_json(
            "/api/chat/stream",
            json!({
                "messages": [{ "role": "user", "content": "What is 6*7?" }],
                "deep_thinking_mode": false,
                "search_before_planning": false,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = parse_sse(&body_text(response).await);
    let start = events
        .iter()
        .find(|(n, _)| n == "start_of_workflow")
        .expect("start_of_workflow missing");
    assert_eq!(start.1["input"][0]["content"], "What is 6*7?");

    let agents: Vec<&str> = events
        .iter()
        .filter(|(n, _)| n == "start_of_agent")
        .filter_map(|(_, d)| d["agent_name"].as_str())
        .collect();
    assert_eq!(
        agents,
        vec!["coordinator", "planner", "supervisor", "coder", "supervisor"]
    );

    let (name, end) = events.last().unwrap();
    assert_eq!(name, "end_of_workflow");
    assert!(end.get("messages").is_none());
}

#[tokio::test]
async fn test_empty_messages_rejected() {
    let app = setup_test_app(vec![]);
    let response = app
        .oneshot(post_json("/api/chat/stream", json!({ "messages": [] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = setup_test_app(vec![]);
    let response = app
        .oneshot(post_json("/api/chat/stream", json!({ "query": "hi" })))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
