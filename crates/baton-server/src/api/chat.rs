//! Chat API
//!
//! POST /api/chat/stream - Run one workflow and stream its events as SSE

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt as _};

use baton_core::{Message, WorkflowError, WorkflowEvent, WorkflowOptions};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/stream", post(chat_stream))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub deep_thinking_mode: bool,
    #[serde(default)]
    pub search_before_planning: bool,
}

/// `event: <name>` / `data: <json>`.
pub fn to_sse_event(event: &WorkflowEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.data().to_string())
}

// ─── /api/chat/stream ────────────────────────────────────────────────

/// The run is cancelled when the client disconnects and the stream is dropped.
async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, WorkflowError> {
    let options = WorkflowOptions {
        deep_thinking_mode: body.deep_thinking_mode,
        search_before_planning: body.search_before_planning,
    };
    tracing::info!(
        "[ChatAPI] Stream requested ({} messages, deep_thinking: {})",
        body.messages.len(),
        options.deep_thinking_mode
    );

    let events = state.service.run_agent_workflow(body.messages, options)?;
    let stream = events.map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
