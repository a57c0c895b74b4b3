pub mod chat;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new().nest("/api/chat", chat::router())
}
