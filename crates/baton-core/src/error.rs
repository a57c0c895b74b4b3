//! Core error type for the Baton workflow engine.
//!
//! `WorkflowError` is used throughout the core domain (backends, tools,
//! configuration, the driver). Most variants are recovered inside the
//! graph and never reach callers; see `graph::run_workflow` for the policy.
//! When the `axum` feature is enabled, it also implements `IntoResponse`
//! so it can be used directly as an axum handler error type.

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Workflow cancelled")]
    Cancelled,

    #[error("Workflow deadline exceeded")]
    DeadlineExceeded,
}

impl WorkflowError {
    /// True for errors that must stop the whole run rather than be
    /// folded into a worker envelope.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for WorkflowError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            WorkflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Backend(_) | WorkflowError::Tool(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            WorkflowError::Config(_)
            | WorkflowError::MalformedOutput(_)
            | WorkflowError::Database(_)
            | WorkflowError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
