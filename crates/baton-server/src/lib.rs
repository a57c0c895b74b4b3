//! Baton Server - HTTP adapter for the Baton workflow engine
//!
//! Exposes one workflow run per request as a Server-Sent Events stream:
//! - `POST /api/chat/stream` streams the normalised workflow events
//! - `GET /api/health` reports liveness
//!
//! All workflow logic lives in `baton-core`; this crate only binds it to axum.

pub mod api;
pub mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use baton_core::{BatonConfig, WorkflowService};

use self::state::{AppState, AppStateInner};

/// Configuration for the Baton HTTP server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Baton configuration file; discovered from the usual locations when unset.
    pub config_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            config_path: None,
        }
    }
}

/// Create a shared `AppState` from a loaded configuration.
pub fn create_app_state(config: &BatonConfig) -> Result<AppState, String> {
    let service = WorkflowService::from_config(config)
        .map_err(|e| format!("Failed to build workflow service: {}", e))?;
    Ok(Arc::new(AppStateInner::new(service)))
}

/// Build the router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load configuration and start the server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // The CLI may already have installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baton_core=info,baton_server=info,tower_http=info".into()),
        )
        .try_init();

    let config_path = config.config_path.clone().or_else(BatonConfig::discover);
    let baton_config = BatonConfig::load(config_path.as_deref()).map_err(|e| e.to_string())?;
    let state = create_app_state(&baton_config)?;

    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Baton server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "baton-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
