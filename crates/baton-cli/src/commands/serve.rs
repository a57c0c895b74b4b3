//! `baton serve` — Start the Baton HTTP server.

use std::path::PathBuf;

pub async fn run(host: String, port: u16, config_path: Option<PathBuf>) -> Result<(), String> {
    let config = baton_server::ServerConfig {
        host: host.clone(),
        port,
        config_path,
    };

    println!("Starting Baton server on {}:{}...", host, port);

    let addr = baton_server::start_server(config).await?;
    println!("Baton server listening on http://{}", addr);
    println!("Stream endpoint: POST http://{}/api/chat/stream", addr);

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
