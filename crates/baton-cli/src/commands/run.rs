//! `baton run` — Run one workflow and stream its events to the terminal.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_stream::StreamExt;

use baton_core::llm::{ModelRegistry, ScriptedModel};
use baton_core::{BatonConfig, Message, Runtime, WorkflowOptions, WorkflowService};

use super::render::EventRenderer;

pub struct RunArgs {
    pub query: String,
    pub options: WorkflowOptions,
    pub config: Option<PathBuf>,
    pub json: bool,
    /// YAML list of canned model replies, consumed in call order.
    pub replay: Option<PathBuf>,
}

/// Build the service, replacing every model tier with the replay script when given.
pub fn build_service(config: &BatonConfig, replay: Option<&Path>) -> Result<WorkflowService, String> {
    let mut runtime = Runtime::from_config(config).map_err(|e| e.to_string())?;
    if let Some(path) = replay {
        let script = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let model = ScriptedModel::from_yaml(&script)
            .map_err(|e| e.to_string())?
            .named("replay");
        tracing::info!("[CLI] Replaying {} scripted replies from {}", model.remaining(), path.display());
        runtime.models = ModelRegistry::uniform(Arc::new(model));
    }
    Ok(WorkflowService::new(runtime))
}

pub async fn run(args: RunArgs) -> Result<(), String> {
    let mut stdout = std::io::stdout();
    run_with_output(args, &mut stdout).await
}

pub async fn run_with_output(args: RunArgs, out: &mut impl Write) -> Result<(), String> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err("The query is empty".to_string());
    }

    let config = super::load_config(args.config.as_deref())?;
    let service = build_service(&config, args.replay.as_deref())?;

    let mut stream = service
        .run_agent_workflow(vec![Message::user(query)], args.options)
        .map_err(|e| e.to_string())?;

    let mut renderer = EventRenderer::new(args.json);
    while let Some(event) = stream.next().await {
        renderer
            .render(&event, out)
            .map_err(|e| format!("Failed to write output: {}", e))?;
    }
    Ok(())
}
