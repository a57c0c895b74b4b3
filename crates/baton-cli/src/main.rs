//! Baton CLI — command-line interface for the Baton workflow engine.
//!
//! Reuses the same core domain logic (baton-core) and server bootstrap
//! (baton-server) that back the HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use baton_cli::commands;
use baton_core::WorkflowOptions;

/// Baton — a coordinator, a planner and a supervisor directing a team of workers
#[derive(Parser)]
#[command(name = "baton", version, about = "Baton — multi-agent research workflows")]
pub struct Cli {
    /// Verbose logging (baton_core=debug)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one workflow and stream its events to the terminal
    Run {
        /// The request, e.g. "Compare the top three vector databases"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Plan with the reasoning tier and a more careful supervisor
        #[arg(long)]
        deep_thinking: bool,
        /// Search the web once before planning
        #[arg(long)]
        search_before_planning: bool,
        /// Configuration file (defaults to ./baton.yaml or the user config dir)
        #[arg(long, env = "BATON_CONFIG")]
        config: Option<PathBuf>,
        /// Print one JSON event per line
        #[arg(long)]
        json: bool,
        /// Replay canned model replies from a YAML file instead of calling a backend
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Configuration file (defaults to ./baton.yaml or the user config dir)
        #[arg(long, env = "BATON_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Inspect plans
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// Validate a planner output file offline
    Validate {
        /// File containing the raw planner output
        file: PathBuf,
        /// Comma-separated team roster (defaults to every worker)
        #[arg(long, value_delimiter = ',')]
        team: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let dotenv = commands::load_dotenv();

    // Initialize tracing; logs go to stderr so `--json` output stays clean
    let default_filter = if cli.debug {
        "baton_core=debug,baton_server=debug,baton_cli=debug"
    } else {
        "baton_core=info,baton_server=info,baton_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv {
        tracing::debug!("[CLI] Loaded environment from {}", path.display());
    }

    let result = match cli.command {
        Commands::Run {
            query,
            deep_thinking,
            search_before_planning,
            config,
            json,
            replay,
        } => {
            let args = commands::run::RunArgs {
                query: query.join(" "),
                options: WorkflowOptions {
                    deep_thinking_mode: deep_thinking,
                    search_before_planning,
                },
                config,
                json,
                replay,
            };
            commands::run::run(args).await
        }

        Commands::Serve { host, port, config } => commands::serve::run(host, port, config).await,

        Commands::Plan { action } => match action {
            PlanAction::Validate { file, team } => commands::plan::validate(&file, &team),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
