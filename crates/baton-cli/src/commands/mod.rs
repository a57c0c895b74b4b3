//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses
//! the baton-core domain logic through `WorkflowService`.

pub mod plan;
pub mod render;
pub mod run;
pub mod serve;

use std::path::{Path, PathBuf};

use baton_core::BatonConfig;

/// Load the nearest `.env`, walking up from the current directory.
/// Returns the file that was loaded.
pub fn load_dotenv() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(".env");
        if candidate.is_file() {
            return match dotenvy::from_path(&candidate) {
                Ok(()) => Some(candidate),
                Err(e) => {
                    eprintln!("Failed to load {}: {}", candidate.display(), e);
                    None
                }
            };
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from `path`, or from the discovered default location.
pub fn load_config(path: Option<&Path>) -> Result<BatonConfig, String> {
    let path = path.map(Path::to_path_buf).or_else(BatonConfig::discover);
    BatonConfig::load(path.as_deref()).map_err(|e| e.to_string())
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
