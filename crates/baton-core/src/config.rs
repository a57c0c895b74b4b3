//! Configuration for models, tools and run limits.
//!
//! Loaded from YAML. String values may reference the environment with
//! `${VAR}` or `${VAR:-default}`, and well-known variables override the file:
//!
//! ```yaml
//! models:
//!   basic:
//!     model: gpt-4o
//!     base_url: https://api.openai.com/v1
//!     api_key: ${OPENAI_API_KEY}
//! roles:
//!   reporter: reasoning
//! search:
//!   max_results: 5
//! database:
//!   path: ./data/warehouse.db
//! workflow:
//!   max_sql_retries: 2
//!   max_steps: 50
//!   deadline_secs: 600
//! prompts_dir: ./prompts
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::llm::{ChatModel, ModelRegistry, OpenAiCompatModel};
use crate::models::ModelTier;

/// One OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl ModelSettings {
    fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTiers {
    #[serde(default = "default_basic")]
    pub basic: ModelSettings,
    #[serde(default = "default_reasoning")]
    pub reasoning: ModelSettings,
    #[serde(default = "default_vision")]
    pub vision: ModelSettings,
}

fn default_basic() -> ModelSettings {
    ModelSettings::with_model("gpt-4o")
}

fn default_reasoning() -> ModelSettings {
    ModelSettings::with_model("o3-mini")
}

fn default_vision() -> ModelSettings {
    ModelSettings::with_model("gpt-4o")
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            basic: default_basic(),
            reasoning: default_reasoning(),
            vision: default_vision(),
        }
    }
}

impl ModelTiers {
    pub fn get(&self, tier: ModelTier) -> &ModelSettings {
        match tier {
            ModelTier::Basic => &self.basic,
            ModelTier::Reasoning => &self.reasoning,
            ModelTier::Vision => &self.vision,
        }
    }

    fn get_mut(&mut self, tier: ModelTier) -> &mut ModelSettings {
        match tier {
            ModelTier::Basic => &mut self.basic,
            ModelTier::Reasoning => &mut self.reasoning,
            ModelTier::Vision => &mut self.vision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    5
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Per-run limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    #[serde(default = "default_max_sql_retries")]
    pub max_sql_retries: u32,
    /// Node executions allowed per run.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

fn default_max_sql_retries() -> u32 {
    2
}

fn default_max_steps() -> usize {
    50
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_sql_retries: default_max_sql_retries(),
            max_steps: default_max_steps(),
            deadline_secs: None,
        }
    }
}

impl WorkflowSettings {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatonConfig {
    #[serde(default)]
    pub models: ModelTiers,
    /// Role (node name) to tier overrides.
    #[serde(default)]
    pub roles: HashMap<String, ModelTier>,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
}

impl BatonConfig {
    /// Parse YAML after resolving `${VAR}` references.
    pub fn from_yaml(yaml: &str) -> Result<Self, WorkflowError> {
        let resolved = resolve_env_vars(yaml);
        let config: Self = serde_yaml::from_str(&resolved)
            .map_err(|e| WorkflowError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, WorkflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// File (if any) plus process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, WorkflowError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        tracing::info!(
            "[Config] basic={} reasoning={} vision={} max_steps={}",
            config.models.basic.model,
            config.models.reasoning.model,
            config.models.vision.model,
            config.workflow.max_steps
        );
        Ok(config)
    }

    /// `./baton.yaml`, then `<config dir>/baton/config.yaml`, if either exists.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from("baton.yaml");
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("baton").join("config.yaml"))
            .filter(|path| path.is_file())
    }

    /// Apply well-known variables using `lookup` as the environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (prefix, tier) in [
            ("BASIC", ModelTier::Basic),
            ("REASONING", ModelTier::Reasoning),
            ("VL", ModelTier::Vision),
        ] {
            let settings = self.models.get_mut(tier);
            if let Some(v) = lookup(&format!("{}_MODEL", prefix)) {
                settings.model = v;
            }
            if let Some(v) = lookup(&format!("{}_BASE_URL", prefix)) {
                settings.base_url = v;
            }
            if let Some(v) = lookup(&format!("{}_API_KEY", prefix)) {
                settings.api_key = v;
            }
        }
        if let Some(v) = lookup("TAVILY_API_KEY") {
            self.search.api_key = v;
        }
        if let Some(v) = lookup("BATON_SQLITE_PATH") {
            self.database.path = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.workflow.max_steps == 0 {
            return Err(WorkflowError::Config(
                "workflow.max_steps must be at least 1".to_string(),
            ));
        }
        for (tier, settings) in [
            ("basic", &self.models.basic),
            ("reasoning", &self.models.reasoning),
            ("vision", &self.models.vision),
        ] {
            if settings.model.trim().is_empty() {
                return Err(WorkflowError::Config(format!(
                    "models.{}.model must not be empty",
                    tier
                )));
            }
        }
        Ok(())
    }

    /// OpenAI-compatible backends for every tier plus role overrides.
    pub fn model_registry(&self) -> ModelRegistry {
        let backend = |tier: ModelTier| -> Arc<dyn ChatModel> {
            Arc::new(OpenAiCompatModel::new(self.models.get(tier).clone()))
        };
        let mut registry = ModelRegistry::uniform(backend(ModelTier::Basic))
            .with_tier(ModelTier::Reasoning, backend(ModelTier::Reasoning))
            .with_tier(ModelTier::Vision, backend(ModelTier::Vision));
        for (role, tier) in &self.roles {
            registry = registry.with_role_tier(role.clone(), *tier);
        }
        registry
    }
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env pattern"))
}

/// Resolve `${VAR}` and `${VAR:-default}`; unknown variables without a
/// default are left untouched.
pub fn resolve_env_vars(input: &str) -> String {
    env_pattern()
        .replace_all(input, |caps: &regex::Captures| {
            let expr = &caps[1];
            if let Some(idx) = expr.find(":-") {
                let name = &expr[..idx];
                let default = &expr[idx + 2..];
                std::env::var(name).unwrap_or_else(|_| default.to_string())
            } else {
                std::env::var(expr).unwrap_or_else(|_| format!("${{{}}}", expr))
            }
        })
        .to_string()
}
