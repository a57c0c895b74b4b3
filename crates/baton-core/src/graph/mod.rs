//! The control-flow graph: coordinator, planner, router and workers, and the
//! driver that walks them one node at a time.

pub mod coordinator;
pub mod driver;
pub mod planner;
pub mod router;
pub mod validator;
pub mod workers;

use std::sync::Arc;

use crate::capabilities::Capabilities;
use crate::config::{BatonConfig, WorkflowSettings};
use crate::data::{SqlDatabase, SqliteDatabase};
use crate::error::WorkflowError;
use crate::llm::ModelRegistry;
use crate::prompts::PromptLibrary;
use crate::search::{SearchProvider, TavilySearch};

pub use driver::{run_workflow, RunOutcome, Termination};
pub use validator::{check_agents, validate_plan, PlanValidation};

/// Everything nodes need besides the run's `State`. Shared across runs.
pub struct Runtime {
    pub models: ModelRegistry,
    pub prompts: PromptLibrary,
    pub search: Option<Arc<dyn SearchProvider>>,
    pub capabilities: Capabilities,
    pub settings: WorkflowSettings,
}

impl Runtime {
    /// Built-in prompts, no tools, default limits.
    pub fn new(models: ModelRegistry) -> Self {
        let settings = WorkflowSettings::default();
        Self {
            models,
            prompts: PromptLibrary::builtin(),
            search: None,
            capabilities: Capabilities::standard(None, None, settings.max_sql_retries),
            settings,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Search used by the planner's search-before-planning round.
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn from_config(config: &BatonConfig) -> Result<Self, WorkflowError> {
        config.validate()?;

        let search: Option<Arc<dyn SearchProvider>> = if config.search.api_key.is_empty() {
            tracing::warn!("[Runtime] No search API key configured; web search disabled");
            None
        } else {
            Some(Arc::new(TavilySearch::new(&config.search)))
        };

        let database: Option<Arc<dyn SqlDatabase>> = match &config.database.path {
            Some(path) => Some(Arc::new(SqliteDatabase::open(path)?)),
            None => None,
        };

        Ok(Self {
            models: config.model_registry(),
            prompts: PromptLibrary::load(config.prompts_dir.as_deref())?,
            capabilities: Capabilities::standard(
                search.clone(),
                database,
                config.workflow.max_sql_retries,
            ),
            search,
            settings: config.workflow.clone(),
        })
    }
}
