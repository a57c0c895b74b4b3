use std::sync::Arc;

use baton_core::WorkflowService;

/// Shared handler state. The service is cheap to clone; every request
/// starts an independent run.
pub struct AppStateInner {
    pub service: WorkflowService,
}

impl AppStateInner {
    pub fn new(service: WorkflowService) -> Self {
        Self { service }
    }
}

pub type AppState = Arc<AppStateInner>;
