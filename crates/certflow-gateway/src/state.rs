use std::sync::Arc;

use certflow_core::config::ServerConfig;
use certflow_workflow::ValidationWorkflow;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub workflow: Arc<ValidationWorkflow>,
}
