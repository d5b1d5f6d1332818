use std::sync::Arc;

use airwave_engine::GenerationEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The generation engine owning all collaborators and live jobs.
    pub engine: Arc<GenerationEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
