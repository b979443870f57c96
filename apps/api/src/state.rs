use crate::config::Config;
use crate::screening::ScreeningWorkflow;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub screener: ScreeningWorkflow,
    pub config: Config,
}
