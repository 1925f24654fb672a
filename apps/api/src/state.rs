use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ModelInvoker;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Model provider. Default: `LlmClient`; tests swap in canned outputs.
    pub invoker: Arc<dyn ModelInvoker>,
    pub sessions: SessionStore,
    pub config: Config,
}
