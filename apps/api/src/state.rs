use std::sync::Arc;

use crate::config::Config;
use crate::jobs::sources::JobSourceRegistry;
use crate::llm_client::LanguageModel;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LanguageModel>,
    /// Job sources built from the `ENABLE_*` flags at start-up.
    pub sources: Arc<JobSourceRegistry>,
    pub config: Arc<Config>,
}
