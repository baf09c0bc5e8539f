use std::sync::Arc;

use crate::analysis::session::SessionStore;
use crate::job_posting::JobPostingFetcher;
use crate::llm_client::GenerationClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The only path to the generation backend.
    pub generator: GenerationClient,
    pub job_fetcher: Arc<JobPostingFetcher>,
    /// Latest run per session. Runs themselves share nothing.
    pub sessions: SessionStore,
}
