use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use voucher_search::SearchService;

/// Shared application state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Search façade; the only pipeline entry point.
    pub search: Arc<SearchService>,
    /// LLM collaborator, absent in retrieval-only deployments.
    pub llm: Option<Arc<LlmServiceProfiles>>,
}

impl AppState {
    pub fn new(search: Arc<SearchService>, llm: Option<Arc<LlmServiceProfiles>>) -> Self {
        Self { search, llm }
    }
}
