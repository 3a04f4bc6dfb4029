use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use voucher_search::{QueryComponents, SearchStrategy};

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub components: QueryComponents,
    pub strategy: SearchStrategy,
    pub explanation: String,
}

/// `POST /api/analyze-query` — parser-only introspection, never fails.
pub async fn analyze_query_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    debug!(query = %request.query, "analyze_query_route: start");
    let (components, strategy, explanation) = state.search.analyze(&request.query);
    ApiResponse::success(AnalyzeResponse {
        components,
        strategy,
        explanation,
    })
    .into_response_with_status(StatusCode::OK)
}
