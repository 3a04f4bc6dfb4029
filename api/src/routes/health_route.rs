use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;
use tracing::warn;
use voucher_search::SearchError;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Serialize)]
pub struct HealthResponse {
    pub index_ok: bool,
    pub voucher_count: Option<usize>,
    pub llm: Vec<ai_llm_service::HealthStatus>,
}

/// `GET /health` — index and LLM snapshot; degraded components flip flags
/// instead of failing the route.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let (index_ok, voucher_count) = match state.search.voucher_count().await {
        Ok(n) => (true, Some(n)),
        Err(err @ SearchError::IndexUnavailable(_)) => {
            warn!(error = %err, "health_route: index probe failed");
            (false, None)
        }
        Err(err) => {
            warn!(error = %err, "health_route: unexpected probe error");
            (false, None)
        }
    };

    let llm = match &state.llm {
        Some(svc) => svc.health_all().await,
        None => Vec::new(),
    };

    let body = HealthResponse {
        index_ok,
        voucher_count,
        llm,
    };
    let status = if body.index_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::success(body).into_response_with_status(status)
}
