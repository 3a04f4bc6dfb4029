use std::sync::Arc;
use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode, response::Response};
use tracing::{debug, error};
use voucher_search::{SearchRequest, SearchResponse};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::search_status,
};

/// `POST /api/search` — the full pipeline behind one endpoint.
pub async fn search_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let started = Instant::now();
    debug!(
        query = %request.query,
        mode = ?request.mode,
        top_k = request.top_k,
        "search_route: start"
    );

    match state.search.search(request).await {
        Ok(response) => {
            debug!(
                results = response.metadata.total_results,
                method = ?response.metadata.search_method,
                "search_route: success"
            );
            ApiResponse::success(response).into_response_with_status(StatusCode::OK)
        }
        Err(err) => {
            error!(error = %err, "search_route: pipeline failed");
            let resp: ApiResponse<SearchResponse> = ApiResponse::error(
                err.code(),
                err.to_string(),
                err.component(),
                started.elapsed().as_secs_f64() * 1000.0,
            );
            resp.into_response_with_status(search_status(&err))
        }
    }
}
