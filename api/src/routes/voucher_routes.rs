use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use voucher_search::Voucher;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::search_status,
};

#[derive(Deserialize)]
pub struct VoucherUpsertRequest {
    pub voucher: Voucher,
}

#[derive(Serialize)]
pub struct VoucherUpsertResponse {
    pub id: String,
    /// Whether the service computed the embeddings itself.
    pub embedded: bool,
}

/// `POST /api/vouchers` — whole-document upsert.
///
/// When the caller ships no vectors, the per-field embeddings and the
/// combined vector are computed here before validation.
pub async fn upsert_voucher_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VoucherUpsertRequest>,
) -> Response {
    let started = Instant::now();
    let voucher = request.voucher;
    let id = voucher.id.clone();
    let needs_embeddings =
        voucher.embeddings.content.is_empty() || voucher.embeddings.combined.is_empty();
    debug!(id = %id, needs_embeddings, "upsert_voucher_route: start");

    let result = if needs_embeddings {
        state.search.upsert_voucher_with_embeddings(voucher).await
    } else {
        state.search.upsert_voucher(&voucher).await
    };

    match result {
        Ok(()) => {
            info!(id = %id, "voucher indexed");
            ApiResponse::success(VoucherUpsertResponse {
                id,
                embedded: needs_embeddings,
            })
            .into_response_with_status(StatusCode::OK)
        }
        Err(err) => {
            error!(id = %id, error = %err, "upsert_voucher_route: rejected");
            let resp: ApiResponse<VoucherUpsertResponse> = ApiResponse::error(
                err.code(),
                err.to_string(),
                err.component(),
                started.elapsed().as_secs_f64() * 1000.0,
            );
            resp.into_response_with_status(search_status(&err))
        }
    }
}

#[derive(Serialize)]
pub struct VoucherDeleteResponse {
    pub id: String,
    pub deleted: bool,
}

/// `DELETE /api/vouchers/{id}` — removal is immediately visible.
pub async fn delete_voucher_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    match state.search.delete_voucher(&id).await {
        Ok(deleted) => {
            debug!(id = %id, deleted, "delete_voucher_route: done");
            let status = if deleted {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            ApiResponse::success(VoucherDeleteResponse { id, deleted })
                .into_response_with_status(status)
        }
        Err(err) => {
            error!(id = %id, error = %err, "delete_voucher_route: failed");
            let resp: ApiResponse<VoucherDeleteResponse> = ApiResponse::error(
                err.code(),
                err.to_string(),
                err.component(),
                started.elapsed().as_secs_f64() * 1000.0,
            );
            resp.into_response_with_status(search_status(&err))
        }
    }
}
