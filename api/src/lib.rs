//! HTTP surface for the voucher discovery engine.

use std::{env, sync::Arc};

mod core;
mod error_handler;
mod routes;

use axum::{
    Router,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tokio::signal;
use tracing::info;

pub use crate::core::app_state::AppState;
use crate::{
    error_handler::{AppError, AppResult},
    routes::{
        analyze_route::analyze_query_route, health_route::health_route,
        search_route::search_route,
        voucher_routes::{delete_voucher_route, upsert_voucher_route},
    },
};

/// Binds `API_ADDRESS` and serves until ctrl-c.
pub async fn start(state: AppState) -> AppResult<()> {
    // Strict env read with explicit error
    let host_url = env::var("API_ADDRESS").map_err(|_| AppError::MissingEnv("API_ADDRESS"))?;

    let shared_state = Arc::new(state);

    let app = Router::new()
        .route("/api/search", post(search_route))
        .route("/api/vouchers", post(upsert_voucher_route))
        .route("/api/vouchers/{id}", delete(delete_voucher_route))
        .route("/api/analyze-query", post(analyze_query_route))
        .route("/health", get(health_route))
        .fallback(handler_404) // unified 404
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Graceful shutdown on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        // If even listening for Ctrl+C fails, just log to stderr.
        eprintln!("failed to listen for shutdown signal: {e}");
    }
}

/// Fallback handler for unmatched routes.
async fn handler_404() -> impl IntoResponse {
    AppError::NotFound
}
