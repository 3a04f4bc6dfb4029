use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use voucher_search::SearchError;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    // --- IO / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("not found")]
    NotFound,

    /// Pipeline error carrying the search taxonomy.
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingEnv(_) => StatusCode::INTERNAL_SERVER_ERROR, // startup-only
            AppError::Bind(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Search(err) => search_status(err),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingEnv(_) => "MISSING_ENV",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::NotFound => "NOT_FOUND",
            AppError::Search(err) => err.code(),
        }
    }

    fn component(&self) -> &'static str {
        match self {
            AppError::Search(err) => err.component(),
            _ => "api",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    component: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
            component: self.component(),
        };
        (status, Json(body)).into_response()
    }
}

/// HTTP status for each variant of the search taxonomy.
pub fn search_status(err: &SearchError) -> StatusCode {
    match err {
        SearchError::BadRequest(_) => StatusCode::BAD_REQUEST,
        SearchError::InvalidDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SearchError::Overloaded => StatusCode::TOO_MANY_REQUESTS,
        SearchError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        SearchError::EmbeddingUnavailable(_)
        | SearchError::IndexUnavailable(_)
        | SearchError::GeneratorUnavailable(_) => StatusCode::BAD_GATEWAY,
        SearchError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Search(SearchError::BadRequest(err.to_string()))
    }
}
