//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for search and ingestion operations.
///
/// Every variant maps to a stable machine-readable code via [`SearchError::code`],
/// which the HTTP layer exposes verbatim.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed request: empty/too-short query, invalid `top_k`, unknown filter value.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Embedding provider failed or timed out.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Index engine failed; fatal for the request.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// RAG generator failed or timed out.
    #[error("generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// Overall request deadline reached before results could be assembled.
    #[error("deadline exceeded in {component}")]
    DeadlineExceeded { component: &'static str },

    /// RAG concurrency cap reached and no capacity left to queue.
    #[error("generation capacity exhausted")]
    Overloaded,

    /// Ingestion write rejected: the document violates a store invariant.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Stable machine-readable code, suitable for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::BadRequest(_) => "BAD_REQUEST",
            SearchError::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            SearchError::IndexUnavailable(_) => "INDEX_UNAVAILABLE",
            SearchError::GeneratorUnavailable(_) => "GENERATOR_UNAVAILABLE",
            SearchError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            SearchError::Overloaded => "OVERLOADED",
            SearchError::InvalidDocument(_) => "INVALID_DOCUMENT",
            SearchError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Name of the pipeline component that produced the error, for response metadata.
    pub fn component(&self) -> &'static str {
        match self {
            SearchError::BadRequest(_) | SearchError::Config(_) => "facade",
            SearchError::EmbeddingUnavailable(_) => "embedding_provider",
            SearchError::IndexUnavailable(_) => "index",
            SearchError::GeneratorUnavailable(_) => "generator",
            SearchError::DeadlineExceeded { component } => component,
            SearchError::Overloaded => "rag_gate",
            SearchError::InvalidDocument(_) => "ingest",
        }
    }
}
