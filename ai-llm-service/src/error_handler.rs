//! Unified error types for configuration and provider calls.

use thiserror::Error;

/// Convenient result alias for this crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/// Errors from environment-driven setup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (ports, limits, timeouts).
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND`.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

/// Which backend produced a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
}

/// Non-2xx response details.
#[derive(Debug)]
pub struct HttpError {
    pub status: reqwest::StatusCode,
    pub url: String,
    pub snippet: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} at {}: {}", self.status, self.url, self.snippet)
    }
}

/// What went wrong inside a provider call.
#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    #[error("config targets a different provider")]
    InvalidProvider,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("{0}")]
    HttpStatus(HttpError),

    #[error("decode failure: {0}")]
    Decode(String),
}

/// Provider error with its origin attached.
#[derive(Debug, Error)]
#[error("[AI LLM Service] {provider:?}: {kind}")]
pub struct ProviderError {
    pub provider: Provider,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: Provider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

/// Top-level error for this crate.
#[derive(Debug, Error)]
pub enum AiLlmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Client/network failures below the HTTP status level.
    #[error("[AI LLM Service] transport: {0}")]
    HttpTransport(#[from] reqwest::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> std::result::Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u32(name: &'static str) -> std::result::Result<Option<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u32>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u32",
                })
        }
        _ => Ok(None),
    }
}

/// Truncates a response body for error messages.
pub fn make_snippet(body: &str) -> String {
    body.chars().take(240).collect()
}
