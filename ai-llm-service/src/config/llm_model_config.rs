use crate::config::llm_provider::LlmProvider;

/// Configuration of one model invocation target.
///
/// Carries both general parameters and provider-specific ones; equality is
/// used to dedupe health checks and cache HTTP clients.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// Backend the config targets.
    pub provider: LlmProvider,

    /// Model identifier, e.g. `"qwen3:14b"` or `"gpt-4o-mini"`.
    pub model: String,

    /// Inference endpoint base URL.
    pub endpoint: String,

    /// API key for providers that require authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff.
    pub top_p: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}
