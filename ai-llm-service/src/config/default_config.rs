//! LLM configs loaded strictly from environment variables.
//!
//! Two roles are wired for the voucher assistant:
//!
//! - **generator** → answer composition for RAG responses
//! - **embedding** → query and voucher vectorization
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = provider kind (`ollama` default, or `openai`)
//! - `LLM_MAX_TOKENS` = optional generation cap (u32)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (mandatory)
//! - `OLLAMA_MODEL` = generator model (mandatory)
//! - `EMBEDDING_MODEL` = embedding model (mandatory)
//!
//! OpenAI:
//! - `OPENAI_API_KEY` (mandatory)
//! - `OPENAI_MODEL`, `OPENAI_EMBEDDING_MODEL` (mandatory)
//! - `OPENAI_URL` (optional, defaults to the public API)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError, env_opt_u32, must_env},
};

/// Default generator sampling temperature.
const DEFAULT_GENERATOR_TEMPERATURE: f32 = 0.3;

/// Resolves the provider kind from `LLM_KIND` (default `ollama`).
pub fn provider_kind() -> Result<LlmProvider, AiLlmError> {
    match std::env::var("LLM_KIND") {
        Ok(v) if !v.trim().is_empty() => match v.trim().to_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAi),
            other => Err(ConfigError::UnsupportedProvider(other.to_string()).into()),
        },
        _ => Ok(LlmProvider::Ollama),
    }
}

/// Generator config for the configured provider.
pub fn config_generator() -> Result<LlmModelConfig, AiLlmError> {
    match provider_kind()? {
        LlmProvider::Ollama => config_ollama_generator(),
        LlmProvider::OpenAi => config_openai_generator(),
    }
}

/// Embedding config for the configured provider.
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    match provider_kind()? {
        LlmProvider::Ollama => config_ollama_embedding(),
        LlmProvider::OpenAi => config_openai_embedding(),
    }
}

/// Resolves the Ollama endpoint: `OLLAMA_URL` wins, else
/// `http://localhost:{OLLAMA_PORT}`.
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn config_ollama_generator() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens,
        temperature: Some(DEFAULT_GENERATOR_TEMPERATURE),
        top_p: None,
        timeout_secs: Some(60),
    })
}

fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}

fn openai_endpoint() -> String {
    std::env::var("OPENAI_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://api.openai.com".to_string())
}

fn config_openai_generator() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = must_env("OPENAI_MODEL")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAi,
        model,
        endpoint: openai_endpoint(),
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(DEFAULT_GENERATOR_TEMPERATURE),
        top_p: None,
        timeout_secs: Some(60),
    })
}

fn config_openai_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = must_env("OPENAI_EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAi,
        model,
        endpoint: openai_endpoint(),
        api_key: Some(api_key),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(30),
    })
}
