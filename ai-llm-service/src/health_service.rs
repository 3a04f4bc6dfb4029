//! Health probes for the supported LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags` with a best-effort model check
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth
//!
//! [`HealthService::check`] is resilient: every failure is folded into a
//! `HealthStatus { ok: false, .. }` so a `/health` route never errors.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, make_snippet};

/// Serializable health snapshot for one provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: Option<String>,
    pub ok: bool,
    pub latency_ms: u64,
    pub message: String,
}

impl HealthStatus {
    fn of(cfg: &LlmModelConfig, ok: bool, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker reusing one HTTP client.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
}

impl HealthService {
    /// Creates the checker with an optional probe timeout (default 10s).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// One resilient health check; never returns an error.
    #[instrument(skip_all, fields(provider = %cfg.provider, endpoint = %cfg.endpoint))]
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return HealthStatus::of(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        let started = Instant::now();
        let result = match cfg.provider {
            LlmProvider::Ollama => self.probe_ollama(cfg).await,
            LlmProvider::OpenAi => self.probe_openai(cfg).await,
        };
        let latency = started.elapsed().as_millis() as u64;

        match result {
            Ok((ok, message)) => HealthStatus::of(cfg, ok, latency, message),
            Err(err) => HealthStatus::of(cfg, false, latency, err.to_string()),
        }
    }

    /// Checks several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    /// `GET /api/tags`, verifying the configured model is present when the
    /// payload lists models.
    async fn probe_ollama(&self, cfg: &LlmModelConfig) -> Result<(bool, String), AiLlmError> {
        let url = format!("{}/api/tags", cfg.endpoint.trim_end_matches('/'));
        debug!("GET {url}");
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Ok((false, format!("HTTP {status}: {}", make_snippet(&body))));
        }

        #[derive(serde::Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(serde::Deserialize)]
        struct Tags {
            models: Option<Vec<Tag>>,
        }

        match resp.json::<Tags>().await {
            Ok(Tags {
                models: Some(models),
            }) => {
                if models.iter().any(|m| m.name == cfg.model) {
                    Ok((true, "Ollama is healthy; model is available".into()))
                } else {
                    Ok((
                        false,
                        "Ollama is up, but model not found in /api/tags".into(),
                    ))
                }
            }
            Ok(Tags { models: None }) => Ok((
                true,
                "Ollama is healthy; tags response without `models` field".into(),
            )),
            Err(e) => Ok((
                true,
                format!("Ollama is reachable; failed to decode /api/tags: {e}"),
            )),
        }
    }

    /// `GET /v1/models` with Bearer auth, verifying the configured model is
    /// listed.
    async fn probe_openai(&self, cfg: &LlmModelConfig) -> Result<(bool, String), AiLlmError> {
        let url = format!("{}/v1/models", cfg.endpoint.trim_end_matches('/'));
        let Some(api_key) = cfg.api_key.as_deref() else {
            return Ok((false, "missing OpenAI API key".into()));
        };

        debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Ok((false, format!("HTTP {status}: {}", make_snippet(&body))));
        }

        #[derive(serde::Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(serde::Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        match resp.json::<Models>().await {
            Ok(models) => {
                if models.data.iter().any(|m| m.id == cfg.model) {
                    Ok((true, "OpenAI is healthy; model is available".into()))
                } else {
                    Ok((
                        false,
                        "OpenAI is up, but model not found in /v1/models".into(),
                    ))
                }
            }
            Err(e) => Ok((
                true,
                format!("OpenAI is reachable; failed to decode /v1/models: {e}"),
            )),
        }
    }
}
