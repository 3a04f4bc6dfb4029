//! Shared LLM service with two active profiles: `generator` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (endpoint+model+key+timeout),
//!   so repeated calls never rebuild a client.

use std::{collections::HashMap, sync::Arc, time::Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Service managing the generator and embedding profiles.
#[derive(Debug)]
pub struct LlmServiceProfiles {
    generator: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates the service from its two profile configs.
    ///
    /// `health_timeout_secs` bounds health probes (default 10s).
    pub fn new(
        generator: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        info!(
            generator.provider = %generator.provider,
            generator.model = %generator.model,
            generator.endpoint = %generator.endpoint,
            embedding.provider = %embedding.provider,
            embedding.model = %embedding.model,
            embedding.endpoint = %embedding.endpoint,
            "LlmServiceProfiles initialized"
        );

        Ok(Self {
            generator,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Generates text through the generator profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] when the provider call fails.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let out = match self.generator.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.generator).await?;
                cli.generate(prompt, system).await
            }
            LlmProvider::OpenAi => {
                let cli = self.get_or_init_openai(&self.generator).await?;
                cli.generate(prompt, system).await
            }
        };
        if out.is_ok() {
            info!(
                provider = %self.generator.provider,
                model = %self.generator.model,
                prompt_len = prompt.len(),
                latency_ms = started.elapsed().as_millis() as u64,
                "generation completed"
            );
        }
        out
    }

    /// Computes an embedding through the embedding profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] when the provider call fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        let out = match self.embedding.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.embedding).await?;
                cli.embeddings(input).await
            }
            LlmProvider::OpenAi => {
                let cli = self.get_or_init_openai(&self.embedding).await?;
                cli.embeddings(input).await
            }
        };
        if out.is_ok() {
            info!(
                provider = %self.embedding.provider,
                model = %self.embedding.model,
                input_len = input.len(),
                latency_ms = started.elapsed().as_millis() as u64,
                "embedding completed"
            );
        }
        out
    }

    /// Health snapshot for the distinct profiles; equal configs are probed
    /// once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = vec![self.generator.clone()];
        if self.embedding != self.generator {
            list.push(self.embedding.clone());
        }
        debug!(profiles = list.len(), "running health checks");
        self.health.check_many(&list).await
    }

    /// References to the current profiles `(generator, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.generator, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            debug!(model = %cfg.model, "ollama client cache hit");
            return Ok(cli);
        }

        debug!(model = %cfg.model, endpoint = %cfg.endpoint, "initializing ollama client");
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        let mut w = self.ollama.write().await;
        Ok(w.entry(key).or_insert(cli).clone())
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            debug!(model = %cfg.model, "openai client cache hit");
            return Ok(cli);
        }

        debug!(model = %cfg.model, endpoint = %cfg.endpoint, "initializing openai client");
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        let mut w = self.openai.write().await;
        Ok(w.entry(key).or_insert(cli).clone())
    }
}

/// Cache key identifying one unique client config. The api key takes part
/// in the key to isolate clients with different credentials; the key's
/// fields are never logged.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
