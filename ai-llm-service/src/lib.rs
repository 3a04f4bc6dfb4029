//! Provider-agnostic LLM collaborator: text generation and embeddings over
//! Ollama or OpenAI-compatible HTTP APIs, with per-config client caching,
//! health probes, and a library-scoped tracing layer.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::AiLlmError;
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
