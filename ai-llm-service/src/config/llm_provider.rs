use serde::{Deserialize, Serialize};

/// Backend used for LLM inference and embeddings.
///
/// Extend this enum to add further providers; every variant must be handled
/// by the service cache in `service_profiles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local or remote Ollama runtime.
    Ollama,
    /// OpenAI-compatible HTTP API.
    OpenAi,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::OpenAi => write!(f, "openai"),
        }
    }
}
