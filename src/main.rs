use std::{str::FromStr, sync::Arc};

use ai_llm_service::{config::default_config, service_profiles::LlmServiceProfiles};
use anyhow::Result;
use tracing::{Level, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::{Directive, Targets},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use voucher_search::{
    ElasticConfig, ElasticFacade, EmbeddingsProvider, HashingEmbedder, LlmEmbedder, LlmGenerator,
    LocationRegistry, MemoryIndex, SearchConfig, SearchIndex, SearchService, TextGenerator,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env for local runs.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = search_config_from_env();
    let registry = Arc::new(LocationRegistry::vietnam());

    // LLM profiles are optional: without them the service runs on the
    // deterministic offline embedder and the templated rag fallback.
    let (embedder, generator, llm): (
        Arc<dyn EmbeddingsProvider>,
        Option<Arc<dyn TextGenerator>>,
        Option<Arc<LlmServiceProfiles>>,
    ) = match build_llm_profiles(&cfg) {
        Ok(svc) => {
            let svc = Arc::new(svc);
            for status in svc.health_all().await {
                info!(
                    provider = %status.provider,
                    ok = status.ok,
                    message = %status.message,
                    "llm health"
                );
            }
            (
                Arc::new(LlmEmbedder::new(svc.clone(), cfg.embedding_dimension)),
                Some(Arc::new(LlmGenerator::new(svc.clone()))),
                Some(svc),
            )
        }
        Err(err) => {
            warn!(error = %err, "no llm profiles configured; running offline");
            (
                Arc::new(HashingEmbedder::new(cfg.embedding_dimension)),
                None,
                None,
            )
        }
    };

    let index: Arc<dyn SearchIndex> = match std::env::var("ELASTICSEARCH_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let index_name = std::env::var("ELASTICSEARCH_INDEX")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "voucher_knowledge".to_string());
            info!(url = %url, index = %index_name, "using elasticsearch backend");
            Arc::new(ElasticFacade::new(&ElasticConfig::new_default(
                url,
                index_name,
                cfg.embedding_dimension,
            ))?)
        }
        _ => {
            info!("ELASTICSEARCH_URL not set; using in-memory backend");
            Arc::new(MemoryIndex::new())
        }
    };

    let service = SearchService::new(cfg, registry, index, embedder, generator)?;
    service.ensure_ready().await?;

    api::start(api::AppState::new(Arc::new(service), llm)).await?;
    Ok(())
}

/// Builds the generator+embedding profiles strictly from env, applying the
/// configured sampling temperature to the generator.
fn build_llm_profiles(
    cfg: &SearchConfig,
) -> Result<LlmServiceProfiles, ai_llm_service::AiLlmError> {
    let mut generator = default_config::config_generator()?;
    generator.temperature = Some(cfg.generator_temperature);
    let embedding = default_config::config_embedding()?;
    LlmServiceProfiles::new(generator, embedding, Some(10))
}

/// Recognized config overrides, all optional.
fn search_config_from_env() -> SearchConfig {
    let mut cfg = SearchConfig::default();
    if let Some(v) = env_parse::<usize>("EMBEDDING_DIMENSION") {
        cfg.embedding_dimension = v;
    }
    if let Some(v) = env_parse::<usize>("MAX_CONTEXT_TOKENS") {
        cfg.max_context_tokens = v;
    }
    if let Some(v) = env_parse::<f32>("GENERATOR_TEMPERATURE") {
        cfg.generator_temperature = v;
    }
    if let Some(v) = env_parse::<f32>("LEXICAL_SATURATION") {
        cfg.lexical_saturation = v;
    }
    if let Some(v) = env_parse::<usize>("OVER_FETCH_MULTIPLIER") {
        cfg.over_fetch_multiplier = v;
    }
    if let Some(v) = env_parse::<usize>("HARD_CAP") {
        cfg.hard_cap = v;
    }
    if let Some(v) = env_parse::<usize>("RAG_CONCURRENCY_LIMIT") {
        cfg.rag_concurrency_limit = v;
    }
    cfg
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

fn init_tracing() {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let filter = base.add_directive(
        Directive::from_str("voucher_search=debug").expect("valid level directive"),
    );

    let fmt_all = fmt::layer();

    let ai_layer = ai_llm_service::telemetry::layer::<_>()
        .with_filter(Targets::new().with_target("ai_llm_service", Level::DEBUG));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_all)
        .with(ai_layer)
        .init();
}
