//! Semantic voucher discovery: Vietnamese query understanding, hybrid
//! lexical+dense retrieval, geographic re-ranking, and RAG answers.
//!
//! [`SearchService`] is the single entry point recommended for application
//! code. It dispatches on the operating mode (`vector`, `hybrid`, `rag`),
//! orchestrates the pipeline components, and enforces the response
//! contract: deadlines, backpressure, score normalization, deterministic
//! ordering.

mod config;
mod embed;
mod errors;
mod index;
mod locations;
mod normalize;
mod parser;
mod rag;
mod record;
mod rerank;
mod retrieve;

pub use config::{AdaptiveDeltas, FieldWeights, SearchConfig};
pub use embed::{EmbeddingsProvider, HashingEmbedder, LlmEmbedder, cosine, l2_normalize};
pub use errors::SearchError;
pub use index::document::{
    UNKNOWN_LOCATION, VoucherDocument, VoucherPayload, combine_embeddings, embed_voucher,
};
pub use index::elastic::{ElasticConfig, ElasticFacade};
pub use index::memory::MemoryIndex;
pub use index::{DenseField, IndexHit, IndexQuery, SearchIndex, TermFilter};
pub use locations::{LocationEntry, LocationRegistry};
pub use normalize::{canonical_forms, strip_diacritics};
pub use parser::QueryParser;
pub use rag::{LlmGenerator, RagComposer, ResponseStyle, TextGenerator, estimate_tokens};
pub use record::*;
pub use rerank::GeoReRanker;
pub use retrieve::RetrievalEngine;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Single public entry point over the retrieval pipeline.
pub struct SearchService {
    cfg: SearchConfig,
    registry: Arc<LocationRegistry>,
    parser: QueryParser,
    engine: RetrievalEngine,
    reranker: GeoReRanker,
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn SearchIndex>,
    composer: Option<RagComposer>,
    /// In-flight generation gate: `rag_concurrency_limit` permits.
    rag_gate: Arc<Semaphore>,
    /// Gate plus bounded wait queue; no queue slot means `Overloaded`.
    rag_queue: Arc<Semaphore>,
}

impl SearchService {
    /// Wires the pipeline. The generator is optional; without one, rag
    /// requests are answered through the deterministic fallback path.
    ///
    /// # Errors
    /// `SearchError::Config` on invalid configuration or when the embedder
    /// dimension disagrees with the configured one.
    pub fn new(
        cfg: SearchConfig,
        registry: Arc<LocationRegistry>,
        index: Arc<dyn SearchIndex>,
        embedder: Arc<dyn EmbeddingsProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self, SearchError> {
        cfg.validate()?;
        if embedder.dimension() != cfg.embedding_dimension {
            return Err(SearchError::Config(format!(
                "embedder dimension {} does not match configured {}",
                embedder.dimension(),
                cfg.embedding_dimension
            )));
        }

        let parser = QueryParser::new(registry.clone());
        let engine = RetrievalEngine::new(cfg.clone(), index.clone());
        let reranker = GeoReRanker::new(registry.clone());
        let composer =
            generator.map(|g| RagComposer::new(g, cfg.max_context_tokens));

        info!(
            dimension = cfg.embedding_dimension,
            rag_limit = cfg.rag_concurrency_limit,
            "search service initialized"
        );

        Ok(Self {
            rag_gate: Arc::new(Semaphore::new(cfg.rag_concurrency_limit)),
            rag_queue: Arc::new(Semaphore::new(
                cfg.rag_concurrency_limit + cfg.rag_queue_depth,
            )),
            cfg,
            registry,
            parser,
            engine,
            reranker,
            embedder,
            index,
            composer,
        })
    }

    /// Prepares the backing index. Idempotent.
    pub async fn ensure_ready(&self) -> Result<(), SearchError> {
        self.index.ensure_ready().await
    }

    /// Executes one search request.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let deadline = request
            .deadline_ms
            .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));

        let (normalized, stripped) = normalize::canonical_forms(&request.query);
        if normalized.chars().count() < 2 {
            return Err(SearchError::BadRequest(
                "query must be at least 2 characters after normalization".into(),
            ));
        }
        if request.top_k == 0 || request.top_k > 50 {
            return Err(SearchError::BadRequest(format!(
                "top_k must be in 1..=50, got {}",
                request.top_k
            )));
        }
        if !(0.0..=1.0).contains(&request.min_score) {
            return Err(SearchError::BadRequest(format!(
                "min_score must be in [0,1], got {}",
                request.min_score
            )));
        }
        let (filters, filter_location) = self.validate_filters(&request.filters)?;

        match request.mode {
            SearchMode::Vector => {
                self.vector_search(&request, normalized, stripped, filters, started, deadline)
                    .await
            }
            SearchMode::Hybrid => {
                self.hybrid_search(
                    &request,
                    normalized,
                    filters,
                    filter_location,
                    started,
                    deadline,
                    false,
                )
                .await
            }
            SearchMode::Rag => {
                self.rag_search(
                    &request,
                    normalized,
                    filters,
                    filter_location,
                    started,
                    deadline,
                )
                .await
            }
        }
    }

    /// Parser-only analysis: components, derived strategy, explanation.
    pub fn analyze(&self, query: &str) -> (QueryComponents, SearchStrategy, String) {
        let components = self.parser.parse(query);
        let strategy = self.engine.strategy_for(&components, &[]);
        let explanation = self.parser.explain(&components);
        (components, strategy, explanation)
    }

    /// Whole-document voucher upsert; the document must already carry all
    /// vectors and is validated against the store invariants.
    pub async fn upsert_voucher(&self, voucher: &Voucher) -> Result<(), SearchError> {
        let doc = VoucherDocument::from_voucher(
            voucher,
            &self.registry,
            &self.cfg.index_time_field_weights,
            self.cfg.embedding_dimension,
        )?;
        self.index.upsert(&doc).await
    }

    /// Computes the per-field embeddings through the provider, rebuilds the
    /// combined vector, and upserts. For ingestion callers without
    /// precomputed vectors.
    pub async fn upsert_voucher_with_embeddings(
        &self,
        mut voucher: Voucher,
    ) -> Result<(), SearchError> {
        embed_voucher(
            &mut voucher,
            self.embedder.as_ref(),
            &self.cfg.index_time_field_weights,
        )
        .await?;
        self.upsert_voucher(&voucher).await
    }

    /// Deletes a voucher by id; the deletion is immediately visible.
    pub async fn delete_voucher(&self, id: &str) -> Result<bool, SearchError> {
        self.index.delete(id).await
    }

    /// Number of stored vouchers.
    pub async fn voucher_count(&self) -> Result<usize, SearchError> {
        self.index.count().await
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    /* --------------------- Mode pipelines --------------------- */

    async fn vector_search(
        &self,
        request: &SearchRequest,
        normalized: String,
        stripped: String,
        filters: Vec<TermFilter>,
        started: Instant,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<SearchResponse, SearchError> {
        // No parsing beyond normalization in this mode.
        let components = QueryComponents::bare(&request.query, normalized, stripped);

        let vector = with_deadline(
            deadline,
            "embedding_provider",
            self.embedder.embed(&components.normalized),
        )
        .await?;

        let outcome = with_deadline(
            deadline,
            "index",
            self.engine
                .retrieve(&components, vector, request.top_k, filters, false),
        )
        .await?;

        // No geographic re-ranking: scores pass through unboosted, so the
        // rule set degenerates to the deterministic sort and truncation.
        let mut results = self.reranker.rerank(
            outcome.candidates,
            &components,
            request.top_k,
            false,
            request.min_score,
        );
        for r in &mut results {
            r.search_method = SearchMethod::VectorSearch;
        }

        Ok(self.assemble_response(
            request,
            SearchMode::Vector,
            None,
            None,
            results,
            None,
            SearchMethod::VectorSearch,
            started,
            false,
            None,
            None,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    async fn hybrid_search(
        &self,
        request: &SearchRequest,
        normalized: String,
        filters: Vec<TermFilter>,
        filter_location: Option<String>,
        started: Instant,
        deadline: Option<tokio::time::Instant>,
        degraded: bool,
    ) -> Result<SearchResponse, SearchError> {
        let (components, results, strategy) = self
            .retrieve_and_rerank(request, &normalized, filters, filter_location, deadline)
            .await?;

        let mut results = results;
        for r in &mut results {
            r.search_method = SearchMethod::AdvancedMultiField;
        }

        let explanations = Explanations {
            query_parsing: self.parser.explain(&components),
            geographic_ranking: self.reranker.explain(&results, &components),
        };

        Ok(self.assemble_response(
            request,
            SearchMode::Hybrid,
            Some(components),
            Some(strategy),
            results,
            Some(explanations),
            SearchMethod::AdvancedMultiField,
            started,
            degraded,
            None,
            None,
        ))
    }

    async fn rag_search(
        &self,
        request: &SearchRequest,
        normalized: String,
        filters: Vec<TermFilter>,
        filter_location: Option<String>,
        started: Instant,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<SearchResponse, SearchError> {
        // Backpressure: take a queue slot without waiting, then wait
        // (deadline-bounded) for a generation permit.
        let _queue_permit = match self.rag_queue.try_acquire() {
            Ok(p) => p,
            Err(_) if request.degrade_on_overload => {
                warn!("rag gate saturated; serving request as hybrid");
                return self
                    .hybrid_search(
                        request,
                        normalized,
                        filters,
                        filter_location,
                        started,
                        deadline,
                        true,
                    )
                    .await;
            }
            Err(_) => return Err(SearchError::Overloaded),
        };
        let _gate_permit = match deadline {
            Some(d) => tokio::time::timeout_at(d, self.rag_gate.acquire())
                .await
                .map_err(|_| SearchError::DeadlineExceeded {
                    component: "rag_gate",
                })?,
            None => self.rag_gate.acquire().await,
        }
        .map_err(|_| SearchError::Overloaded)?;

        let (components, mut results, strategy) = self
            .retrieve_and_rerank(request, &normalized, filters, filter_location, deadline)
            .await?;

        let remaining = deadline.map(|d| {
            d.saturating_duration_since(tokio::time::Instant::now())
        });

        let outcome = match &self.composer {
            Some(composer) => composer.compose(&components, &results, remaining).await,
            None => {
                // No generator wired: the deterministic path is the product.
                debug!("no generator configured; composing fallback answer");
                RagComposer::fallback_outcome(&results)
            }
        };

        for r in &mut results {
            r.search_method = outcome.method;
        }
        let explanations = Explanations {
            query_parsing: self.parser.explain(&components),
            geographic_ranking: self.reranker.explain(&results, &components),
        };

        Ok(self.assemble_response(
            request,
            SearchMode::Rag,
            Some(components),
            Some(strategy),
            results,
            Some(explanations),
            outcome.method,
            started,
            false,
            Some(outcome.answer),
            Some(outcome.confidence),
        ))
    }

    /// Shared hybrid core: parse and embed concurrently, retrieve, re-rank.
    async fn retrieve_and_rerank(
        &self,
        request: &SearchRequest,
        normalized: &str,
        filters: Vec<TermFilter>,
        filter_location: Option<String>,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<(QueryComponents, Vec<SearchResult>, SearchStrategy), SearchError> {
        // The embedding call does not depend on the parse, so both run
        // concurrently within the request.
        let embed_fut = with_deadline(
            deadline,
            "embedding_provider",
            self.embedder.embed(normalized),
        );
        let parse_fut = async { self.parser.parse(&request.query) };
        let (vector, mut components) = tokio::join!(embed_fut, parse_fut);
        let vector = vector?;

        // A location filter stands in for an unresolved query location so
        // strict mode and the boost tiers see one consistent area.
        if components.location.is_none() {
            components.location = filter_location;
        }

        let outcome = with_deadline(
            deadline,
            "index",
            self.engine
                .retrieve(&components, vector, request.top_k, filters, true),
        )
        .await?;

        let results = self.reranker.rerank(
            outcome.candidates,
            &components,
            request.top_k,
            request.strict_location,
            request.min_score,
        );
        Ok((components, results, outcome.strategy))
    }

    /// Validates the filter bag and lowers it to exact-term clauses.
    fn validate_filters(
        &self,
        filters: &SearchFilters,
    ) -> Result<(Vec<TermFilter>, Option<String>), SearchError> {
        let mut clauses = Vec::new();
        let mut canonical_location = None;

        if let Some(loc) = &filters.location {
            let canonical = self.registry.resolve(loc).ok_or_else(|| {
                SearchError::BadRequest(format!("unknown location filter '{loc}'"))
            })?;
            clauses.push(TermFilter::new("location", canonical));
            canonical_location = Some(canonical.to_string());
        }
        if let Some(service) = &filters.service {
            if service.trim().is_empty() {
                return Err(SearchError::BadRequest("empty service filter".into()));
            }
            clauses.push(TermFilter::new("service_info.category", service.clone()));
        }
        if let Some(price) = &filters.price_range {
            let range = PriceRange::parse_filter(price).ok_or_else(|| {
                SearchError::BadRequest(format!("unknown price_range filter '{price}'"))
            })?;
            clauses.push(TermFilter::new("price_info.price_range", range.as_str()));
        }
        Ok((clauses, canonical_location))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_response(
        &self,
        request: &SearchRequest,
        mode: SearchMode,
        parsed_components: Option<QueryComponents>,
        search_strategy: Option<SearchStrategy>,
        results: Vec<SearchResult>,
        explanations: Option<Explanations>,
        search_method: SearchMethod,
        started: Instant,
        degraded: bool,
        answer: Option<String>,
        confidence: Option<f32>,
    ) -> SearchResponse {
        let metadata = ResponseMetadata {
            total_results: results.len(),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            search_method,
            embedding_dimension: self.cfg.embedding_dimension,
            degraded,
        };
        debug!(
            mode = ?mode,
            results = results.len(),
            elapsed_ms = metadata.processing_time_ms,
            "request complete"
        );
        SearchResponse {
            query: request.query.clone(),
            mode,
            parsed_components,
            search_strategy,
            results,
            explanations,
            metadata,
            answer,
            confidence,
        }
    }
}

/// Runs a fallible future under an optional deadline, mapping expiry to the
/// request-level error taxonomy.
async fn with_deadline<T>(
    deadline: Option<tokio::time::Instant>,
    component: &'static str,
    fut: impl std::future::Future<Output = Result<T, SearchError>>,
) -> Result<T, SearchError> {
    match deadline {
        Some(d) => match tokio::time::timeout_at(d, fut).await {
            Ok(out) => out,
            Err(_) => Err(SearchError::DeadlineExceeded { component }),
        },
        None => fut.await,
    }
}
