//! Hybrid retrieval engine.
//!
//! Executes one over-fetched hybrid query against the multi-field index
//! under intent-adaptive field selection, then normalizes the heterogeneous
//! engine scores to [0,1] candidates for the geographic re-ranker.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::SearchConfig;
use crate::errors::SearchError;
use crate::index::{DenseField, IndexHit, IndexQuery, SearchIndex, TermFilter};
use crate::record::{
    Candidate, FilterClause, QueryComponents, QueryIntent, RankingFactor, SearchMethod,
    SearchResult, SearchStrategy, WeightReport,
};

/// Max characters kept in a result snippet.
const SNIPPET_CHARS: usize = 160;

/// Retrieval output: normalized candidates plus the strategy report.
pub struct RetrievalOutcome {
    pub candidates: Vec<Candidate>,
    pub strategy: SearchStrategy,
}

/// Executes hybrid and pure-vector queries for the façade.
pub struct RetrievalEngine {
    cfg: SearchConfig,
    index: Arc<dyn SearchIndex>,
}

impl RetrievalEngine {
    pub fn new(cfg: SearchConfig, index: Arc<dyn SearchIndex>) -> Self {
        Self { cfg, index }
    }

    /// Chooses the dense field the query vector is scored against.
    ///
    /// `find_kids` and `general` queries keep the combined space; a resolved
    /// location with no service cue focuses the location axis; service
    /// requirements focus the service axis.
    pub fn select_field(&self, components: &QueryComponents) -> DenseField {
        match components.intent {
            QueryIntent::FindKids | QueryIntent::General => DenseField::Combined,
            _ if components.location.is_some() && components.service_requirements.is_empty() => {
                DenseField::Location
            }
            _ if !components.service_requirements.is_empty() => DenseField::Service,
            _ => DenseField::Combined,
        }
    }

    /// Strategy report for a parse without running the query, for the
    /// analyze surface.
    pub fn strategy_for(
        &self,
        components: &QueryComponents,
        filters: &[TermFilter],
    ) -> SearchStrategy {
        let field = self.select_field(components);
        self.build_strategy(components, field, filters)
    }

    /// Runs one retrieval round-trip.
    ///
    /// `lexical` toggles the lexical should-clause (off in pure-vector
    /// mode). The query vector is produced by the caller so embedding can
    /// overlap with parsing.
    ///
    /// # Errors
    /// `SearchError::IndexUnavailable` when the engine fails; an empty
    /// candidate list is not an error.
    pub async fn retrieve(
        &self,
        components: &QueryComponents,
        query_vector: Vec<f32>,
        top_k: usize,
        filters: Vec<TermFilter>,
        lexical: bool,
    ) -> Result<RetrievalOutcome, SearchError> {
        let field = if lexical {
            self.select_field(components)
        } else {
            DenseField::Combined
        };
        let strategy = self.build_strategy(components, field, &filters);

        let size = (top_k * self.cfg.over_fetch_multiplier).min(self.cfg.hard_cap);
        let query = IndexQuery {
            lexical_text: lexical.then(|| components.normalized.clone()),
            vector: query_vector,
            field,
            filters,
            size,
        };

        trace!(field = field.as_str(), size, lexical, "dispatching index query");
        let hits = self.index.search(&query).await?;
        debug!(hits = hits.len(), "index round-trip complete");

        let candidates = hits
            .into_iter()
            .map(|hit| self.normalize_hit(hit))
            .collect();

        Ok(RetrievalOutcome {
            candidates,
            strategy,
        })
    }

    /// Splits the engine's composite score back into its dense and lexical
    /// parts and normalizes each to [0,1]; the pre-boost similarity is the
    /// larger of the two. Raw scores on different scales are never compared
    /// directly.
    fn normalize_hit(&self, hit: IndexHit) -> Candidate {
        let (similarity, dense_similarity) = match hit.dense_cosine {
            Some(cos) => {
                let dense_norm = ((cos + 1.0) / 2.0).clamp(0.0, 1.0);
                let lexical_raw = (hit.score - (cos + 1.0)).max(0.0);
                let lexical_norm = (lexical_raw / self.cfg.lexical_saturation).min(1.0);
                (dense_norm.max(lexical_norm), dense_norm)
            }
            None => {
                let lexical_norm = (hit.score / self.cfg.lexical_saturation).min(1.0);
                (lexical_norm, 0.0)
            }
        };

        let data_quality = hit.payload.data_quality_score;
        let content = hit.payload.content;
        let result = SearchResult {
            voucher_id: hit.payload.id,
            voucher_name: hit.payload.name,
            content_snippet: snippet(&content),
            location: hit.payload.location,
            service_info: hit.payload.service_info,
            price_info: hit.payload.price_info,
            target_audience: hit.payload.target_audience,
            similarity_score: similarity,
            raw_score: similarity,
            ranking_factor: RankingFactor::SemanticMatch,
            search_method: SearchMethod::AdvancedMultiField,
        };
        Candidate {
            result,
            content,
            dense_similarity,
            data_quality,
        }
    }

    /// Strategy report: the chosen field plus the adaptive weight deltas the
    /// query earned. The re-normalized weights are explanatory only.
    fn build_strategy(
        &self,
        components: &QueryComponents,
        field: DenseField,
        filters: &[TermFilter],
    ) -> SearchStrategy {
        let base = self.cfg.index_time_field_weights;
        let deltas = self.cfg.query_time_adaptive_deltas;
        let mut weights = WeightReport {
            content: base.content,
            name: base.name,
            location: base.location,
            service: base.service,
            target: base.target,
        };
        let mut boosts = Vec::new();
        if components.location.is_some() {
            weights.location += deltas.location;
            boosts.push(format!("location:+{:.2}", deltas.location));
        }
        if !components.service_requirements.is_empty() {
            weights.service += deltas.service;
            boosts.push(format!("service:+{:.2}", deltas.service));
        }
        if components.target_audience.is_some() {
            weights.target += deltas.target;
            boosts.push(format!("target:+{:.2}", deltas.target));
        }

        SearchStrategy {
            primary_field: field.as_str().to_string(),
            adaptive_weights: weights,
            boosts,
            filters: filters
                .iter()
                .map(|f| FilterClause {
                    field: f.field.clone(),
                    value: f.value.to_string(),
                })
                .collect(),
        }
    }
}

/// Char-safe content excerpt.
fn snippet(content: &str) -> String {
    if content.chars().count() <= SNIPPET_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(SNIPPET_CHARS).collect();
    format!("{}…", cut.trim_end())
}
