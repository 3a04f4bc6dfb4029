//! Runtime configuration for the retrieval pipeline.

use crate::errors::SearchError;

/// Index-time weights used to build the combined embedding.
///
/// Changing these requires re-indexing every voucher; they are the single
/// point of tuning for the combined vector.
#[derive(Clone, Copy, Debug)]
pub struct FieldWeights {
    pub content: f32,
    pub name: f32,
    pub location: f32,
    pub service: f32,
    pub target: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            content: 0.40,
            name: 0.25,
            location: 0.15,
            service: 0.10,
            target: 0.10,
        }
    }
}

/// Query-time additive deltas applied on top of [`FieldWeights`] when the
/// parsed query carries the corresponding signal. Documentation aid only:
/// the dense score comes from the single field chosen by the retrieval
/// engine, not from a re-weighted sum.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveDeltas {
    pub location: f32,
    pub service: f32,
    pub target: f32,
}

impl Default for AdaptiveDeltas {
    fn default() -> Self {
        Self {
            location: 0.20,
            service: 0.15,
            target: 0.10,
        }
    }
}

/// Configuration for retrieval, ranking and RAG composition.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Dimensionality of every stored vector.
    pub embedding_dimension: usize,
    /// Token budget for the RAG context block.
    pub max_context_tokens: usize,
    /// Sampling temperature forwarded to the generator.
    pub generator_temperature: f32,
    /// Lexical score saturation point for [0,1] normalization.
    pub lexical_saturation: f32,
    /// Candidate over-fetch: `k' = min(top_k * over_fetch_multiplier, hard_cap)`.
    pub over_fetch_multiplier: usize,
    /// Absolute cap on candidates fetched from the index.
    pub hard_cap: usize,
    /// Maximum in-flight RAG generations per process.
    pub rag_concurrency_limit: usize,
    /// Bounded wait queue behind the RAG gate; beyond this, `Overloaded`.
    pub rag_queue_depth: usize,
    /// Index-time combined-embedding weights.
    pub index_time_field_weights: FieldWeights,
    /// Query-time adaptive deltas.
    pub query_time_adaptive_deltas: AdaptiveDeltas,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 768,
            max_context_tokens: 4000,
            generator_temperature: 0.3,
            lexical_saturation: 20.0,
            over_fetch_multiplier: 3,
            hard_cap: 50,
            rag_concurrency_limit: 8,
            rag_queue_depth: 16,
            index_time_field_weights: FieldWeights::default(),
            query_time_adaptive_deltas: AdaptiveDeltas::default(),
        }
    }
}

impl SearchConfig {
    /// Validates config values.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.embedding_dimension == 0 {
            return Err(SearchError::Config("embedding_dimension must be > 0".into()));
        }
        if self.lexical_saturation <= 0.0 {
            return Err(SearchError::Config("lexical_saturation must be > 0".into()));
        }
        if self.over_fetch_multiplier == 0 {
            return Err(SearchError::Config("over_fetch_multiplier must be > 0".into()));
        }
        if self.hard_cap == 0 {
            return Err(SearchError::Config("hard_cap must be > 0".into()));
        }
        if self.rag_concurrency_limit == 0 {
            return Err(SearchError::Config("rag_concurrency_limit must be > 0".into()));
        }
        let w = &self.index_time_field_weights;
        for (name, v) in [
            ("content", w.content),
            ("name", w.name),
            ("location", w.location),
            ("service", w.service),
            ("target", w.target),
        ] {
            if !(v > 0.0) {
                return Err(SearchError::Config(format!(
                    "index-time weight for {name} must be > 0"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_dimension_rejected() {
        let cfg = SearchConfig {
            embedding_dimension: 0,
            ..SearchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
