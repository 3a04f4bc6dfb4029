//! Canonical data models and public API types.

use serde::{Deserialize, Serialize};

/// High-level goal guessed by the query parser, drawn from a fixed set.
///
/// Variants are ordered by their snake_case names; intent-score ties break
/// toward the earlier variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    FindBeauty,
    FindEntertainment,
    FindHotel,
    FindKids,
    FindRestaurant,
    FindShopping,
    FindTravel,
    General,
}

impl QueryIntent {
    /// All intents that carry pattern sets, in tie-break order.
    pub const DETECTABLE: [QueryIntent; 7] = [
        QueryIntent::FindBeauty,
        QueryIntent::FindEntertainment,
        QueryIntent::FindHotel,
        QueryIntent::FindKids,
        QueryIntent::FindRestaurant,
        QueryIntent::FindShopping,
        QueryIntent::FindTravel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::FindBeauty => "find_beauty",
            QueryIntent::FindEntertainment => "find_entertainment",
            QueryIntent::FindHotel => "find_hotel",
            QueryIntent::FindKids => "find_kids",
            QueryIntent::FindRestaurant => "find_restaurant",
            QueryIntent::FindShopping => "find_shopping",
            QueryIntent::FindTravel => "find_travel",
            QueryIntent::General => "general",
        }
    }
}

/// Price bracket in VND.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "budget")]
    Budget,
    #[serde(rename = "mid-range")]
    MidRange,
    #[serde(rename = "premium")]
    Premium,
    #[serde(rename = "luxury")]
    Luxury,
    #[serde(rename = "unknown")]
    Unknown,
}

impl PriceRange {
    /// Bracket thresholds: budget < 100k, mid-range < 500k, premium < 1M,
    /// luxury above. Missing price maps to `Unknown`.
    pub fn from_price(price: Option<u64>) -> Self {
        match price {
            None => PriceRange::Unknown,
            Some(p) if p < 100_000 => PriceRange::Budget,
            Some(p) if p < 500_000 => PriceRange::MidRange,
            Some(p) if p < 1_000_000 => PriceRange::Premium,
            Some(_) => PriceRange::Luxury,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRange::Budget => "budget",
            PriceRange::MidRange => "mid-range",
            PriceRange::Premium => "premium",
            PriceRange::Luxury => "luxury",
            PriceRange::Unknown => "unknown",
        }
    }

    /// Parses a filter value; `Unknown` is not addressable by filters.
    pub fn parse_filter(value: &str) -> Option<Self> {
        match value {
            "budget" => Some(PriceRange::Budget),
            "mid-range" | "mid_range" => Some(PriceRange::MidRange),
            "premium" => Some(PriceRange::Premium),
            "luxury" => Some(PriceRange::Luxury),
            _ => None,
        }
    }
}

/// Service classification of a voucher.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Category, e.g. `Restaurant`, `Hotel`, `Beauty`.
    pub category: String,
    /// Cuisine or sub-type where known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Free-form service tags used by lexicon matching.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_kids_area: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_type: Option<String>,
}

/// Price block attached to results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    pub price_range: PriceRange,
    pub currency: String,
}

impl PriceInfo {
    pub fn from_price(price: Option<u64>) -> Self {
        Self {
            price,
            price_range: PriceRange::from_price(price),
            currency: "VND".to_string(),
        }
    }
}

/// Per-field embeddings carried by a voucher. `content` and `combined` are
/// mandatory for a voucher to be visible to retrieval.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoucherEmbeddings {
    #[serde(default)]
    pub content: Vec<f32>,
    #[serde(default)]
    pub combined: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<f32>>,
}

/// Stored voucher entity, produced by the ingestion collaborator and
/// consumed whole by this crate. Updates are whole-document replace-by-id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Voucher {
    /// Stable opaque id, unique across the index.
    pub id: String,
    pub name: String,
    pub content: String,
    /// Canonical location name or the literal `unknown`.
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub service: ServiceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(default)]
    pub embeddings: VoucherEmbeddings,
    /// Ingest-derived quality score in [0,1].
    #[serde(default)]
    pub data_quality_score: f32,
}

/// Parsed understanding of a single query. Transient, per-request.
#[derive(Clone, Debug, Serialize)]
pub struct QueryComponents {
    pub original: String,
    pub normalized: String,
    pub stripped: String,
    pub intent: QueryIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub service_requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_preference: Option<PriceRange>,
    pub keywords: Vec<String>,
    pub confidence: f32,
}

impl QueryComponents {
    /// Minimal components for vector-only mode: normalization, no parsing.
    pub fn bare(original: &str, normalized: String, stripped: String) -> Self {
        Self {
            original: original.to_string(),
            normalized,
            stripped,
            intent: QueryIntent::General,
            location: None,
            service_requirements: Vec::new(),
            target_audience: None,
            price_preference: None,
            keywords: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Which rule set produced a result's final rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingFactor {
    ExactLocationMatch,
    NearbyLocationMatch,
    RegionalMatch,
    SemanticMatch,
}

/// Which pipeline produced a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    VectorSearch,
    AdvancedMultiField,
    AdvancedRag,
    AdvancedRagFallback,
}

/// One ranked voucher in a response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub voucher_id: String,
    pub voucher_name: String,
    pub content_snippet: String,
    pub location: String,
    pub service_info: ServiceInfo,
    pub price_info: PriceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Final score in [0,1] after all re-ranking.
    pub similarity_score: f32,
    /// Pre-boost score in [0,1].
    pub raw_score: f32,
    pub ranking_factor: RankingFactor,
    pub search_method: SearchMethod,
}

/// Retrieval candidate: a result plus the re-rank inputs that do not belong
/// in the public payload.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub result: SearchResult,
    /// Full voucher content, for location-mention checks.
    pub content: String,
    /// Raw dense similarity in [0,1] (`(cosine+1)/2`), 0 when lexical-only.
    pub dense_similarity: f32,
    pub data_quality: f32,
}

/// Operating mode of the façade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Vector,
    #[default]
    Hybrid,
    Rag,
}

/// Symbolic metadata filters applied as exact terms.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
}

/// A search request as accepted by the façade.
#[derive(Clone, Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub strict_location: bool,
    #[serde(default)]
    pub min_score: f32,
    /// Overall request deadline in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    /// When the RAG gate is saturated, serve the request as hybrid instead
    /// of rejecting with `Overloaded`.
    #[serde(default)]
    pub degrade_on_overload: bool,
}

fn default_top_k() -> usize {
    10
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            query: query.into(),
            mode,
            top_k: default_top_k(),
            filters: SearchFilters::default(),
            strict_location: false,
            min_score: 0.0,
            deadline_ms: None,
            degrade_on_overload: false,
        }
    }
}

/// One exact-term filter clause recorded in the strategy report.
#[derive(Clone, Debug, Serialize)]
pub struct FilterClause {
    pub field: String,
    pub value: String,
}

/// Effective dense weights after query-time deltas, reported for
/// explainability.
#[derive(Clone, Debug, Serialize)]
pub struct WeightReport {
    pub content: f32,
    pub name: f32,
    pub location: f32,
    pub service: f32,
    pub target: f32,
}

/// How the retrieval engine attacked a query.
#[derive(Clone, Debug, Serialize)]
pub struct SearchStrategy {
    /// Dense field scored against, e.g. `combined_emb`.
    pub primary_field: String,
    pub adaptive_weights: WeightReport,
    /// Human-readable tags of applied query-time boosts.
    pub boosts: Vec<String>,
    pub filters: Vec<FilterClause>,
}

/// Mechanical explanations attached to hybrid and rag responses.
#[derive(Clone, Debug, Serialize)]
pub struct Explanations {
    pub query_parsing: String,
    pub geographic_ranking: String,
}

/// Response metadata block.
#[derive(Clone, Debug, Serialize)]
pub struct ResponseMetadata {
    pub total_results: usize,
    pub processing_time_ms: f64,
    pub search_method: SearchMethod,
    pub embedding_dimension: usize,
    /// Set when a rag request was served as hybrid due to backpressure.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Full façade response.
#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_components: Option<QueryComponents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_strategy: Option<SearchStrategy>,
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanations: Option<Explanations>,
    pub metadata: ResponseMetadata,
    /// RAG answer, present in rag mode (including the fallback path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}
