//! Multi-field index abstraction.
//!
//! The engine behind this seam must answer, in a single query, a lexical
//! best-fields clause over `name`/`content` OR-combined with a dense cosine
//! clause on one chosen vector field, under exact-term filters. Two
//! implementations ship: [`elastic::ElasticFacade`] for a live Elasticsearch
//! node and [`memory::MemoryIndex`] for tests and offline runs.

pub mod document;
pub mod elastic;
pub mod memory;

use std::{future::Future, pin::Pin};

use serde_json::Value;

use crate::errors::SearchError;
use document::{VoucherDocument, VoucherPayload};

/// Boxed future alias used across the trait.
pub type IndexFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SearchError>> + Send + 'a>>;

/// Dense vector field addressed by a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenseField {
    Content,
    Location,
    Service,
    Target,
    Combined,
}

impl DenseField {
    /// Field name in the index mapping.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenseField::Content => "content_emb",
            DenseField::Location => "location_emb",
            DenseField::Service => "service_emb",
            DenseField::Target => "target_emb",
            DenseField::Combined => "combined_emb",
        }
    }
}

/// Exact-term filter on a symbolic metadata field.
#[derive(Clone, Debug)]
pub struct TermFilter {
    pub field: String,
    pub value: Value,
}

impl TermFilter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One hybrid query as submitted to the engine.
#[derive(Clone, Debug)]
pub struct IndexQuery {
    /// Lexical best-fields text; absent in pure-vector mode.
    pub lexical_text: Option<String>,
    /// Query vector for the dense clause.
    pub vector: Vec<f32>,
    /// Dense field the vector is scored against.
    pub field: DenseField,
    /// Hard exact-term filters.
    pub filters: Vec<TermFilter>,
    /// Number of candidates to return (the over-fetched `k'`).
    pub size: usize,
}

/// One scored hit.
#[derive(Clone, Debug)]
pub struct IndexHit {
    pub id: String,
    /// Raw engine score (heterogeneous scale; normalized downstream).
    pub score: f32,
    /// Raw cosine of the dense clause for this document, when one ran.
    pub dense_cosine: Option<f32>,
    pub payload: VoucherPayload,
}

/// Searchable store holding voucher documents.
///
/// Writers replace whole documents atomically; last writer wins by id.
/// Readers never observe a partially written document.
pub trait SearchIndex: Send + Sync {
    /// Prepares the backing store (mapping/collection creation). Idempotent.
    fn ensure_ready(&self) -> IndexFuture<'_, ()>;

    /// Whole-document upsert keyed by id.
    fn upsert<'a>(&'a self, doc: &'a VoucherDocument) -> IndexFuture<'a, ()>;

    /// Deletes by id; returns whether a document was removed.
    fn delete<'a>(&'a self, id: &'a str) -> IndexFuture<'a, bool>;

    /// Executes one hybrid query. An empty result is not an error.
    fn search<'a>(&'a self, query: &'a IndexQuery) -> IndexFuture<'a, Vec<IndexHit>>;

    /// Number of stored documents.
    fn count(&self) -> IndexFuture<'_, usize>;
}
