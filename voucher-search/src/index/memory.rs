//! In-process index backend.
//!
//! Reproduces the engine contract without a network dependency: BM25-style
//! idf lexical scoring with best-fields semantics over `name`/`content`,
//! dense cosine on the selected vector field, the same score composition as
//! the Elasticsearch facade, and exact-term filters. Tokens are
//! diacritic-folded on both sides, so lexical matching is accent-neutral.
//!
//! Writes replace whole documents under a write lock; readers take the read
//! lock for the duration of one query, so a search never observes a half
//! written document.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, trace};

use crate::embed::cosine;
use crate::errors::SearchError;
use crate::index::document::VoucherDocument;
use crate::index::{DenseField, IndexFuture, IndexHit, IndexQuery, SearchIndex, TermFilter};
use crate::normalize::{normalize, strip_diacritics};

/// Field boost of `name` in the lexical clause (`name^3`).
const NAME_FIELD_BOOST: f32 = 3.0;
/// Clause boost of the whole lexical should-branch.
const LEXICAL_CLAUSE_BOOST: f32 = 3.0;

/// In-memory voucher index.
#[derive(Default)]
pub struct MemoryIndex {
    docs: RwLock<BTreeMap<String, VoucherDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> SearchError {
        SearchError::IndexUnavailable("memory index lock poisoned".into())
    }
}

impl SearchIndex for MemoryIndex {
    fn ensure_ready(&self) -> IndexFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn upsert<'a>(&'a self, doc: &'a VoucherDocument) -> IndexFuture<'a, ()> {
        Box::pin(async move {
            let mut docs = self.docs.write().map_err(|_| Self::lock_poisoned())?;
            docs.insert(doc.payload.id.clone(), doc.clone());
            trace!(id = %doc.payload.id, total = docs.len(), "memory upsert");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> IndexFuture<'a, bool> {
        Box::pin(async move {
            let mut docs = self.docs.write().map_err(|_| Self::lock_poisoned())?;
            Ok(docs.remove(id).is_some())
        })
    }

    fn search<'a>(&'a self, query: &'a IndexQuery) -> IndexFuture<'a, Vec<IndexHit>> {
        Box::pin(async move {
            let docs = self.docs.read().map_err(|_| Self::lock_poisoned())?;
            let total_docs = docs.len();

            let query_tokens: Vec<String> = query
                .lexical_text
                .as_deref()
                .map(|t| {
                    let mut seen = HashSet::new();
                    tokens_of(t)
                        .into_iter()
                        .filter(|tok| seen.insert(tok.clone()))
                        .collect()
                })
                .unwrap_or_default();

            // Document frequency per query token, over name+content.
            let mut dfs = Vec::with_capacity(query_tokens.len());
            for token in &query_tokens {
                let df = docs
                    .values()
                    .filter(|d| {
                        tokens_of(&d.payload.name).contains(token)
                            || tokens_of(&d.payload.content).contains(token)
                    })
                    .count();
                dfs.push(df);
            }

            let mut hits = Vec::new();
            for doc in docs.values() {
                if !matches_filters(doc, &query.filters) {
                    continue;
                }

                let lexical = if query_tokens.is_empty() {
                    None
                } else {
                    let name_tokens = tokens_of(&doc.payload.name);
                    let content_tokens = tokens_of(&doc.payload.content);
                    let mut name_score = 0.0f32;
                    let mut content_score = 0.0f32;
                    for (token, df) in query_tokens.iter().zip(&dfs) {
                        if *df == 0 {
                            continue;
                        }
                        let idf = (1.0
                            + (total_docs as f32 - *df as f32 + 0.5) / (*df as f32 + 0.5))
                            .ln();
                        if name_tokens.contains(token) {
                            name_score += idf;
                        }
                        if content_tokens.contains(token) {
                            content_score += idf;
                        }
                    }
                    // best_fields: the better field wins, not the sum.
                    let best = (NAME_FIELD_BOOST * name_score).max(content_score);
                    (best > 0.0).then_some(LEXICAL_CLAUSE_BOOST * best)
                };

                let dense_vec = dense_vector(doc, query.field);
                let cos = cosine(&query.vector, dense_vec);
                let score = lexical.unwrap_or(0.0) + (cos + 1.0);

                hits.push(IndexHit {
                    id: doc.payload.id.clone(),
                    score,
                    dense_cosine: Some(cos),
                    payload: doc.payload.clone(),
                });
            }

            // Deterministic order: score desc, id asc.
            hits.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
            hits.truncate(query.size);

            debug!(
                hits = hits.len(),
                field = query.field.as_str(),
                lexical = query.lexical_text.is_some(),
                "memory search"
            );
            Ok(hits)
        })
    }

    fn count(&self) -> IndexFuture<'_, usize> {
        Box::pin(async move {
            let docs = self.docs.read().map_err(|_| Self::lock_poisoned())?;
            Ok(docs.len())
        })
    }
}

/// Folded tokens of a text field.
fn tokens_of(text: &str) -> HashSet<String> {
    strip_diacritics(&normalize(text))
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Dense vector for the chosen field; documents that do not carry the
/// optional field fall back to their combined vector.
fn dense_vector(doc: &VoucherDocument, field: DenseField) -> &[f32] {
    match field {
        DenseField::Content => &doc.content_emb,
        DenseField::Combined => &doc.combined_emb,
        DenseField::Location => doc.location_emb.as_deref().unwrap_or(&doc.combined_emb),
        DenseField::Service => doc.service_emb.as_deref().unwrap_or(&doc.combined_emb),
        DenseField::Target => doc.target_emb.as_deref().unwrap_or(&doc.combined_emb),
    }
}

/// Exact-term filter semantics over the payload, addressed by the same
/// dotted paths the Elasticsearch facade uses.
fn matches_filters(doc: &VoucherDocument, filters: &[TermFilter]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let Ok(payload) = serde_json::to_value(&doc.payload) else {
        return false;
    };
    filters.iter().all(|f| {
        let mut node = &payload;
        for part in f.field.split('.') {
            match node.get(part) {
                Some(next) => node = next,
                None => return false,
            }
        }
        match (node, &f.value) {
            (Value::Array(items), v) => items.contains(v),
            (a, b) => a == b,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldWeights;
    use crate::embed::{EmbeddingsProvider, HashingEmbedder};
    use crate::index::document::embed_voucher;
    use crate::locations::LocationRegistry;
    use crate::record::{ServiceInfo, Voucher, VoucherEmbeddings};

    async fn doc(id: &str, name: &str, content: &str, location: &str) -> VoucherDocument {
        let mut v = Voucher {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            location: location.into(),
            district: None,
            region: None,
            service: ServiceInfo {
                category: "Restaurant".into(),
                ..Default::default()
            },
            target_audience: None,
            price: Some(200_000),
            embeddings: VoucherEmbeddings::default(),
            data_quality_score: 0.5,
        };
        let weights = FieldWeights::default();
        embed_voucher(&mut v, &HashingEmbedder::new(64), &weights)
            .await
            .unwrap();
        VoucherDocument::from_voucher(&v, &LocationRegistry::vietnam(), &weights, 64).unwrap()
    }

    async fn query(text: &str, size: usize) -> IndexQuery {
        IndexQuery {
            lexical_text: Some(text.to_string()),
            vector: HashingEmbedder::new(64).embed(text).await.unwrap(),
            field: DenseField::Combined,
            filters: Vec::new(),
            size,
        }
    }

    #[tokio::test]
    async fn name_match_outscores_content_match() {
        let index = MemoryIndex::new();
        index
            .upsert(&doc("a", "Bellissimo Pizza", "nhà hàng ý", "Hà Nội").await)
            .await
            .unwrap();
        index
            .upsert(&doc("b", "Quán Ngon", "pizza bellissimo được nhắc đến", "Hà Nội").await)
            .await
            .unwrap();
        let hits = index.search(&query("bellissimo", 10).await).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn filters_are_hard() {
        let index = MemoryIndex::new();
        index
            .upsert(&doc("a", "Buffet A", "buffet ngon", "Hà Nội").await)
            .await
            .unwrap();
        index
            .upsert(&doc("b", "Buffet B", "buffet ngon", "Hải Phòng").await)
            .await
            .unwrap();
        let mut q = query("buffet", 10).await;
        q.filters.push(TermFilter::new("location", "Hải Phòng"));
        let hits = index.search(&q).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn upsert_replaces_whole_document() {
        let index = MemoryIndex::new();
        index
            .upsert(&doc("a", "Cũ", "nội dung cũ", "Hà Nội").await)
            .await
            .unwrap();
        index
            .upsert(&doc("a", "Mới", "nội dung mới", "Đà Nẵng").await)
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.search(&query("mới", 10).await).await.unwrap();
        assert_eq!(hits[0].payload.location, "Đà Nẵng");
    }

    #[tokio::test]
    async fn delete_reflected_immediately() {
        let index = MemoryIndex::new();
        index
            .upsert(&doc("a", "Buffet", "buffet", "Hà Nội").await)
            .await
            .unwrap();
        assert!(index.delete("a").await.unwrap());
        assert!(!index.delete("a").await.unwrap());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_index_returns_empty() {
        let index = MemoryIndex::new();
        let hits = index.search(&query("anything", 5).await).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn diacritic_free_query_matches_lexically() {
        let index = MemoryIndex::new();
        index
            .upsert(&doc("a", "Quán Ăn Hải Phòng", "hải sản tươi", "Hải Phòng").await)
            .await
            .unwrap();
        let accented = index.search(&query("hải sản", 5).await).await.unwrap();
        let plain = index.search(&query("hai san", 5).await).await.unwrap();
        assert_eq!(accented.len(), plain.len());
        assert_eq!(accented[0].id, plain[0].id);
    }
}
