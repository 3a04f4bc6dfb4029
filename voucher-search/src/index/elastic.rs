//! Thin adapter around the Elasticsearch HTTP API to isolate engine usage.
//!
//! All engine interaction is concentrated behind [`ElasticFacade`] so the
//! rest of the crate never sees a raw query body. The hybrid query shape:
//! a `bool` with two `should` clauses — `multi_match` best_fields over
//! `name^3`/`content^1` with AUTO fuzziness (clause boost 3.0) OR a
//! `script_score` cosine on the selected dense field (+1.0, boost 1.0) —
//! plus exact `term` filters. The raw per-document cosine is echoed back
//! through `script_fields` so score normalization can split the
//! heterogeneous total downstream.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::errors::SearchError;
use crate::index::document::VoucherDocument;
use crate::index::{IndexFuture, IndexHit, IndexQuery, SearchIndex};

/// Configuration for the Elasticsearch backend.
#[derive(Clone, Debug)]
pub struct ElasticConfig {
    /// Node base URL, e.g. `http://localhost:9200`.
    pub url: String,
    /// Target index name.
    pub index: String,
    /// Optional API key (`Authorization: ApiKey ...`).
    pub api_key: Option<String>,
    /// Vector dimensionality declared in the mapping.
    pub embedding_dimension: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ElasticConfig {
    pub fn new_default(url: impl Into<String>, index: impl Into<String>, dimension: usize) -> Self {
        Self {
            url: url.into(),
            index: index.into(),
            api_key: None,
            embedding_dimension: dimension,
            timeout_secs: 30,
        }
    }

    fn validate(&self) -> Result<(), SearchError> {
        let url = self.url.trim();
        if url.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SearchError::Config(format!(
                "elasticsearch url must be http(s), got '{}'",
                self.url
            )));
        }
        if self.index.trim().is_empty() {
            return Err(SearchError::Config("elasticsearch index is empty".into()));
        }
        Ok(())
    }
}

/// Minimal facade over the Elasticsearch JSON API.
pub struct ElasticFacade {
    client: reqwest::Client,
    base: String,
    index: String,
    api_key: Option<String>,
    dimension: usize,
}

impl ElasticFacade {
    /// Builds the facade and its HTTP client.
    ///
    /// # Errors
    /// `SearchError::Config` for an invalid configuration,
    /// `SearchError::IndexUnavailable` when the client cannot be built.
    pub fn new(cfg: &ElasticConfig) -> Result<Self, SearchError> {
        cfg.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base: cfg.url.trim_end_matches('/').to_string(),
            index: cfg.index.clone(),
            api_key: cfg.api_key.clone(),
            dimension: cfg.embedding_dimension,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, format!("{}{path}", self.base));
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("ApiKey {key}"));
        }
        req
    }

    async fn expect_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, SearchError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(240).collect();
        Err(SearchError::IndexUnavailable(format!(
            "{context}: HTTP {status}: {snippet}"
        )))
    }

    /// Index mapping: analyzed lexical fields, keyword metadata, five dense
    /// vector fields of the configured dimension.
    fn mapping(&self) -> Value {
        let dense = || json!({ "type": "dense_vector", "dims": self.dimension });
        json!({
            "settings": {
                "analysis": {
                    "analyzer": {
                        "vietnamese": {
                            "tokenizer": "standard",
                            "filter": ["lowercase", "asciifolding", "stop"]
                        }
                    }
                },
                "number_of_shards": 1,
                "number_of_replicas": 0
            },
            "mappings": {
                "properties": {
                    "id": { "type": "keyword" },
                    "name": {
                        "type": "text",
                        "analyzer": "vietnamese",
                        "fields": { "keyword": { "type": "keyword" } }
                    },
                    "content": { "type": "text", "analyzer": "vietnamese" },
                    "location": { "type": "keyword" },
                    "district": { "type": "keyword" },
                    "region": { "type": "keyword" },
                    "service_info": {
                        "properties": {
                            "category": { "type": "keyword" },
                            "subcategory": { "type": "keyword" },
                            "tags": { "type": "keyword" },
                            "has_kids_area": { "type": "boolean" },
                            "restaurant_type": { "type": "keyword" }
                        }
                    },
                    "price_info": {
                        "properties": {
                            "price": { "type": "long" },
                            "price_range": { "type": "keyword" },
                            "currency": { "type": "keyword" }
                        }
                    },
                    "target_audience": { "type": "keyword" },
                    "data_quality_score": { "type": "float" },
                    "content_emb": dense(),
                    "location_emb": dense(),
                    "service_emb": dense(),
                    "target_emb": dense(),
                    "combined_emb": dense()
                }
            }
        })
    }

    fn build_query_body(&self, query: &IndexQuery) -> Value {
        let dense_clause = json!({
            "script_score": {
                "query": { "match_all": {} },
                "script": {
                    "source": format!(
                        "cosineSimilarity(params.query_vector, '{}') + 1.0",
                        query.field.as_str()
                    ),
                    "params": { "query_vector": query.vector }
                },
                "boost": 1.0
            }
        });

        let bool_query = match &query.lexical_text {
            Some(text) => json!({
                "bool": {
                    "should": [
                        {
                            "multi_match": {
                                "query": text,
                                "fields": ["name^3", "content^1"],
                                "type": "best_fields",
                                "fuzziness": "AUTO",
                                "boost": 3.0
                            }
                        },
                        dense_clause
                    ],
                    "minimum_should_match": 1,
                    "filter": filter_clauses(query)
                }
            }),
            None => json!({
                "bool": {
                    "must": [dense_clause],
                    "filter": filter_clauses(query)
                }
            }),
        };

        json!({
            "query": bool_query,
            "size": query.size,
            "_source": { "excludes": ["*_emb"] },
            "script_fields": {
                "dense_cosine": {
                    "script": {
                        "source": format!(
                            "cosineSimilarity(params.query_vector, '{}')",
                            query.field.as_str()
                        ),
                        "params": { "query_vector": query.vector }
                    }
                }
            }
        })
    }
}

fn filter_clauses(query: &IndexQuery) -> Vec<Value> {
    query
        .filters
        .iter()
        .map(|f| {
            let mut term = serde_json::Map::new();
            term.insert(f.field.clone(), f.value.clone());
            json!({ "term": term })
        })
        .collect()
}

impl SearchIndex for ElasticFacade {
    /// Creates the index with the full mapping when it does not exist.
    fn ensure_ready(&self) -> IndexFuture<'_, ()> {
        Box::pin(async move {
            let head = self
                .request(reqwest::Method::HEAD, &format!("/{}", self.index))
                .send()
                .await
                .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
            if head.status().is_success() {
                trace!(index = %self.index, "index already exists");
                return Ok(());
            }

            let resp = self
                .request(reqwest::Method::PUT, &format!("/{}", self.index))
                .json(&self.mapping())
                .send()
                .await
                .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
            Self::expect_success(resp, "create index").await?;
            debug!(index = %self.index, "index created");
            Ok(())
        })
    }

    fn upsert<'a>(&'a self, doc: &'a VoucherDocument) -> IndexFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/{}/_doc/{}?refresh=wait_for", self.index, doc.payload.id);
            let resp = self
                .request(reqwest::Method::PUT, &path)
                .json(doc)
                .send()
                .await
                .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
            Self::expect_success(resp, "upsert document").await?;
            trace!(id = %doc.payload.id, "document upserted");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> IndexFuture<'a, bool> {
        Box::pin(async move {
            let path = format!("/{}/_doc/{id}?refresh=wait_for", self.index);
            let resp = self
                .request(reqwest::Method::DELETE, &path)
                .send()
                .await
                .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(false);
            }
            Self::expect_success(resp, "delete document").await?;
            Ok(true)
        })
    }

    fn search<'a>(&'a self, query: &'a IndexQuery) -> IndexFuture<'a, Vec<IndexHit>> {
        Box::pin(async move {
            let body = self.build_query_body(query);
            trace!(field = query.field.as_str(), size = query.size, "submitting hybrid query");

            let resp = self
                .request(reqwest::Method::POST, &format!("/{}/_search", self.index))
                .json(&body)
                .send()
                .await
                .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
            let resp = Self::expect_success(resp, "search").await?;

            let parsed: SearchResponseBody = resp
                .json()
                .await
                .map_err(|e| SearchError::IndexUnavailable(format!("decode search response: {e}")))?;

            let mut out = Vec::with_capacity(parsed.hits.hits.len());
            for hit in parsed.hits.hits {
                let payload = serde_json::from_value(hit.source)
                    .map_err(|e| SearchError::IndexUnavailable(format!("decode payload: {e}")))?;
                let dense_cosine = hit
                    .fields
                    .as_ref()
                    .and_then(|f| f.dense_cosine.as_ref())
                    .and_then(|v| v.first())
                    .copied();
                out.push(IndexHit {
                    id: hit.id,
                    score: hit.score.unwrap_or(0.0),
                    dense_cosine,
                    payload,
                });
            }
            debug!(hits = out.len(), "search completed");
            Ok(out)
        })
    }

    fn count(&self) -> IndexFuture<'_, usize> {
        Box::pin(async move {
            let resp = self
                .request(reqwest::Method::GET, &format!("/{}/_count", self.index))
                .send()
                .await
                .map_err(|e| SearchError::IndexUnavailable(e.to_string()))?;
            let resp = Self::expect_success(resp, "count").await?;
            let parsed: CountResponseBody = resp
                .json()
                .await
                .map_err(|e| SearchError::IndexUnavailable(format!("decode count response: {e}")))?;
            Ok(parsed.count)
        })
    }
}

/* ===========================================================================
Response payloads
======================================================================== */

#[derive(Debug, serde::Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, serde::Deserialize)]
struct HitsEnvelope {
    hits: Vec<RawHit>,
}

#[derive(Debug, serde::Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Value,
    fields: Option<ScriptFields>,
}

#[derive(Debug, serde::Deserialize)]
struct ScriptFields {
    dense_cosine: Option<Vec<f32>>,
}

#[derive(Debug, serde::Deserialize)]
struct CountResponseBody {
    count: usize,
}
