//! Embedding provider seam and vector math helpers.
//!
//! The provider is an opaque collaborator: text in, unit vector of the
//! configured dimension out. Real deployments use the adapter over
//! `ai-llm-service`; tests and offline runs use the deterministic hashing
//! embedder.

use std::sync::Arc;
use std::{future::Future, pin::Pin};

use sha2::{Digest, Sha256};

use crate::errors::SearchError;
use crate::normalize::{normalize, strip_diacritics};

/// Asynchronous embedding provider.
///
/// Implementations must be thread-safe connection pools; callers never
/// assume per-connection affinity. Same input yields the same output within
/// a run.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, SearchError>> + Send + 'a>>;

    /// Dimensionality of produced vectors.
    fn dimension(&self) -> usize;
}

/// Scales a vector to unit L2 length. A zero vector is returned unchanged.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Cosine similarity between two equally sized vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

/// Deterministic feature-hashing embedder.
///
/// Tokenizes the diacritic-stripped normalized text and folds each token
/// into the vector through a SHA-256 bucket-and-sign scheme, then
/// unit-normalizes. Diacritic-insensitive by construction, which keeps the
/// retrieval pipeline exercisable without a model server.
#[derive(Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingsProvider for HashingEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, SearchError>> + Send + 'a>> {
        let dim = self.dim;
        let folded = strip_diacritics(&normalize(text));
        Box::pin(async move {
            let mut v = vec![0.0f32; dim];
            let mut any = false;
            for token in folded.split_whitespace() {
                let digest = Sha256::digest(token.as_bytes());
                let bucket = u64::from_be_bytes(
                    digest[..8].try_into().expect("digest has at least 8 bytes"),
                ) as usize
                    % dim;
                let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
                v[bucket] += sign;
                any = true;
            }
            if !any {
                // Empty text still yields a unit vector.
                v[0] = 1.0;
            }
            Ok(l2_normalize(v))
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Adapter over the `ai-llm-service` embedding profile.
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<ai_llm_service::service_profiles::LlmServiceProfiles>,
    dim: usize,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<ai_llm_service::service_profiles::LlmServiceProfiles>, dim: usize) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, SearchError>> + Send + 'a>> {
        Box::pin(async move {
            let v = self
                .svc
                .embed(text)
                .await
                .map_err(|e| SearchError::EmbeddingUnavailable(e.to_string()))?;
            if v.len() != self.dim {
                return Err(SearchError::EmbeddingUnavailable(format!(
                    "vector size mismatch: got {}, want {}",
                    v.len(),
                    self.dim
                )));
            }
            // Providers are expected to return unit vectors; normalize
            // defensively so cosine math stays in range.
            Ok(l2_normalize(v))
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic_and_unit_length() {
        let emb = HashingEmbedder::new(64);
        let a = emb.embed("buffet hải sản").await.unwrap();
        let b = emb.embed("buffet hải sản").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn hashing_embedder_folds_diacritics() {
        let emb = HashingEmbedder::new(64);
        let a = emb.embed("hải phòng").await.unwrap();
        let b = emb.embed("hai phong").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn related_texts_score_higher_than_unrelated() {
        let emb = HashingEmbedder::new(256);
        let q = emb.embed("buffet hải sản trẻ em").await.unwrap();
        let related = emb.embed("nhà hàng buffet hải sản cho trẻ em").await.unwrap();
        let unrelated = emb.embed("vé xem phim cuối tuần").await.unwrap();
        assert!(cosine(&q, &related) > cosine(&q, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_still_unit_vector() {
        let emb = HashingEmbedder::new(16);
        let v = emb.embed("").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
