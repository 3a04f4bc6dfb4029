//! Indexed document schema and write-time validation.
//!
//! A voucher becomes visible to retrieval only as a [`VoucherDocument`]:
//! scalar metadata plus five dense vectors. Validation enforces the store
//! invariants; a document that fails any of them is rejected whole
//! (`InvalidDocument`), never partially written.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::FieldWeights;
use crate::embed::{EmbeddingsProvider, l2_normalize};
use crate::errors::SearchError;
use crate::locations::LocationRegistry;
use crate::record::{PriceInfo, ServiceInfo, Voucher, VoucherEmbeddings};

/// Location sentinel for vouchers whose area could not be established.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Accepted deviation from unit length for stored vectors.
const UNIT_NORM_TOLERANCE: f32 = 1e-3;
/// Accepted per-component deviation when checking the combined vector
/// against the recomputed weighted sum (admits f64-computed ingest vectors).
const COMBINED_TOLERANCE: f32 = 1e-4;

/// Scalar part of an indexed voucher, returned as the search payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoucherPayload {
    pub id: String,
    pub name: String,
    pub content: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub service_info: ServiceInfo,
    pub price_info: PriceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub data_quality_score: f32,
}

/// Full indexed document: payload plus dense vectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoucherDocument {
    #[serde(flatten)]
    pub payload: VoucherPayload,
    pub content_emb: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_emb: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_emb: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_emb: Option<Vec<f32>>,
    pub combined_emb: Vec<f32>,
}

impl VoucherDocument {
    /// Validates a voucher against the store invariants and lowers it into
    /// the index schema.
    ///
    /// Checks, in order: identity fields present, mandatory vectors present
    /// with the right dimension, every present vector unit-length, location
    /// canonical (or `unknown`), and the combined vector consistent with the
    /// weighted sum of the present field vectors.
    ///
    /// # Errors
    /// `SearchError::InvalidDocument` naming the violated rule.
    pub fn from_voucher(
        voucher: &Voucher,
        registry: &LocationRegistry,
        weights: &FieldWeights,
        dimension: usize,
    ) -> Result<Self, SearchError> {
        if voucher.id.trim().is_empty() {
            return Err(SearchError::InvalidDocument("id is empty".into()));
        }
        if voucher.name.trim().is_empty() {
            return Err(SearchError::InvalidDocument("name is empty".into()));
        }

        let emb = &voucher.embeddings;
        check_vector("content", &emb.content, dimension)?;
        check_vector("combined", &emb.combined, dimension)?;
        for (name, v) in [
            ("name", &emb.name),
            ("location", &emb.location),
            ("service", &emb.service),
            ("target", &emb.target),
        ] {
            if let Some(v) = v {
                check_vector(name, v, dimension)?;
            }
        }

        if voucher.location != UNKNOWN_LOCATION && !registry.is_known(&voucher.location) {
            return Err(SearchError::InvalidDocument(format!(
                "location '{}' is not canonical",
                voucher.location
            )));
        }

        let expected = combine_embeddings(emb, weights);
        let drift = emb
            .combined
            .iter()
            .zip(&expected)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        if drift > COMBINED_TOLERANCE {
            return Err(SearchError::InvalidDocument(format!(
                "combined vector inconsistent with field vectors (max drift {drift:.6})"
            )));
        }

        let region = voucher
            .region
            .clone()
            .or_else(|| registry.region_of(&voucher.location).map(String::from));

        trace!(id = %voucher.id, "voucher lowered to index document");
        Ok(Self {
            payload: VoucherPayload {
                id: voucher.id.clone(),
                name: voucher.name.clone(),
                content: voucher.content.clone(),
                location: voucher.location.clone(),
                district: voucher.district.clone(),
                region,
                service_info: voucher.service.clone(),
                price_info: PriceInfo::from_price(voucher.price),
                target_audience: voucher.target_audience.clone(),
                data_quality_score: voucher.data_quality_score.clamp(0.0, 1.0),
            },
            content_emb: emb.content.clone(),
            location_emb: emb.location.clone(),
            service_emb: emb.service.clone(),
            target_emb: emb.target.clone(),
            combined_emb: emb.combined.clone(),
        })
    }
}

fn check_vector(name: &str, v: &[f32], dimension: usize) -> Result<(), SearchError> {
    if v.is_empty() {
        return Err(SearchError::InvalidDocument(format!(
            "missing {name} embedding"
        )));
    }
    if v.len() != dimension {
        return Err(SearchError::InvalidDocument(format!(
            "{name} embedding has dimension {}, want {dimension}",
            v.len()
        )));
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        return Err(SearchError::InvalidDocument(format!(
            "{name} embedding is not unit length (norm {norm:.4})"
        )));
    }
    Ok(())
}

/// Builds the combined vector: weighted sum of the present field vectors,
/// unit-normalized. Missing fields are skipped; the final normalization
/// absorbs the weight renormalization implicitly.
pub fn combine_embeddings(emb: &VoucherEmbeddings, weights: &FieldWeights) -> Vec<f32> {
    let dim = emb.content.len();
    let mut acc = vec![0.0f32; dim];
    let mut add = |v: &[f32], w: f32| {
        for (a, x) in acc.iter_mut().zip(v) {
            *a += w * x;
        }
    };
    add(&emb.content, weights.content);
    if let Some(v) = &emb.name {
        add(v, weights.name);
    }
    if let Some(v) = &emb.location {
        add(v, weights.location);
    }
    if let Some(v) = &emb.service {
        add(v, weights.service);
    }
    if let Some(v) = &emb.target {
        add(v, weights.target);
    }
    l2_normalize(acc)
}

/// Focused embedding texts per semantic axis, mirrored by the ingestion
/// side so query-time and index-time vectors live in the same space.
pub fn field_texts(voucher: &Voucher) -> FieldTexts {
    let location_text = format!(
        "Địa điểm: {loc}. Khu vực: {loc}",
        loc = voucher.location
    );
    let service_text = format!(
        "Dịch vụ: {}. Từ khóa: {}",
        voucher.service.category,
        voucher.service.tags.join(", ")
    );
    let target_text = voucher
        .target_audience
        .as_deref()
        .map(|t| format!("Đối tượng: {t}. Phù hợp cho: {t}"));
    FieldTexts {
        content: voucher.content.clone(),
        name: voucher.name.clone(),
        location: location_text,
        service: service_text,
        target: target_text,
    }
}

/// Per-axis texts fed to the embedding provider.
pub struct FieldTexts {
    pub content: String,
    pub name: String,
    pub location: String,
    pub service: String,
    pub target: Option<String>,
}

/// Fills every field embedding of a voucher from the provider and rebuilds
/// the combined vector. Used by the ingestion surface when the caller does
/// not supply precomputed vectors. The per-field calls run concurrently
/// against the provider pool.
pub async fn embed_voucher(
    voucher: &mut Voucher,
    provider: &dyn EmbeddingsProvider,
    weights: &FieldWeights,
) -> Result<(), SearchError> {
    let texts = field_texts(voucher);
    let (content, name, location, service) = futures::try_join!(
        provider.embed(&texts.content),
        provider.embed(&texts.name),
        provider.embed(&texts.location),
        provider.embed(&texts.service),
    )?;
    let target = match &texts.target {
        Some(t) => Some(provider.embed(t).await?),
        None => None,
    };
    let mut emb = VoucherEmbeddings {
        content,
        name: Some(name),
        location: Some(location),
        service: Some(service),
        target,
        ..Default::default()
    };
    emb.combined = combine_embeddings(&emb, weights);
    voucher.embeddings = emb;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;
    use crate::record::PriceRange;

    fn sample_voucher() -> Voucher {
        Voucher {
            id: "v1".into(),
            name: "Buffet Hải Sản".into(),
            content: "Buffet hải sản tươi sống tại Hải Phòng, có khu vui chơi trẻ em".into(),
            location: "Hải Phòng".into(),
            district: None,
            region: None,
            service: ServiceInfo {
                category: "Restaurant".into(),
                tags: vec!["buffet".into(), "trẻ em".into()],
                has_kids_area: true,
                ..Default::default()
            },
            target_audience: Some("family".into()),
            price: Some(350_000),
            embeddings: VoucherEmbeddings::default(),
            data_quality_score: 0.9,
        }
    }

    #[tokio::test]
    async fn embed_then_validate_roundtrip() {
        let mut v = sample_voucher();
        let provider = HashingEmbedder::new(64);
        let weights = FieldWeights::default();
        embed_voucher(&mut v, &provider, &weights).await.unwrap();

        let registry = LocationRegistry::vietnam();
        let doc = VoucherDocument::from_voucher(&v, &registry, &weights, 64).unwrap();
        assert_eq!(doc.payload.price_info.price_range, PriceRange::MidRange);
        assert_eq!(doc.payload.region.as_deref(), Some("Miền Bắc"));
    }

    #[tokio::test]
    async fn combined_vector_matches_weighted_sum_exactly() {
        let mut v = sample_voucher();
        let weights = FieldWeights::default();
        embed_voucher(&mut v, &HashingEmbedder::new(128), &weights)
            .await
            .unwrap();
        let expected = combine_embeddings(&v.embeddings, &weights);
        for (a, b) in v.embeddings.combined.iter().zip(&expected) {
            assert!((a - b).abs() <= 1e-6);
        }
    }

    #[tokio::test]
    async fn tampered_combined_vector_is_rejected() {
        let mut v = sample_voucher();
        let weights = FieldWeights::default();
        embed_voucher(&mut v, &HashingEmbedder::new(64), &weights)
            .await
            .unwrap();
        // Swap in an unrelated unit vector.
        v.embeddings.combined = v.embeddings.content.clone();
        let registry = LocationRegistry::vietnam();
        let err = VoucherDocument::from_voucher(&v, &registry, &weights, 64).unwrap_err();
        assert!(matches!(err, SearchError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn non_canonical_location_is_rejected() {
        let mut v = sample_voucher();
        let weights = FieldWeights::default();
        embed_voucher(&mut v, &HashingEmbedder::new(64), &weights)
            .await
            .unwrap();
        v.location = "Atlantis".into();
        let registry = LocationRegistry::vietnam();
        assert!(VoucherDocument::from_voucher(&v, &registry, &weights, 64).is_err());
    }

    #[test]
    fn missing_content_embedding_is_rejected() {
        let v = sample_voucher();
        let registry = LocationRegistry::vietnam();
        let err =
            VoucherDocument::from_voucher(&v, &registry, &FieldWeights::default(), 64).unwrap_err();
        assert!(matches!(err, SearchError::InvalidDocument(_)));
    }
}
