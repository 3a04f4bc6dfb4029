//! Geographic re-ranking of retrieval candidates.
//!
//! Applies multiplicative boosts for exact, mentioned, neighboring and
//! same-region locations, clamps scores back to [0,1], and produces the
//! final deterministic order. Within one request the output order is fully
//! determined by the sort and tie-break rules here.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::index::document::UNKNOWN_LOCATION;
use crate::locations::LocationRegistry;
use crate::record::{Candidate, QueryComponents, RankingFactor, SearchResult};

/// Boost for `voucher.location == query.location`.
const EXACT_BOOST: f32 = 1.60;
/// Boost when a surface form of the query location occurs in the content.
const MENTION_BOOST: f32 = 1.30;
/// Boost for a symbolic neighbor of the query location.
const NEIGHBOR_BOOST: f32 = 1.15;
/// Boost for the same region.
const REGION_BOOST: f32 = 1.05;

/// Re-ranks candidates by geography.
pub struct GeoReRanker {
    registry: Arc<LocationRegistry>,
}

impl GeoReRanker {
    pub fn new(registry: Arc<LocationRegistry>) -> Self {
        Self { registry }
    }

    /// Boosts, filters, sorts, and truncates the candidate pool.
    ///
    /// Rules are tried in order and at most one applies per candidate. A
    /// voucher stored with the `unknown` location is never boosted. With
    /// `strict` set and a resolved query location, candidates matching
    /// neither the canonical nor the neighbor level are dropped before
    /// sorting. `min_score` applies after boosting.
    pub fn rerank(
        &self,
        candidates: Vec<Candidate>,
        components: &QueryComponents,
        top_k: usize,
        strict: bool,
        min_score: f32,
    ) -> Vec<SearchResult> {
        let query_location = components.location.as_deref();

        let mut pool: Vec<Candidate> = candidates
            .into_iter()
            .map(|mut c| {
                let (boost, factor) = self.classify(&c, query_location);
                c.result.similarity_score =
                    (c.result.raw_score * boost).clamp(0.0, 1.0);
                c.result.ranking_factor = factor;
                c
            })
            .collect();

        if strict {
            if let Some(loc) = query_location {
                let neighbors = self.registry.neighbors_of(loc);
                pool.retain(|c| {
                    c.result.location == loc
                        || neighbors.iter().any(|n| *n == c.result.location)
                });
            }
        }

        pool.retain(|c| c.result.similarity_score >= min_score);

        pool.sort_by(|a, b| {
            b.result
                .similarity_score
                .partial_cmp(&a.result.similarity_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.dense_similarity
                        .partial_cmp(&a.dense_similarity)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| {
                    b.data_quality
                        .partial_cmp(&a.data_quality)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.result.voucher_id.cmp(&b.result.voucher_id))
        });
        pool.truncate(top_k);

        debug!(
            results = pool.len(),
            location = query_location.unwrap_or("-"),
            strict,
            "geographic re-ranking complete"
        );
        pool.into_iter().map(|c| c.result).collect()
    }

    /// Mechanical Vietnamese summary of how geography shaped the ranking.
    pub fn explain(&self, results: &[SearchResult], components: &QueryComponents) -> String {
        let Some(loc) = components.location.as_deref() else {
            return "Truy vấn không có địa điểm; kết quả xếp theo độ tương đồng ngữ nghĩa."
                .to_string();
        };
        let mut out = format!("Kết quả được ưu tiên theo địa điểm: {loc}");
        if let Some(region) = self.registry.region_of(loc) {
            out.push_str(&format!(" ({region})"));
        }
        out.push('\n');
        for (i, r) in results.iter().take(5).enumerate() {
            let tag = match r.ranking_factor {
                RankingFactor::ExactLocationMatch => "đúng địa điểm",
                RankingFactor::NearbyLocationMatch => "khu vực lân cận",
                RankingFactor::RegionalMatch => "cùng vùng miền",
                RankingFactor::SemanticMatch => "tương đồng ngữ nghĩa",
            };
            out.push_str(&format!(
                "{}. {} — {} ({tag})\n",
                i + 1,
                r.voucher_name,
                r.location
            ));
        }
        out
    }

    fn classify(
        &self,
        candidate: &Candidate,
        query_location: Option<&str>,
    ) -> (f32, RankingFactor) {
        let Some(loc) = query_location else {
            return (1.0, RankingFactor::SemanticMatch);
        };
        let voucher_location = candidate.result.location.as_str();
        if voucher_location == UNKNOWN_LOCATION {
            return (1.0, RankingFactor::SemanticMatch);
        }
        if voucher_location == loc {
            return (EXACT_BOOST, RankingFactor::ExactLocationMatch);
        }
        if self.registry.text_mentions(loc, &candidate.content) {
            return (MENTION_BOOST, RankingFactor::SemanticMatch);
        }
        if self
            .registry
            .neighbors_of(loc)
            .iter()
            .any(|n| n == voucher_location)
        {
            return (NEIGHBOR_BOOST, RankingFactor::NearbyLocationMatch);
        }
        let same_region = match (
            self.registry.region_of(voucher_location),
            self.registry.region_of(loc),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if same_region {
            return (REGION_BOOST, RankingFactor::RegionalMatch);
        }
        (1.0, RankingFactor::SemanticMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PriceInfo, QueryIntent, SearchMethod, ServiceInfo};

    fn reranker() -> GeoReRanker {
        GeoReRanker::new(Arc::new(LocationRegistry::vietnam()))
    }

    fn components_with_location(loc: Option<&str>) -> QueryComponents {
        QueryComponents {
            original: String::new(),
            normalized: String::new(),
            stripped: String::new(),
            intent: QueryIntent::FindRestaurant,
            location: loc.map(String::from),
            service_requirements: Vec::new(),
            target_audience: None,
            price_preference: None,
            keywords: Vec::new(),
            confidence: 0.8,
        }
    }

    fn candidate(id: &str, location: &str, raw: f32, dense: f32, quality: f32) -> Candidate {
        Candidate {
            result: SearchResult {
                voucher_id: id.into(),
                voucher_name: format!("Voucher {id}"),
                content_snippet: "nội dung ưu đãi".into(),
                location: location.into(),
                service_info: ServiceInfo::default(),
                price_info: PriceInfo::from_price(Some(200_000)),
                target_audience: None,
                similarity_score: raw,
                raw_score: raw,
                ranking_factor: RankingFactor::SemanticMatch,
                search_method: SearchMethod::AdvancedMultiField,
            },
            content: "nội dung ưu đãi".into(),
            dense_similarity: dense,
            data_quality: quality,
        }
    }

    #[test]
    fn exact_match_outranks_equal_raw_score() {
        let results = reranker().rerank(
            vec![
                candidate("b", "Hồ Chí Minh", 0.5, 0.5, 0.5),
                candidate("a", "Hải Phòng", 0.5, 0.5, 0.5),
            ],
            &components_with_location(Some("Hải Phòng")),
            10,
            false,
            0.0,
        );
        assert_eq!(results[0].voucher_id, "a");
        assert_eq!(results[0].ranking_factor, RankingFactor::ExactLocationMatch);
        assert!((results[0].similarity_score - 0.8).abs() < 1e-6);
        // Raw score is preserved for explainability.
        assert!((results[0].raw_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn neighbor_and_region_tiers() {
        let results = reranker().rerank(
            vec![
                candidate("neighbor", "Hà Nội", 0.5, 0.5, 0.5),
                candidate("far", "Hồ Chí Minh", 0.5, 0.5, 0.5),
            ],
            &components_with_location(Some("Hải Phòng")),
            10,
            false,
            0.0,
        );
        assert_eq!(results[0].voucher_id, "neighbor");
        assert_eq!(
            results[0].ranking_factor,
            RankingFactor::NearbyLocationMatch
        );
        assert_eq!(results[1].ranking_factor, RankingFactor::SemanticMatch);
    }

    #[test]
    fn content_mention_boosts_without_factor_upgrade() {
        let mut c = candidate("m", "Đà Nẵng", 0.5, 0.5, 0.5);
        c.content = "chi nhánh mới tại hải phòng".into();
        let results = reranker().rerank(
            vec![c],
            &components_with_location(Some("Hải Phòng")),
            10,
            false,
            0.0,
        );
        assert_eq!(results[0].ranking_factor, RankingFactor::SemanticMatch);
        assert!((results[0].similarity_score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn unknown_location_never_boosted() {
        let mut c = candidate("u", UNKNOWN_LOCATION, 0.5, 0.5, 0.5);
        c.content = "ưu đãi tại hải phòng".into();
        let results = reranker().rerank(
            vec![c],
            &components_with_location(Some("Hải Phòng")),
            10,
            false,
            0.0,
        );
        assert!((results[0].similarity_score - 0.5).abs() < 1e-6);
        assert_eq!(results[0].ranking_factor, RankingFactor::SemanticMatch);
    }

    #[test]
    fn scores_clamp_to_one() {
        let results = reranker().rerank(
            vec![candidate("a", "Hải Phòng", 0.9, 0.9, 0.5)],
            &components_with_location(Some("Hải Phòng")),
            10,
            false,
            0.0,
        );
        assert!((results[0].similarity_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tie_breaks_by_dense_then_quality_then_id() {
        let results = reranker().rerank(
            vec![
                candidate("c", "Hà Nội", 0.5, 0.5, 0.5),
                candidate("b", "Hà Nội", 0.5, 0.5, 0.9),
                candidate("a", "Hà Nội", 0.5, 0.7, 0.1),
                candidate("d", "Hà Nội", 0.5, 0.5, 0.5),
            ],
            &components_with_location(None),
            10,
            false,
            0.0,
        );
        let ids: Vec<&str> = results.iter().map(|r| r.voucher_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn strict_mode_drops_non_matching_locations() {
        let results = reranker().rerank(
            vec![
                candidate("hcm", "Hồ Chí Minh", 0.9, 0.9, 0.9),
                candidate("hn", "Hà Nội", 0.4, 0.4, 0.4),
                candidate("hp", "Hải Phòng", 0.3, 0.3, 0.3),
            ],
            &components_with_location(Some("Hà Nội")),
            10,
            true,
            0.0,
        );
        let ids: Vec<&str> = results.iter().map(|r| r.voucher_id.as_str()).collect();
        // Hải Phòng survives as a neighbor of Hà Nội; Hồ Chí Minh is dropped
        // despite the higher raw score.
        assert_eq!(ids, vec!["hn", "hp"]);
    }

    #[test]
    fn min_score_applies_after_boosting() {
        let results = reranker().rerank(
            vec![candidate("a", "Hà Nội", 0.5, 0.5, 0.5)],
            &components_with_location(Some("Hà Nội")),
            10,
            false,
            0.75,
        );
        // 0.5 * 1.6 = 0.8 passes a 0.75 floor that the raw score would fail.
        assert_eq!(results.len(), 1);
    }
}
