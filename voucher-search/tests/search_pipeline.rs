//! End-to-end pipeline scenarios over the seeded in-memory service.

mod common;

use std::sync::Arc;

use common::{
    FailingGenerator, InstantGenerator, SlowEmbedder, SlowGenerator, empty_service,
    seeded_service, test_config,
};
use voucher_search::{
    EmbeddingsProvider, LocationRegistry, MemoryIndex, QueryIntent, RankingFactor, SearchConfig,
    SearchError, SearchFilters, SearchIndex, SearchMethod, SearchMode, SearchRequest,
    SearchService,
};

#[tokio::test]
async fn kid_friendly_dining_in_hai_phong() {
    let service = seeded_service(None).await;
    let mut request = SearchRequest::new(
        "quán ăn tại hải phòng có chỗ cho trẻ em chơi",
        SearchMode::Hybrid,
    );
    request.top_k = 5;

    let response = service.search(request).await.unwrap();
    let parsed = response.parsed_components.as_ref().unwrap();
    assert!(matches!(
        parsed.intent,
        QueryIntent::FindRestaurant | QueryIntent::FindKids
    ));
    assert_eq!(parsed.location.as_deref(), Some("Hải Phòng"));
    assert!(parsed.confidence >= 0.6);

    assert_eq!(response.results.len(), 5);
    let in_hai_phong = response
        .results
        .iter()
        .filter(|r| r.location == "Hải Phòng")
        .count();
    assert!(in_hai_phong >= 4, "only {in_hai_phong} results in Hải Phòng");
    assert_eq!(
        response.results[0].ranking_factor,
        RankingFactor::ExactLocationMatch
    );
    assert!(response.explanations.is_some());
    assert!(response.search_strategy.is_some());
}

#[tokio::test]
async fn brand_exact_match_is_lexically_driven() {
    let service = seeded_service(None).await;
    let mut request = SearchRequest::new("Bellissimo", SearchMode::Hybrid);
    request.top_k = 3;

    let response = service.search(request).await.unwrap();
    let top = &response.results[0];
    assert!(
        top.voucher_name.to_lowercase().contains("bellissimo"),
        "top result was {}",
        top.voucher_name
    );
    assert!(
        top.similarity_score >= 0.7,
        "similarity {}",
        top.similarity_score
    );
}

#[tokio::test]
async fn pure_vector_mode_is_semantic_only() {
    let service = seeded_service(None).await;
    let mut request = SearchRequest::new("quán cafe có không gian lãng mạn", SearchMode::Vector);
    request.top_k = 3;

    let response = service.search(request).await.unwrap();
    assert_eq!(response.metadata.search_method, SearchMethod::VectorSearch);
    assert_eq!(response.results.len(), 3);
    for r in &response.results {
        assert!(
            ["Restaurant", "Cafe", "Bar"].contains(&r.service_info.category.as_str()),
            "unexpected category {}",
            r.service_info.category
        );
        assert_eq!(r.ranking_factor, RankingFactor::SemanticMatch);
    }
    // Vector mode skips parsing and strategy reporting.
    assert!(response.parsed_components.is_none());
    assert!(response.search_strategy.is_none());
}

#[tokio::test]
async fn strict_location_filter_drops_other_cities() {
    let service = seeded_service(None).await;
    let mut request = SearchRequest::new("buffet trẻ em", SearchMode::Hybrid);
    request.top_k = 10;
    request.strict_location = true;
    request.filters = SearchFilters {
        location: Some("Hà Nội".into()),
        service: None,
        price_range: None,
    };

    let response = service.search(request).await.unwrap();
    assert!(!response.results.is_empty());
    for r in &response.results {
        assert_eq!(r.location, "Hà Nội", "leaked {}", r.voucher_id);
    }
    assert!(
        response
            .results
            .iter()
            .all(|r| r.voucher_id != "hcm-buffet" && r.voucher_id != "dn-resort")
    );
}

#[tokio::test]
async fn rag_generator_timeout_degrades_to_fallback_with_hybrid_results() {
    let rag_service = seeded_service(Some(Arc::new(SlowGenerator))).await;
    let mut rag_request = SearchRequest::new(
        "quán ăn tại hải phòng có chỗ cho trẻ em chơi",
        SearchMode::Rag,
    );
    rag_request.top_k = 5;
    // Request deadline far shorter than the generator's response time.
    rag_request.deadline_ms = Some(2_000);

    let rag_response = rag_service.search(rag_request).await.unwrap();
    assert_eq!(
        rag_response.metadata.search_method,
        SearchMethod::AdvancedRagFallback
    );
    let answer = rag_response.answer.as_deref().unwrap();
    assert!(!answer.trim().is_empty());

    let hybrid_service = seeded_service(None).await;
    let mut hybrid_request = SearchRequest::new(
        "quán ăn tại hải phòng có chỗ cho trẻ em chơi",
        SearchMode::Hybrid,
    );
    hybrid_request.top_k = 5;
    let hybrid_response = hybrid_service.search(hybrid_request).await.unwrap();

    let rag_ids: Vec<&str> = rag_response
        .results
        .iter()
        .map(|r| r.voucher_id.as_str())
        .collect();
    let hybrid_ids: Vec<&str> = hybrid_response
        .results
        .iter()
        .map(|r| r.voucher_id.as_str())
        .collect();
    assert_eq!(rag_ids, hybrid_ids);
}

#[tokio::test]
async fn rag_generator_failure_downgrades_once() {
    let service = seeded_service(Some(Arc::new(FailingGenerator))).await;
    let mut request = SearchRequest::new("buffet trẻ em tại hà nội", SearchMode::Rag);
    request.top_k = 5;

    let response = service.search(request).await.unwrap();
    assert_eq!(
        response.metadata.search_method,
        SearchMethod::AdvancedRagFallback
    );
    assert!(response.answer.is_some());
    assert!(response.confidence.is_some());
    assert!(!response.results.is_empty());
}

#[tokio::test]
async fn rag_success_carries_answer_and_confidence() {
    let service = seeded_service(Some(Arc::new(InstantGenerator))).await;
    let mut request = SearchRequest::new("buffet trẻ em tại hà nội", SearchMode::Rag);
    request.top_k = 5;

    let response = service.search(request).await.unwrap();
    assert_eq!(response.metadata.search_method, SearchMethod::AdvancedRag);
    assert!(response.answer.unwrap().contains("voucher"));
    let confidence = response.confidence.unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!(confidence > 0.0);
}

#[tokio::test]
async fn diacritic_equivalent_queries_return_identical_sets() {
    let service = seeded_service(None).await;
    let accented = sorted_ids(&service, "hải phòng").await;
    let plain = sorted_ids(&service, "hai phong").await;
    assert_eq!(accented, plain);
    assert!(!accented.is_empty());
}

async fn sorted_ids(service: &SearchService, query: &str) -> Vec<String> {
    let mut request = SearchRequest::new(query.to_string(), SearchMode::Hybrid);
    request.top_k = 10;
    let mut ids: Vec<String> = service
        .search(request)
        .await
        .unwrap()
        .results
        .into_iter()
        .map(|r| r.voucher_id)
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn empty_index_returns_empty_results() {
    let service = empty_service(None);
    let response = service
        .search(SearchRequest::new("buffet hải sản", SearchMode::Hybrid))
        .await
        .unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.metadata.total_results, 0);
}

#[tokio::test]
async fn min_score_above_everything_empties_results() {
    let service = seeded_service(None).await;
    let mut request = SearchRequest::new("cafe", SearchMode::Hybrid);
    request.min_score = 0.99;
    let response = service.search(request).await.unwrap();
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn query_length_boundary() {
    let service = seeded_service(None).await;

    // Two normalized characters are valid.
    let ok = service
        .search(SearchRequest::new("ăn", SearchMode::Hybrid))
        .await;
    assert!(ok.is_ok());

    for bad in ["", " ", "a", "a ", "!?"] {
        let err = service
            .search(SearchRequest::new(bad, SearchMode::Hybrid))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::BadRequest(_)), "query '{bad}'");
    }
}

#[tokio::test]
async fn invalid_parameters_are_bad_requests() {
    let service = seeded_service(None).await;

    let mut request = SearchRequest::new("buffet", SearchMode::Hybrid);
    request.top_k = 0;
    assert!(matches!(
        service.search(request).await.unwrap_err(),
        SearchError::BadRequest(_)
    ));

    let mut request = SearchRequest::new("buffet", SearchMode::Hybrid);
    request.top_k = 51;
    assert!(matches!(
        service.search(request).await.unwrap_err(),
        SearchError::BadRequest(_)
    ));

    let mut request = SearchRequest::new("buffet", SearchMode::Hybrid);
    request.filters.location = Some("Mordor".into());
    assert!(matches!(
        service.search(request).await.unwrap_err(),
        SearchError::BadRequest(_)
    ));

    let mut request = SearchRequest::new("buffet", SearchMode::Hybrid);
    request.filters.price_range = Some("free".into());
    assert!(matches!(
        service.search(request).await.unwrap_err(),
        SearchError::BadRequest(_)
    ));
}

#[tokio::test]
async fn unknown_location_voucher_gets_no_boost() {
    let service = seeded_service(None).await;
    let mut request = SearchRequest::new("spa massage thư giãn tại đà nẵng", SearchMode::Hybrid);
    request.top_k = 10;
    let response = service.search(request).await.unwrap();

    let spa = response
        .results
        .iter()
        .find(|r| r.voucher_id == "unknown-spa")
        .expect("spa voucher retrieved");
    assert_eq!(spa.ranking_factor, RankingFactor::SemanticMatch);
    assert!((spa.similarity_score - spa.raw_score).abs() < 1e-6);
}

#[tokio::test]
async fn deadline_on_slow_embedder_is_surfaced() {
    let cfg = test_config();
    let embedder: Arc<dyn EmbeddingsProvider> = Arc::new(SlowEmbedder::new(cfg.embedding_dimension));
    let index: Arc<dyn SearchIndex> = Arc::new(MemoryIndex::new());
    let service = SearchService::new(
        cfg,
        Arc::new(LocationRegistry::vietnam()),
        index,
        embedder,
        None,
    )
    .unwrap();

    let mut request = SearchRequest::new("buffet hải sản", SearchMode::Hybrid);
    request.deadline_ms = Some(50);
    let err = service.search(request).await.unwrap_err();
    assert!(matches!(err, SearchError::DeadlineExceeded { .. }));
}

#[tokio::test]
async fn rag_overload_rejects_or_degrades() {
    let cfg = SearchConfig {
        rag_concurrency_limit: 1,
        rag_queue_depth: 0,
        ..test_config()
    };
    let service = Arc::new(common::service_with(cfg, Some(Arc::new(SlowGenerator))));
    for voucher in common::corpus() {
        service.upsert_voucher_with_embeddings(voucher).await.unwrap();
    }

    // First rag request occupies the single permit for a long time.
    let blocker = {
        let service = service.clone();
        tokio::spawn(async move {
            let mut request = SearchRequest::new("buffet trẻ em", SearchMode::Rag);
            request.deadline_ms = Some(5_000);
            let _ = service.search(request).await;
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // Saturated gate, no queue: reject.
    let err = service
        .search(SearchRequest::new("buffet trẻ em", SearchMode::Rag))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Overloaded));

    // Or degrade to hybrid when the caller opted in.
    let mut request = SearchRequest::new("buffet trẻ em", SearchMode::Rag);
    request.degrade_on_overload = true;
    let response = service.search(request).await.unwrap();
    assert_eq!(
        response.metadata.search_method,
        SearchMethod::AdvancedMultiField
    );
    assert!(response.metadata.degraded);

    blocker.abort();
}
