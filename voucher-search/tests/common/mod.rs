//! Shared fixtures: a seeded in-memory service over the deterministic
//! embedder, plus collaborator doubles for failure-path scenarios.
#![allow(dead_code)] // each test binary uses a different fixture subset

use std::sync::Arc;
use std::time::Duration;
use std::{future::Future, pin::Pin};

use voucher_search::{
    EmbeddingsProvider, HashingEmbedder, LocationRegistry, MemoryIndex, SearchConfig, SearchError,
    SearchIndex, SearchService, ServiceInfo, TextGenerator, Voucher, VoucherEmbeddings,
};

pub const DIM: usize = 256;

pub fn test_config() -> SearchConfig {
    SearchConfig {
        embedding_dimension: DIM,
        ..SearchConfig::default()
    }
}

/// Service over an empty in-memory index.
pub fn empty_service(generator: Option<Arc<dyn TextGenerator>>) -> SearchService {
    service_with(test_config(), generator)
}

pub fn service_with(
    cfg: SearchConfig,
    generator: Option<Arc<dyn TextGenerator>>,
) -> SearchService {
    let index: Arc<dyn SearchIndex> = Arc::new(MemoryIndex::new());
    let embedder: Arc<dyn EmbeddingsProvider> = Arc::new(HashingEmbedder::new(cfg.embedding_dimension));
    SearchService::new(
        cfg,
        Arc::new(LocationRegistry::vietnam()),
        index,
        embedder,
        generator,
    )
    .expect("service construction")
}

/// Service seeded with the reference corpus.
pub async fn seeded_service(generator: Option<Arc<dyn TextGenerator>>) -> SearchService {
    let service = empty_service(generator);
    for voucher in corpus() {
        service
            .upsert_voucher_with_embeddings(voucher)
            .await
            .expect("seed voucher");
    }
    service
}

pub fn voucher(
    id: &str,
    name: &str,
    content: &str,
    location: &str,
    category: &str,
    price: u64,
    quality: f32,
) -> Voucher {
    Voucher {
        id: id.into(),
        name: name.into(),
        content: content.into(),
        location: location.into(),
        district: None,
        region: None,
        service: ServiceInfo {
            category: category.into(),
            subcategory: None,
            tags: Vec::new(),
            has_kids_area: false,
            restaurant_type: None,
        },
        target_audience: None,
        price: Some(price),
        embeddings: VoucherEmbeddings::default(),
        data_quality_score: quality,
    }
}

/// Twelve vouchers across five cities, one with an unknown location.
pub fn corpus() -> Vec<Voucher> {
    let mut out = vec![
        voucher(
            "hp-kids-buffet",
            "Buffet Gia Đình Vui Chơi",
            "buffet cho gia đình có khu vui chơi trẻ em rộng rãi tại hải phòng",
            "Hải Phòng",
            "Restaurant",
            350_000,
            0.9,
        ),
        voucher(
            "hp-seafood",
            "Buffet Hải Sản Biển Đông",
            "buffet hải sản tươi sống tại hải phòng, phù hợp cho gia đình",
            "Hải Phòng",
            "Restaurant",
            450_000,
            0.8,
        ),
        voucher(
            "hp-hotpot",
            "Lẩu Nướng Phố Cảng",
            "quán ăn lẩu nướng ngon tại hải phòng có chỗ cho trẻ em chơi",
            "Hải Phòng",
            "Restaurant",
            300_000,
            0.7,
        ),
        voucher(
            "hp-kids-zone",
            "Khu Vui Chơi Trẻ Em Cát Bi",
            "khu vui chơi trong nhà cho trẻ em tại hải phòng, an toàn và sạch sẽ",
            "Hải Phòng",
            "Kids",
            150_000,
            0.6,
        ),
        voucher(
            "hp-cafe",
            "Cafe Biển Đồ Sơn",
            "quán cafe view biển không gian thoáng tại hải phòng đồ sơn",
            "Hải Phòng",
            "Cafe",
            80_000,
            0.5,
        ),
        voucher(
            "hn-buffet",
            "Buffet Trẻ Em Hà Nội",
            "buffet dành cho trẻ em và gia đình tại hà nội",
            "Hà Nội",
            "Restaurant",
            400_000,
            0.8,
        ),
        voucher(
            "hn-cafe-romantic",
            "Cafe Lãng Mạn Hồ Tây",
            "quán cafe không gian lãng mạn cho cặp đôi hẹn hò tại hà nội",
            "Hà Nội",
            "Cafe",
            120_000,
            0.7,
        ),
        voucher(
            "hcm-rooftop",
            "Rooftop Bar Bến Thành",
            "quán bar không gian lãng mạn view thành phố sài gòn",
            "Hồ Chí Minh",
            "Bar",
            500_000,
            0.7,
        ),
        voucher(
            "hcm-buffet",
            "Buffet Gia Đình Sài Gòn",
            "buffet trẻ em gia đình tại sài gòn",
            "Hồ Chí Minh",
            "Restaurant",
            350_000,
            0.8,
        ),
        voucher(
            "dn-resort",
            "Resort Nghỉ Dưỡng Mỹ Khê",
            "khách sạn nghỉ dưỡng cao cấp bên biển tại đà nẵng",
            "Đà Nẵng",
            "Hotel",
            1_200_000,
            0.9,
        ),
        voucher(
            "bellissimo",
            "Bellissimo Restaurant & Lounge",
            "nhà hàng pizza ý sang trọng trung tâm hà nội",
            "Hà Nội",
            "Restaurant",
            600_000,
            0.9,
        ),
        voucher(
            "unknown-spa",
            "Spa Thư Giãn Golden Lotus",
            "spa massage thư giãn cao cấp, đặt lịch trước",
            "unknown",
            "Beauty",
            250_000,
            0.4,
        ),
    ];
    out[0].service.has_kids_area = true;
    out[0].service.tags = vec!["buffet".into(), "trẻ em".into()];
    out[0].target_audience = Some("family".into());
    out[2].service.has_kids_area = true;
    out[5].target_audience = Some("kids".into());
    out
}

/// Generator that always fails.
pub struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
        Box::pin(async { Err(SearchError::GeneratorUnavailable("offline".into())) })
    }
}

/// Generator that never answers within any reasonable deadline.
pub struct SlowGenerator;

impl TextGenerator for SlowGenerator {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        })
    }
}

/// Generator that succeeds instantly.
pub struct InstantGenerator;

impl TextGenerator for InstantGenerator {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
        Box::pin(async { Ok("Đây là các voucher phù hợp với yêu cầu của bạn.".to_string()) })
    }
}

/// Embedder that sleeps long enough to trip any request deadline.
pub struct SlowEmbedder {
    inner: HashingEmbedder,
}

impl SlowEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dim),
        }
    }
}

impl EmbeddingsProvider for SlowEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, SearchError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.inner.embed(text).await
        })
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
