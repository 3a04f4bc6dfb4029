//! RAG composition: context assembly, prompting, confidence, fallbacks.
//!
//! The generator is a text-in/text-out collaborator with its own deadline.
//! Generation is never on the critical path for retrieval correctness: every
//! failure path lands on a deterministic templated answer over the already
//! retrieved vouchers.

use std::sync::Arc;
use std::time::Duration;
use std::{future::Future, pin::Pin};

use tracing::{debug, warn};

use crate::errors::SearchError;
use crate::record::{QueryComponents, SearchMethod, SearchResult};

/// Default per-call generator deadline.
const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque generative collaborator.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>>;
}

/// Adapter over the `ai-llm-service` generator profile.
#[derive(Clone)]
pub struct LlmGenerator {
    svc: Arc<ai_llm_service::service_profiles::LlmServiceProfiles>,
}

impl LlmGenerator {
    pub fn new(svc: Arc<ai_llm_service::service_profiles::LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl TextGenerator for LlmGenerator {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
        Box::pin(async move {
            self.svc
                .generate(prompt, system)
                .await
                .map_err(|e| SearchError::GeneratorUnavailable(e.to_string()))
        })
    }
}

/// Finished composition.
pub struct RagOutcome {
    pub answer: String,
    pub confidence: f32,
    pub method: SearchMethod,
}

/// Response style hint derived from the parsed query; biases formatting
/// only, never the factual content rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseStyle {
    LocationFocused,
    ServiceFocused,
    TargetFocused,
    General,
}

impl ResponseStyle {
    pub fn from_components(c: &QueryComponents) -> Self {
        if c.location.is_some() {
            ResponseStyle::LocationFocused
        } else if !c.service_requirements.is_empty() {
            ResponseStyle::ServiceFocused
        } else if c.target_audience.is_some() {
            ResponseStyle::TargetFocused
        } else {
            ResponseStyle::General
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            ResponseStyle::LocationFocused => {
                "Trình bày theo địa điểm: nhóm các gợi ý theo khu vực, nêu rõ địa chỉ khu vực ở đầu mỗi mục."
            }
            ResponseStyle::ServiceFocused => {
                "Trình bày theo dịch vụ: nhấn mạnh loại hình dịch vụ và tiện ích phù hợp với yêu cầu."
            }
            ResponseStyle::TargetFocused => {
                "Trình bày theo đối tượng: nêu rõ mức độ phù hợp với nhóm khách được hỏi."
            }
            ResponseStyle::General => "Trình bày gọn gàng bằng danh sách gạch đầu dòng.",
        }
    }
}

/// System prompt: Vietnamese assistant persona, context-only answers, at
/// most one clarifying follow-up question.
const SYSTEM_PROMPT: &str = "Bạn là trợ lý tư vấn voucher cho một nền tảng thương mại Việt Nam. \
Chỉ trả lời dựa trên danh sách voucher trong phần ngữ cảnh; tuyệt đối không bịa thêm voucher \
không có trong ngữ cảnh. Trả lời bằng tiếng Việt, thân thiện và ngắn gọn. Nếu cần, được phép \
hỏi lại tối đa một câu để làm rõ nhu cầu.";

/// Assembles context, prompts the generator, and scores confidence.
pub struct RagComposer {
    generator: Arc<dyn TextGenerator>,
    max_context_tokens: usize,
    generator_timeout: Duration,
}

impl RagComposer {
    pub fn new(generator: Arc<dyn TextGenerator>, max_context_tokens: usize) -> Self {
        Self {
            generator,
            max_context_tokens,
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }

    pub fn with_generator_timeout(mut self, timeout: Duration) -> Self {
        self.generator_timeout = timeout;
        self
    }

    /// Composes the final answer for a rag request.
    ///
    /// `remaining` is what is left of the overall request deadline; the
    /// generator gets the smaller of that and its own per-call timeout. A
    /// generator failure or timeout falls back to the deterministic
    /// template and tags the outcome `advanced_rag_fallback`.
    pub async fn compose(
        &self,
        components: &QueryComponents,
        results: &[SearchResult],
        remaining: Option<Duration>,
    ) -> RagOutcome {
        if results.is_empty() {
            return RagOutcome {
                answer: NO_RESULTS_ANSWER.to_string(),
                confidence: 0.0,
                method: SearchMethod::AdvancedRag,
            };
        }

        let confidence = confidence_of(results);
        let style = ResponseStyle::from_components(components);
        let context = self.assemble_context(results);
        let prompt = format!(
            "Câu hỏi của khách: {query}\n\n{style}\n\nNgữ cảnh (các voucher tìm được):\n{context}",
            query = components.original,
            style = style.instruction(),
        );

        let budget = remaining
            .map(|r| r.min(self.generator_timeout))
            .unwrap_or(self.generator_timeout);

        let generated =
            tokio::time::timeout(budget, self.generator.generate(&prompt, Some(SYSTEM_PROMPT)))
                .await;

        match generated {
            Ok(Ok(answer)) if !answer.trim().is_empty() => {
                debug!(confidence, "rag answer generated");
                RagOutcome {
                    answer,
                    confidence,
                    method: SearchMethod::AdvancedRag,
                }
            }
            Ok(Ok(_)) => {
                warn!("generator returned an empty answer; using fallback template");
                RagOutcome {
                    answer: fallback_answer(results),
                    confidence,
                    method: SearchMethod::AdvancedRagFallback,
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "generator failed; using fallback template");
                RagOutcome {
                    answer: fallback_answer(results),
                    confidence,
                    method: SearchMethod::AdvancedRagFallback,
                }
            }
            Err(_) => {
                warn!(timeout_ms = budget.as_millis() as u64, "generator timed out; using fallback template");
                RagOutcome {
                    answer: fallback_answer(results),
                    confidence,
                    method: SearchMethod::AdvancedRagFallback,
                }
            }
        }
    }

    /// Deterministic outcome without touching a generator, for deployments
    /// that run retrieval-only.
    pub fn fallback_outcome(results: &[SearchResult]) -> RagOutcome {
        if results.is_empty() {
            return RagOutcome {
                answer: NO_RESULTS_ANSWER.to_string(),
                confidence: 0.0,
                method: SearchMethod::AdvancedRag,
            };
        }
        RagOutcome {
            answer: fallback_answer(results),
            confidence: confidence_of(results),
            method: SearchMethod::AdvancedRagFallback,
        }
    }

    /// Concatenates templated voucher blocks in retrieval order until the
    /// token budget is reached.
    fn assemble_context(&self, results: &[SearchResult]) -> String {
        let mut out = String::new();
        let mut used = 0usize;
        for (i, r) in results.iter().enumerate() {
            let block = context_block(i, r);
            let cost = estimate_tokens(&block);
            if used + cost > self.max_context_tokens {
                debug!(included = i, total = results.len(), "context budget reached");
                break;
            }
            used += cost;
            out.push_str(&block);
        }
        out
    }
}

/// Crude token estimate: four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// `mean(similarity) * (1 + 0.1 when at least three results)`, clamped.
fn confidence_of(results: &[SearchResult]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    let mean: f32 =
        results.iter().map(|r| r.similarity_score).sum::<f32>() / results.len() as f32;
    let bonus = if results.len() >= 3 { 1.1 } else { 1.0 };
    (mean.clamp(0.0, 1.0) * bonus).clamp(0.0, 1.0)
}

fn context_block(index: usize, r: &SearchResult) -> String {
    let price = match r.price_info.price {
        Some(p) => format!("{p} VND ({})", r.price_info.price_range.as_str()),
        None => "chưa rõ giá".to_string(),
    };
    let service = if r.service_info.tags.is_empty() {
        r.service_info.category.clone()
    } else {
        format!("{} ({})", r.service_info.category, r.service_info.tags.join(", "))
    };
    format!(
        "[{n}] {name}\n- Địa điểm: {location}\n- Dịch vụ: {service}\n- Giá: {price}\n- Mô tả: {snippet}\n- Độ phù hợp: {score:.2}\n\n",
        n = index + 1,
        name = r.voucher_name,
        location = r.location,
        snippet = r.content_snippet,
        score = r.similarity_score,
    )
}

/// Deterministic Markdown answer used when generation is unavailable.
fn fallback_answer(results: &[SearchResult]) -> String {
    let mut out = String::from("Dưới đây là các voucher phù hợp nhất với yêu cầu của bạn:\n\n");
    for r in results {
        let tip = match r.ranking_factor {
            crate::record::RankingFactor::ExactLocationMatch => "đúng khu vực bạn tìm",
            crate::record::RankingFactor::NearbyLocationMatch => "ở khu vực lân cận",
            crate::record::RankingFactor::RegionalMatch => "cùng vùng miền",
            crate::record::RankingFactor::SemanticMatch => "phù hợp với nhu cầu",
        };
        out.push_str(&format!(
            "- **{}** — {} ({tip})\n",
            r.voucher_name, r.location
        ));
    }
    out.push_str("\nBạn muốn xem chi tiết voucher nào không?");
    out
}

/// Fixed template for an empty retrieval.
const NO_RESULTS_ANSWER: &str = "Rất tiếc, không tìm thấy voucher phù hợp với yêu cầu của bạn. \
Bạn thử mở rộng khu vực tìm kiếm hoặc bỏ bớt điều kiện nhé.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        PriceInfo, QueryIntent, RankingFactor, ServiceInfo,
    };

    struct EchoGenerator;
    impl TextGenerator for EchoGenerator {
        fn generate<'a>(
            &'a self,
            prompt: &'a str,
            _system: Option<&'a str>,
        ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
            let head: String = prompt.chars().take(40).collect();
            Box::pin(async move { Ok(format!("echo: {head}")) })
        }
    }

    struct FailingGenerator;
    impl TextGenerator for FailingGenerator {
        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            _system: Option<&'a str>,
        ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
            Box::pin(async { Err(SearchError::GeneratorUnavailable("down".into())) })
        }
    }

    struct SlowGenerator;
    impl TextGenerator for SlowGenerator {
        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            _system: Option<&'a str>,
        ) -> Pin<Box<dyn Future<Output = Result<String, SearchError>> + Send + 'a>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("late".to_string())
            })
        }
    }

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult {
            voucher_id: id.into(),
            voucher_name: format!("Voucher {id}"),
            content_snippet: "ưu đãi hấp dẫn".into(),
            location: "Hà Nội".into(),
            service_info: ServiceInfo::default(),
            price_info: PriceInfo::from_price(Some(250_000)),
            target_audience: None,
            similarity_score: score,
            raw_score: score,
            ranking_factor: RankingFactor::SemanticMatch,
            search_method: SearchMethod::AdvancedRag,
        }
    }

    fn components() -> QueryComponents {
        QueryComponents {
            original: "buffet cho gia đình".into(),
            normalized: "buffet cho gia đình".into(),
            stripped: "buffet cho gia dinh".into(),
            intent: QueryIntent::FindRestaurant,
            location: None,
            service_requirements: Vec::new(),
            target_audience: Some("family".into()),
            price_preference: None,
            keywords: vec!["buffet".into()],
            confidence: 0.7,
        }
    }

    #[tokio::test]
    async fn successful_generation_keeps_rag_method() {
        let composer = RagComposer::new(Arc::new(EchoGenerator), 4000);
        let out = composer
            .compose(&components(), &[result("a", 0.8)], None)
            .await;
        assert_eq!(out.method, SearchMethod::AdvancedRag);
        assert!(out.answer.starts_with("echo:"));
    }

    #[tokio::test]
    async fn generator_failure_falls_back_to_template() {
        let composer = RagComposer::new(Arc::new(FailingGenerator), 4000);
        let results = [result("a", 0.8), result("b", 0.6)];
        let out = composer.compose(&components(), &results, None).await;
        assert_eq!(out.method, SearchMethod::AdvancedRagFallback);
        assert!(out.answer.contains("Voucher a"));
        assert!(out.answer.contains("Voucher b"));
    }

    #[tokio::test]
    async fn generator_timeout_falls_back_to_template() {
        let composer = RagComposer::new(Arc::new(SlowGenerator), 4000)
            .with_generator_timeout(Duration::from_millis(50));
        let out = composer
            .compose(&components(), &[result("a", 0.9)], None)
            .await;
        assert_eq!(out.method, SearchMethod::AdvancedRagFallback);
        assert!(!out.answer.trim().is_empty());
    }

    #[tokio::test]
    async fn zero_results_yield_fixed_template_and_zero_confidence() {
        let composer = RagComposer::new(Arc::new(EchoGenerator), 4000);
        let out = composer.compose(&components(), &[], None).await;
        assert_eq!(out.confidence, 0.0);
        assert!(out.answer.contains("không tìm thấy"));
    }

    #[tokio::test]
    async fn confidence_bonus_for_three_or_more() {
        let composer = RagComposer::new(Arc::new(EchoGenerator), 4000);
        let two = composer
            .compose(&components(), &[result("a", 0.5), result("b", 0.5)], None)
            .await;
        let three = composer
            .compose(
                &components(),
                &[result("a", 0.5), result("b", 0.5), result("c", 0.5)],
                None,
            )
            .await;
        assert!((two.confidence - 0.5).abs() < 1e-6);
        assert!((three.confidence - 0.55).abs() < 1e-6);
    }

    #[tokio::test]
    async fn context_respects_token_budget() {
        // Budget fits roughly one block; the second voucher must be cut.
        let composer = RagComposer::new(Arc::new(EchoGenerator), 60);
        let context = composer.assemble_context(&[result("a", 0.9), result("b", 0.8)]);
        assert!(context.contains("Voucher a"));
        assert!(!context.contains("Voucher b"));
    }

    #[test]
    fn style_selection_order() {
        let mut c = components();
        c.location = Some("Hà Nội".into());
        assert_eq!(ResponseStyle::from_components(&c), ResponseStyle::LocationFocused);
        c.location = None;
        c.service_requirements = vec!["romantic".into()];
        assert_eq!(ResponseStyle::from_components(&c), ResponseStyle::ServiceFocused);
        c.service_requirements.clear();
        assert_eq!(ResponseStyle::from_components(&c), ResponseStyle::TargetFocused);
        c.target_audience = None;
        assert_eq!(ResponseStyle::from_components(&c), ResponseStyle::General);
    }
}
