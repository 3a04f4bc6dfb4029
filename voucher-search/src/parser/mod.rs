//! Vietnamese query parser.
//!
//! Turns a raw query into [`QueryComponents`]: intent, location, service
//! requirements, target audience, price preference, salient keywords, and a
//! confidence score. Parsing never fails; when nothing matches the result is
//! a low-confidence `general` parse and downstream stages degrade gracefully.
//!
//! Stage order matters and is fixed: normalize, intent, location, service
//! and target tags, price cue, keywords, confidence.

mod lexicon;

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use crate::locations::LocationRegistry;
use crate::normalize::{canonical_forms, strip_diacritics};
use crate::record::{PriceRange, QueryComponents, QueryIntent};

use lexicon::{INTENTS, LOCATION_CUES, PRICES, SERVICES, STOP_WORDS, TARGETS};

/// Score a single pattern hit contributes.
const PATTERN_HIT: f32 = 0.30;
/// Extra score when the pattern literal occurs verbatim as a substring.
const EXACT_SUBSTRING_BONUS: f32 = 0.20;

/// One compiled pattern: the word-bounded regex plus the literal phrase when
/// the source had no regex metacharacters (literal phrases qualify for the
/// exact-substring bonus).
struct Pattern {
    re: Regex,
    literal: Option<&'static str>,
}

struct CompiledSet {
    accented: Vec<Pattern>,
    stripped: Vec<Pattern>,
}

struct Lexicon {
    intents: Vec<(QueryIntent, CompiledSet)>,
    services: Vec<(&'static str, CompiledSet)>,
    targets: Vec<(&'static str, CompiledSet)>,
    prices: Vec<(&'static str, CompiledSet)>,
    cue: Regex,
    stop_words: HashSet<String>,
}

fn compile_pattern(src: &'static str) -> Pattern {
    let is_literal = !src
        .chars()
        .any(|c| matches!(c, '.' | '*' | '+' | '?' | '|' | '(' | ')' | '[' | ']' | '\\'));
    let re = Regex::new(&format!(r"\b(?:{src})\b")).expect("lexicon pattern must compile");
    Pattern {
        re,
        literal: is_literal.then_some(src),
    }
}

fn compile_set(set: &lexicon::PatternSet) -> CompiledSet {
    CompiledSet {
        accented: set.accented.iter().map(|p| compile_pattern(p)).collect(),
        stripped: set.stripped.iter().map(|p| compile_pattern(p)).collect(),
    }
}

fn lexicon() -> &'static Lexicon {
    static LEXICON: OnceLock<Lexicon> = OnceLock::new();
    LEXICON.get_or_init(|| {
        let cue_alt = LOCATION_CUES.join("|");
        let cue = Regex::new(&format!(r"\b(?:{cue_alt})\s+([\w\s]{{1,40}})"))
            .expect("location cue regex must compile");
        let mut stop_words = HashSet::new();
        for w in STOP_WORDS {
            stop_words.insert((*w).to_string());
            stop_words.insert(strip_diacritics(w));
        }
        Lexicon {
            intents: INTENTS.iter().map(|(i, s)| (*i, compile_set(s))).collect(),
            services: SERVICES.iter().map(|(t, s)| (*t, compile_set(s))).collect(),
            targets: TARGETS.iter().map(|(t, s)| (*t, compile_set(s))).collect(),
            prices: PRICES.iter().map(|(t, s)| (*t, compile_set(s))).collect(),
            cue,
            stop_words,
        }
    })
}

/// Scores one concept against both canonical forms, capped at 1.0.
fn score_set(set: &CompiledSet, normalized: &str, stripped: &str) -> f32 {
    let mut score = 0.0f32;
    for (patterns, form) in [(&set.accented, normalized), (&set.stripped, stripped)] {
        for p in patterns {
            if p.re.is_match(form) {
                score += PATTERN_HIT;
                if p.literal.map(|l| form.contains(l)).unwrap_or(false) {
                    score += EXACT_SUBSTRING_BONUS;
                }
            }
        }
    }
    score.min(1.0)
}

fn any_match(set: &CompiledSet, normalized: &str, stripped: &str) -> bool {
    set.accented.iter().any(|p| p.re.is_match(normalized))
        || set.stripped.iter().any(|p| p.re.is_match(stripped))
}

fn match_count(set: &CompiledSet, normalized: &str, stripped: &str) -> usize {
    set.accented.iter().filter(|p| p.re.is_match(normalized)).count()
        + set.stripped.iter().filter(|p| p.re.is_match(stripped)).count()
}

/// Stateless parser over a shared location registry.
pub struct QueryParser {
    registry: Arc<LocationRegistry>,
}

impl QueryParser {
    pub fn new(registry: Arc<LocationRegistry>) -> Self {
        Self { registry }
    }

    /// Parses a raw query. Never fails.
    pub fn parse(&self, query: &str) -> QueryComponents {
        let (normalized, stripped) = canonical_forms(query);
        let lex = lexicon();

        // Intent: argmax over pattern-set scores; ties keep the earlier
        // (lexically smaller) intent; all-zero means `general`.
        let mut intent = QueryIntent::General;
        let mut intent_score = 0.0f32;
        for (candidate, set) in &lex.intents {
            let s = score_set(set, &normalized, &stripped);
            if s > intent_score {
                intent_score = s;
                intent = *candidate;
            }
        }

        // Location: cue phrases first, then a direct registry scan.
        let location = self.extract_location(&normalized, &lex.cue);
        // Span of the surface occurrence, consumed before keyword extraction.
        let location_span = location
            .as_deref()
            .and_then(|_| self.registry.find_in(&normalized))
            .map(|m| (m.start, m.len));

        let service_requirements: Vec<String> = lex
            .services
            .iter()
            .filter(|(_, set)| any_match(set, &normalized, &stripped))
            .map(|(tag, _)| (*tag).to_string())
            .collect();

        // Highest pattern count wins; the earlier table row is kept on ties.
        let target_audience = lex
            .targets
            .iter()
            .map(|(tag, set)| (*tag, match_count(set, &normalized, &stripped)))
            .filter(|(_, n)| *n > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then(std::cmp::Ordering::Greater))
            .map(|(tag, _)| tag.to_string());

        let (price_preference, price_literal) = self.extract_price(&normalized, &stripped);

        let keywords = extract_keywords(
            &normalized,
            &stripped,
            location_span,
            price_literal,
            &lex.stop_words,
        );

        let location_signal = if location.is_some() { 1.0 } else { 0.0 };
        let keyword_signal = if keywords.is_empty() { 0.0 } else { 1.0 };
        let confidence =
            (0.5 * intent_score + 0.3 * location_signal + 0.2 * keyword_signal).min(1.0);

        debug!(
            intent = intent.as_str(),
            location = location.as_deref().unwrap_or("-"),
            services = service_requirements.len(),
            confidence,
            "query parsed"
        );

        QueryComponents {
            original: query.to_string(),
            normalized,
            stripped,
            intent,
            location,
            service_requirements,
            target_audience,
            price_preference,
            keywords,
            confidence,
        }
    }

    /// Mechanical Vietnamese explanation of a parse, used by the façade's
    /// `explanations` field.
    pub fn explain(&self, c: &QueryComponents) -> String {
        let mut out = format!("Phân tích truy vấn: '{}'\n", c.original);
        out.push_str(&format!("- Ý định: {}\n", c.intent.as_str()));
        if let Some(loc) = &c.location {
            out.push_str(&format!("- Địa điểm: {loc}\n"));
        }
        if !c.service_requirements.is_empty() {
            out.push_str(&format!(
                "- Yêu cầu dịch vụ: {}\n",
                c.service_requirements.join(", ")
            ));
        }
        if let Some(target) = &c.target_audience {
            out.push_str(&format!("- Đối tượng: {target}\n"));
        }
        if let Some(price) = &c.price_preference {
            out.push_str(&format!("- Phân khúc giá: {}\n", price.as_str()));
        }
        out.push_str(&format!("- Độ tin cậy: {:.2}", c.confidence));
        out
    }

    fn extract_location(&self, normalized: &str, cue: &Regex) -> Option<String> {
        // Cue-anchored captures, earliest resolvable capture wins.
        for caps in cue.captures_iter(normalized) {
            if let Some(candidate) = caps.get(1) {
                if let Some(canonical) = self.registry.resolve(candidate.as_str()) {
                    return Some(canonical.to_string());
                }
            }
        }
        // Direct surface-form scan: earliest hit, longer form on ties.
        self.registry
            .find_in(normalized)
            .map(|m| m.canonical)
    }

    /// First matching bracket wins; at most one preference. Returns the
    /// matched literal (when there is one) so it can be consumed from the
    /// keyword stream.
    fn extract_price(
        &self,
        normalized: &str,
        stripped: &str,
    ) -> (Option<PriceRange>, Option<&'static str>) {
        let lex = lexicon();
        for (tag, set) in &lex.prices {
            for (patterns, form) in [(&set.accented, normalized), (&set.stripped, stripped)] {
                for p in patterns {
                    if p.re.is_match(form) {
                        return (PriceRange::parse_filter(tag), p.literal);
                    }
                }
            }
        }
        (None, None)
    }
}

/// Removes consumed spans and stop words, keeps the remaining tokens in
/// order. Tokens of one or two characters carry little signal in Vietnamese
/// and are dropped; at most ten keywords are kept.
fn extract_keywords(
    normalized: &str,
    stripped: &str,
    location_span: Option<(usize, usize)>,
    price_literal: Option<&str>,
    stop_words: &HashSet<String>,
) -> Vec<String> {
    // Char positions align between the two canonical forms, so the location
    // span computed on the stripped text blanks the normalized copy directly.
    let mut chars: Vec<char> = normalized.chars().collect();
    if let Some((start, len)) = location_span {
        for c in chars.iter_mut().skip(start).take(len) {
            *c = ' ';
        }
    }
    if let Some(lit) = price_literal {
        let lit_stripped = strip_diacritics(lit);
        let stripped_chars: Vec<char> = stripped.chars().collect();
        let needle: Vec<char> = lit_stripped.chars().collect();
        if !needle.is_empty() && needle.len() <= stripped_chars.len() {
            for start in 0..=stripped_chars.len() - needle.len() {
                if stripped_chars[start..start + needle.len()] != needle[..] {
                    continue;
                }
                // Word-bounded occurrences only, so "rẻ" never blanks the
                // tail of "trẻ".
                let left_ok = start == 0 || !stripped_chars[start - 1].is_alphanumeric();
                let end = start + needle.len();
                let right_ok = end == stripped_chars.len() || !stripped_chars[end].is_alphanumeric();
                if left_ok && right_ok {
                    for c in chars.iter_mut().skip(start).take(needle.len()) {
                        *c = ' ';
                    }
                    break;
                }
            }
        }
    }

    let cleaned: String = chars.into_iter().collect();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for token in cleaned.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.chars().count() <= 2 {
            continue;
        }
        let token_stripped = strip_diacritics(token);
        if stop_words.contains(token) || stop_words.contains(&token_stripped) {
            continue;
        }
        if seen.insert(token_stripped) {
            out.push(token.to_string());
        }
        if out.len() == 10 {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new(Arc::new(LocationRegistry::vietnam()))
    }

    #[test]
    fn kid_friendly_dining_query() {
        let c = parser().parse("quán ăn tại hải phòng có chỗ cho trẻ em chơi");
        assert!(matches!(
            c.intent,
            QueryIntent::FindRestaurant | QueryIntent::FindKids
        ));
        assert_eq!(c.location.as_deref(), Some("Hải Phòng"));
        assert!(c.service_requirements.iter().any(|s| s == "kids_friendly"));
        assert!(!c.keywords.is_empty());
        assert!(c.confidence >= 0.6, "confidence = {}", c.confidence);
    }

    #[test]
    fn diacritic_free_query_parses_the_same_location() {
        let a = parser().parse("quán ăn ở hải phòng");
        let b = parser().parse("quan an o hai phong");
        assert_eq!(a.location, b.location);
        assert_eq!(a.intent, b.intent);
    }

    #[test]
    fn hotel_intent_with_price_preference() {
        let c = parser().parse("khách sạn cao cấp ở đà nẵng");
        assert_eq!(c.intent, QueryIntent::FindHotel);
        assert_eq!(c.location.as_deref(), Some("Đà Nẵng"));
        assert_eq!(c.price_preference, Some(PriceRange::Premium));
    }

    #[test]
    fn budget_cue_is_consumed_from_keywords() {
        let c = parser().parse("quán ăn bình dân gần cần thơ");
        assert_eq!(c.price_preference, Some(PriceRange::Budget));
        assert!(c.keywords.iter().all(|k| k != "bình" && k != "dân"));
    }

    #[test]
    fn unmatched_query_degrades_to_general() {
        let c = parser().parse("xyz abc");
        assert_eq!(c.intent, QueryIntent::General);
        assert!(c.location.is_none());
        assert!(c.confidence <= 0.3);
    }

    #[test]
    fn romantic_target_and_service() {
        let c = parser().parse("không gian lãng mạn cho cặp đôi hẹn hò");
        assert!(c.service_requirements.iter().any(|s| s == "romantic"));
        assert_eq!(c.target_audience.as_deref(), Some("couple"));
    }

    #[test]
    fn explain_mentions_intent_and_location() {
        let p = parser();
        let c = p.parse("buffet trẻ em tại hà nội");
        let text = p.explain(&c);
        assert!(text.contains("Ý định"));
        assert!(text.contains("Hà Nội"));
    }
}
