//! Vietnamese text normalization.
//!
//! Two canonical forms are produced for every piece of query or voucher text:
//! - `normalize`: NFC, lowercased, whitespace-collapsed, control characters
//!   removed, punctuation reduced to a small token-delimiting set. Diacritics
//!   are retained.
//! - `strip_diacritics`: the normalized form with Vietnamese diacritics folded
//!   away through a fixed table (`hải phòng` -> `hai phong`).
//!
//! Both transformations are pure and never fail; empty input yields empty
//! output.

use unicode_normalization::UnicodeNormalization;

/// Punctuation retained because it delimits meaningful tokens
/// (prices `100.000`, ranges `10-20`, grouping `()` `[]`, alternatives `/`).
const KEPT_PUNCT: &[char] = &['-', '.', ',', '(', ')', '[', ']', '/'];

/// Canonicalizes raw text: Unicode NFC, lowercase, single spaces, no control
/// characters, punctuation outside [`KEPT_PUNCT`] replaced by a separator.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.nfc() {
        if c.is_control() {
            continue;
        }
        if c.is_whitespace() {
            out.push(' ');
            continue;
        }
        if c.is_alphanumeric() || KEPT_PUNCT.contains(&c) {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            // Dropped punctuation still separates tokens.
            out.push(' ');
        }
    }
    collapse_spaces(&out)
}

/// Folds Vietnamese diacritics to their base letters. Applied on top of
/// [`normalize`] to obtain the secondary matching form.
pub fn strip_diacritics(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Convenience: both canonical forms at once.
pub fn canonical_forms(raw: &str) -> (String, String) {
    let normalized = normalize(raw);
    let stripped = strip_diacritics(&normalized);
    (normalized, stripped)
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true; // also trims leading spaces
    for c in s.chars() {
        if c == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Fixed folding table for the Vietnamese alphabet. Input is expected to be
/// NFC (precomposed); `normalize` guarantees that.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'ạ' | 'ả' | 'ã' | 'â' | 'ầ' | 'ấ' | 'ậ' | 'ẩ' | 'ẫ' | 'ă' | 'ằ' | 'ắ'
        | 'ặ' | 'ẳ' | 'ẵ' => 'a',
        'è' | 'é' | 'ẹ' | 'ẻ' | 'ẽ' | 'ê' | 'ề' | 'ế' | 'ệ' | 'ể' | 'ễ' => 'e',
        'ì' | 'í' | 'ị' | 'ỉ' | 'ĩ' => 'i',
        'ò' | 'ó' | 'ọ' | 'ỏ' | 'õ' | 'ô' | 'ồ' | 'ố' | 'ộ' | 'ổ' | 'ỗ' | 'ơ' | 'ờ' | 'ớ'
        | 'ợ' | 'ở' | 'ỡ' => 'o',
        'ù' | 'ú' | 'ụ' | 'ủ' | 'ũ' | 'ư' | 'ừ' | 'ứ' | 'ự' | 'ử' | 'ữ' => 'u',
        'ỳ' | 'ý' | 'ỵ' | 'ỷ' | 'ỹ' => 'y',
        'đ' => 'd',
        'À' | 'Á' | 'Ạ' | 'Ả' | 'Ã' | 'Â' | 'Ầ' | 'Ấ' | 'Ậ' | 'Ẩ' | 'Ẫ' | 'Ă' | 'Ằ' | 'Ắ'
        | 'Ặ' | 'Ẳ' | 'Ẵ' => 'A',
        'È' | 'É' | 'Ẹ' | 'Ẻ' | 'Ẽ' | 'Ê' | 'Ề' | 'Ế' | 'Ệ' | 'Ể' | 'Ễ' => 'E',
        'Ì' | 'Í' | 'Ị' | 'Ỉ' | 'Ĩ' => 'I',
        'Ò' | 'Ó' | 'Ọ' | 'Ỏ' | 'Õ' | 'Ô' | 'Ồ' | 'Ố' | 'Ộ' | 'Ổ' | 'Ỗ' | 'Ơ' | 'Ờ' | 'Ớ'
        | 'Ợ' | 'Ở' | 'Ỡ' => 'O',
        'Ù' | 'Ú' | 'Ụ' | 'Ủ' | 'Ũ' | 'Ư' | 'Ừ' | 'Ứ' | 'Ự' | 'Ử' | 'Ữ' => 'U',
        'Ỳ' | 'Ý' | 'Ỵ' | 'Ỷ' | 'Ỹ' => 'Y',
        'Đ' => 'D',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(strip_diacritics(""), "");
    }

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Quán   Ăn \t NGON \n"), "quán ăn ngon");
    }

    #[test]
    fn folds_full_vietnamese_vowel_set() {
        assert_eq!(strip_diacritics("hải phòng"), "hai phong");
        assert_eq!(strip_diacritics("đà nẵng"), "da nang");
        assert_eq!(strip_diacritics("hồ chí minh"), "ho chi minh");
        assert_eq!(strip_diacritics("nghỉ dưỡng ở huế"), "nghi duong o hue");
    }

    #[test]
    fn keeps_token_delimiting_punctuation() {
        assert_eq!(normalize("combo 2-3 người, giá 100.000đ"), "combo 2-3 người, giá 100.000đ");
        assert_eq!(normalize("buffet (trưa/tối)"), "buffet (trưa/tối)");
    }

    #[test]
    fn drops_other_punctuation_as_separator() {
        assert_eq!(normalize("ngon!?  rẻ…"), "ngon rẻ");
        assert_eq!(normalize("spa\"cao cấp\""), "spa cao cấp");
    }

    #[test]
    fn recomposes_before_folding() {
        // "ê" written as "e" + combining circumflex must fold like the
        // precomposed character.
        let decomposed = "que\u{0302}";
        assert_eq!(strip_diacritics(&normalize(decomposed)), "que");
    }

    #[test]
    fn canonical_forms_pair() {
        let (n, s) = canonical_forms("Quán ăn TẠI Hải Phòng!");
        assert_eq!(n, "quán ăn tại hải phòng");
        assert_eq!(s, "quan an tai hai phong");
    }
}
