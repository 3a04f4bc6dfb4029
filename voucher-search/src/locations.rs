//! Registry of Vietnamese administrative areas.
//!
//! Immutable after construction and freely shareable across requests. Maps
//! surface spellings (with or without diacritics, including common aliases
//! like `hcm` and `sài gòn`) to canonical names and carries region and
//! neighbor metadata used by the geographic re-ranker.

use crate::normalize::{normalize, strip_diacritics};

/// One administrative area.
#[derive(Clone, Debug)]
pub struct LocationEntry {
    /// Canonical display spelling, e.g. `Hải Phòng`.
    pub canonical: String,
    /// Accepted surface spellings (normalized, diacritics retained).
    pub surface_forms: Vec<String>,
    /// Region name, e.g. `Miền Bắc`.
    pub region: String,
    /// Canonical names of symbolically adjacent areas.
    pub neighbors: Vec<String>,
}

/// A surface-form hit inside a longer text.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationMatch {
    pub canonical: String,
    /// Char offset of the match in the scanned text.
    pub start: usize,
    /// Matched surface form length in chars.
    pub len: usize,
}

/// Immutable lookup table over [`LocationEntry`] rows.
pub struct LocationRegistry {
    entries: Vec<LocationEntry>,
    // (stripped surface, entry index), used for all matching.
    surfaces: Vec<(String, usize)>,
}

impl LocationRegistry {
    /// Builds a registry from explicit rows. Surface forms are normalized on
    /// the way in; the canonical spelling always matches itself.
    pub fn new(rows: Vec<LocationEntry>) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        let mut surfaces = Vec::new();
        for (i, mut row) in rows.into_iter().enumerate() {
            let canon_norm = normalize(&row.canonical);
            if !row.surface_forms.iter().any(|s| *s == canon_norm) {
                row.surface_forms.push(canon_norm);
            }
            for form in &row.surface_forms {
                surfaces.push((strip_diacritics(&normalize(form)), i));
            }
            entries.push(row);
        }
        Self { entries, surfaces }
    }

    /// Default table covering the cities the voucher inventory spans.
    pub fn vietnam() -> Self {
        fn row(
            canonical: &str,
            surfaces: &[&str],
            region: &str,
            neighbors: &[&str],
        ) -> LocationEntry {
            LocationEntry {
                canonical: canonical.to_string(),
                surface_forms: surfaces.iter().map(|s| s.to_string()).collect(),
                region: region.to_string(),
                neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
            }
        }

        Self::new(vec![
            row(
                "Hà Nội",
                &["hà nội", "ha noi", "hanoi"],
                "Miền Bắc",
                &["Hải Phòng"],
            ),
            row(
                "Hải Phòng",
                &["hải phòng", "hai phong", "haiphong"],
                "Miền Bắc",
                &["Hà Nội"],
            ),
            row(
                "Đà Nẵng",
                &["đà nẵng", "da nang", "danang"],
                "Miền Trung",
                &["Huế"],
            ),
            row(
                "Hồ Chí Minh",
                &["hồ chí minh", "ho chi minh", "hcm", "sài gòn", "sai gon", "saigon"],
                "Miền Nam",
                &["Vũng Tàu", "Cần Thơ"],
            ),
            row(
                "Cần Thơ",
                &["cần thơ", "can tho"],
                "Miền Nam",
                &["Hồ Chí Minh"],
            ),
            row(
                "Nha Trang",
                &["nha trang"],
                "Miền Trung",
                &["Đà Lạt"],
            ),
            row(
                "Vũng Tàu",
                &["vũng tàu", "vung tau"],
                "Miền Nam",
                &["Hồ Chí Minh"],
            ),
            row("Huế", &["huế", "hue"], "Miền Trung", &["Đà Nẵng"]),
            row(
                "Đà Lạt",
                &["đà lạt", "da lat", "dalat"],
                "Miền Nam",
                &["Nha Trang"],
            ),
        ])
    }

    /// Resolves a location phrase to its canonical name.
    ///
    /// Case- and diacritic-insensitive. Containment runs both ways so a
    /// truncated capture (`"hải"`) still resolves; among multiple hits the
    /// longest surface form wins.
    pub fn resolve(&self, text: &str) -> Option<&str> {
        let probe = strip_diacritics(&normalize(text));
        if probe.is_empty() {
            return None;
        }
        let mut best: Option<(usize, usize)> = None; // (surface len, entry idx)
        for (surface, idx) in &self.surfaces {
            let hit = contains_word(&probe, surface) || contains_word(surface, &probe);
            if hit {
                let len = surface.chars().count();
                if best.map(|(l, _)| len > l).unwrap_or(true) {
                    best = Some((len, *idx));
                }
            }
        }
        best.map(|(_, idx)| self.entries[idx].canonical.as_str())
    }

    /// Scans a longer text for any surface form and returns the best hit:
    /// earliest in the string, longer surface form on ties.
    pub fn find_in(&self, text: &str) -> Option<LocationMatch> {
        let stripped = strip_diacritics(&normalize(text));
        let chars: Vec<char> = stripped.chars().collect();
        let mut best: Option<LocationMatch> = None;
        for (surface, idx) in &self.surfaces {
            if let Some(start) = find_word(&chars, surface) {
                let len = surface.chars().count();
                let better = match &best {
                    None => true,
                    Some(b) => start < b.start || (start == b.start && len > b.len),
                };
                if better {
                    best = Some(LocationMatch {
                        canonical: self.entries[*idx].canonical.clone(),
                        start,
                        len,
                    });
                }
            }
        }
        best
    }

    /// Region of a canonical name.
    pub fn region_of(&self, canonical: &str) -> Option<&str> {
        self.entry(canonical).map(|e| e.region.as_str())
    }

    /// Symbolic neighbors of a canonical name.
    pub fn neighbors_of(&self, canonical: &str) -> &[String] {
        self.entry(canonical).map(|e| e.neighbors.as_slice()).unwrap_or(&[])
    }

    /// Diacritic-stripped surface forms of a canonical name, for
    /// content-mention checks in the re-ranker.
    pub fn stripped_surface_forms(&self, canonical: &str) -> Vec<String> {
        let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.canonical == canonical)
        else {
            return Vec::new();
        };
        self.surfaces
            .iter()
            .filter(|(_, idx)| *idx == pos)
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// True when `canonical` names a registered area.
    pub fn is_known(&self, canonical: &str) -> bool {
        self.entry(canonical).is_some()
    }

    /// True when any surface form of `canonical` occurs (word-bounded,
    /// diacritic-insensitive) inside `text`.
    pub fn text_mentions(&self, canonical: &str, text: &str) -> bool {
        let folded = strip_diacritics(&normalize(text));
        let chars: Vec<char> = folded.chars().collect();
        self.stripped_surface_forms(canonical)
            .iter()
            .any(|surface| find_word(&chars, surface).is_some())
    }

    fn entry(&self, canonical: &str) -> Option<&LocationEntry> {
        self.entries.iter().find(|e| e.canonical == canonical)
    }
}

/// Word-bounded containment over stripped text.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let chars: Vec<char> = haystack.chars().collect();
    find_word(&chars, needle).is_some()
}

/// Finds `needle` in `haystack` requiring non-alphanumeric (or edge)
/// boundaries on both sides, so `hue` never matches inside `thue`.
fn find_word(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    for start in 0..=haystack.len() - needle.len() {
        if haystack[start..start + needle.len()] != needle[..] {
            continue;
        }
        let left_ok = start == 0 || !haystack[start - 1].is_alphanumeric();
        let end = start + needle.len();
        let right_ok = end == haystack.len() || !haystack[end].is_alphanumeric();
        if left_ok && right_ok {
            return Some(start);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_with_and_without_diacritics() {
        let reg = LocationRegistry::vietnam();
        assert_eq!(reg.resolve("Hải Phòng"), Some("Hải Phòng"));
        assert_eq!(reg.resolve("hai phong"), Some("Hải Phòng"));
        assert_eq!(reg.resolve("SAIGON"), Some("Hồ Chí Minh"));
        assert_eq!(reg.resolve("hcm"), Some("Hồ Chí Minh"));
        assert_eq!(reg.resolve("mặt trăng"), None);
    }

    #[test]
    fn find_in_prefers_earliest_then_longest() {
        let reg = LocationRegistry::vietnam();
        let hit = reg.find_in("vé tàu đà nẵng đi huế").unwrap();
        assert_eq!(hit.canonical, "Đà Nẵng");
        // `sai gon` and `saigon` both appear; longest surface wins at a tie.
        let hit = reg.find_in("khách sạn sai gon").unwrap();
        assert_eq!(hit.canonical, "Hồ Chí Minh");
    }

    #[test]
    fn word_boundaries_prevent_substring_hits() {
        let reg = LocationRegistry::vietnam();
        // "thuê" strips to "thue" which contains "hue" mid-word.
        assert_eq!(reg.find_in("cho thuê xe máy"), None);
    }

    #[test]
    fn region_and_neighbor_metadata() {
        let reg = LocationRegistry::vietnam();
        assert_eq!(reg.region_of("Hải Phòng"), Some("Miền Bắc"));
        assert_eq!(reg.region_of("Cần Thơ"), Some("Miền Nam"));
        assert!(
            reg.neighbors_of("Hà Nội")
                .iter()
                .any(|n| n == "Hải Phòng")
        );
        assert!(reg.neighbors_of("unknown").is_empty());
    }
}
