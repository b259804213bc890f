// 🧹 Normalizer - HTS codes, rate cells and free text
// Single choke point that turns every "missing" representation into None

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static RATE_FREE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*free\s*$").expect("free regex is valid"));
static RATE_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*%").expect("percent regex is valid"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Literals that upstream exports use for an empty cell
const MISSING_LITERALS: &[&str] = &["nan", "null", "none"];

/// True when a raw cell carries no value at all
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || MISSING_LITERALS
            .iter()
            .any(|lit| trimmed.eq_ignore_ascii_case(lit))
}

// ============================================================================
// NORMALIZED CODE
// ============================================================================

/// HTS code with separators removed, e.g. "0101.21.0010" → "0101210010"
///
/// No zero-padding is applied, so the same value works as an exact key and
/// as a left-prefix ("7604" matches "7604101000"). Can never be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedCode(String);

impl NormalizedCode {
    /// Normalize a raw code; None for empty or NaN-like input
    pub fn parse(raw: &str) -> Option<Self> {
        if is_missing(raw) {
            return None;
        }

        let cleaned: String = raw
            .replace(['.', ' '], "")
            .trim()
            .to_string();

        if cleaned.is_empty() {
            None
        } else {
            Some(NormalizedCode(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 2 characters, or the whole code when shorter
    pub fn chapter(&self) -> &str {
        leading(&self.0, 2)
    }

    /// Leading 4 characters, None when the code is shorter than a heading
    pub fn heading(&self) -> Option<&str> {
        if self.0.chars().count() >= 4 {
            Some(leading(&self.0, 4))
        } else {
            None
        }
    }

    /// Hierarchical match: `prefix` is a left-prefix of this code
    pub fn has_prefix(&self, prefix: &NormalizedCode) -> bool {
        self.0.starts_with(prefix.as_str())
    }

    /// Same as `has_prefix` for static table entries; an empty prefix never matches
    pub fn starts_with_str(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

fn leading(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl fmt::Display for NormalizedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NormalizedCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NormalizedCode::parse(&value).ok_or_else(|| format!("invalid HTS code: {:?}", value))
    }
}

impl From<NormalizedCode> for String {
    fn from(code: NormalizedCode) -> Self {
        code.0
    }
}

// ============================================================================
// FREE FUNCTIONS
// ============================================================================

/// Normalize an optional raw code cell
pub fn normalize_code(raw: Option<&str>) -> Option<NormalizedCode> {
    raw.and_then(NormalizedCode::parse)
}

/// Parse a rate cell into a percentage
///
/// - "Free" (any case) → 0.0
/// - "5%", "12.5% ..." → leading number
/// - compound/specific rates, blanks → None (unparsed, not zero)
pub fn parse_rate(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if is_missing(s) {
        return None;
    }

    if RATE_FREE.is_match(s) {
        return Some(0.0);
    }

    RATE_PERCENT
        .captures(s)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Collapse whitespace runs into one space and trim; empty text becomes None
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if is_missing(raw) {
        return None;
    }
    let cleaned = WHITESPACE_RUN.replace_all(raw, " ").trim().to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Trim a raw cell, mapping empty/NaN-like values to None
pub fn clean_raw(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if is_missing(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> String {
        NormalizedCode::parse(s).unwrap().as_str().to_string()
    }

    #[test]
    fn test_code_strips_dots() {
        assert_eq!(code("8471.30.00.00"), "8471300000");
    }

    #[test]
    fn test_code_strips_spaces() {
        assert_eq!(code("8471 30 0000"), "8471300000");
        assert_eq!(code("  0101.21  "), "010121");
    }

    #[test]
    fn test_code_absent_for_empty_and_nan() {
        assert!(normalize_code(None).is_none());
        assert!(NormalizedCode::parse("").is_none());
        assert!(NormalizedCode::parse("   ").is_none());
        assert!(NormalizedCode::parse(". .").is_none());
        assert!(NormalizedCode::parse("NaN").is_none());
    }

    #[test]
    fn test_code_is_idempotent() {
        for raw in ["0101.21.0010", "8471 30 0000", "7604", "72.08.10", "ab.c"] {
            let once = NormalizedCode::parse(raw).unwrap();
            let twice = NormalizedCode::parse(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_code_keeps_non_digits() {
        assert_eq!(code("84A1.30"), "84A130");
    }

    #[test]
    fn test_chapter_and_heading() {
        let c = NormalizedCode::parse("7604.10.1000").unwrap();
        assert_eq!(c.chapter(), "76");
        assert_eq!(c.heading(), Some("7604"));

        let short = NormalizedCode::parse("7").unwrap();
        assert_eq!(short.chapter(), "7");
        assert_eq!(short.heading(), None);
    }

    #[test]
    fn test_prefix_matching() {
        let c = NormalizedCode::parse("7604101000").unwrap();
        let chapter = NormalizedCode::parse("7604").unwrap();
        let other = NormalizedCode::parse("7605").unwrap();

        assert!(c.has_prefix(&chapter));
        assert!(!c.has_prefix(&other));
        assert!(!c.starts_with_str(""));
    }

    #[test]
    fn test_parse_rate_free() {
        assert_eq!(parse_rate(Some("Free")), Some(0.0));
        assert_eq!(parse_rate(Some("FREE")), Some(0.0));
        assert_eq!(parse_rate(Some("free")), Some(0.0));
    }

    #[test]
    fn test_parse_rate_percent() {
        assert_eq!(parse_rate(Some("5%")), Some(5.0));
        assert_eq!(parse_rate(Some("12.5%")), Some(12.5));
        assert_eq!(parse_rate(Some(" 6.8% + 2¢/kg")), Some(6.8));
    }

    #[test]
    fn test_parse_rate_absent() {
        assert_eq!(parse_rate(Some("Special compound rate")), None);
        assert_eq!(parse_rate(Some("2.5¢/kg")), None);
        assert_eq!(parse_rate(Some("")), None);
        assert_eq!(parse_rate(None), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  foo   bar  ")), Some("foo bar".to_string()));
        assert_eq!(clean_text(Some("a\n\tb")), Some("a b".to_string()));
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_serde_rejects_empty_code() {
        let ok: NormalizedCode = serde_json::from_str("\"8471.30\"").unwrap();
        assert_eq!(ok.as_str(), "847130");
        assert!(serde_json::from_str::<NormalizedCode>("\"\"").is_err());
    }
}
