// 🌐 Origin - Country-of-origin alias matching
//
// "CN", "CHN", "China", "中国" → all the same origin.
// Matching is on the trimmed, uppercased input against closed alias sets.

use serde::{Deserialize, Serialize};

/// Aliases for the origin targeted by Section 301 and the AD/CVD table
pub const CHINA_ALIASES: &[&str] = &["CN", "CHN", "CHINA", "中国", "PRC"];

/// USMCA partners, exempt from Section 232
pub const USMCA_ALIASES: &[&str] = &["CA", "MX", "CAN", "MEX", "CANADA", "MEXICO"];

const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("CN", "China"),
    ("CHN", "China"),
    ("CHINA", "China"),
    ("中国", "China"),
    ("PRC", "China"),
    ("US", "USA"),
    ("USA", "USA"),
    ("CA", "Canada"),
    ("CAN", "Canada"),
    ("CANADA", "Canada"),
    ("MX", "Mexico"),
    ("MEX", "Mexico"),
    ("MEXICO", "Mexico"),
    ("VN", "Vietnam"),
    ("VNM", "Vietnam"),
    ("VIETNAM", "Vietnam"),
    ("IN", "India"),
    ("IND", "India"),
    ("INDIA", "India"),
    ("BD", "Bangladesh"),
    ("BGD", "Bangladesh"),
    ("DE", "Germany"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("TH", "Thailand"),
    ("ID", "Indonesia"),
    ("MY", "Malaysia"),
    ("PH", "Philippines"),
    ("PK", "Pakistan"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Input as given by the caller
    pub raw: String,

    /// Trimmed, uppercased matching key
    pub key: String,
}

impl Origin {
    pub fn new(raw: &str) -> Self {
        Origin {
            raw: raw.to_string(),
            key: raw.trim().to_uppercase(),
        }
    }

    /// True when the key is one of `aliases`
    pub fn matches(&self, aliases: &[&str]) -> bool {
        aliases.iter().any(|alias| *alias == self.key)
    }

    pub fn is_china(&self) -> bool {
        self.matches(CHINA_ALIASES)
    }

    pub fn is_usmca(&self) -> bool {
        self.matches(USMCA_ALIASES)
    }

    /// Display name for known origins, otherwise the input unchanged
    pub fn display_name(&self) -> String {
        DISPLAY_NAMES
            .iter()
            .find(|(key, _)| *key == self.key)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| self.raw.clone())
    }
}

impl From<&str> for Origin {
    fn from(raw: &str) -> Self {
        Origin::new(raw)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_china_aliases() {
        for raw in ["CN", "cn", " chn ", "China", "中国", "prc"] {
            assert!(Origin::new(raw).is_china(), "{} should match China", raw);
        }
        assert!(!Origin::new("TW").is_china());
        assert!(!Origin::new("Chinatown").is_china());
    }

    #[test]
    fn test_usmca_aliases() {
        assert!(Origin::new("ca").is_usmca());
        assert!(Origin::new("Mexico").is_usmca());
        assert!(!Origin::new("US").is_usmca());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Origin::new("chn").display_name(), "China");
        assert_eq!(Origin::new("MEX").display_name(), "Mexico");
        assert_eq!(Origin::new("Freedonia").display_name(), "Freedonia");
    }

    #[test]
    fn test_empty_origin_matches_nothing() {
        let origin = Origin::new("  ");
        assert!(!origin.is_china());
        assert!(!origin.is_usmca());
    }
}
