// Risk tier for an estimated additional duty percentage

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    None,     // 0
    Low,      // (0, 20)
    Moderate, // [20, 50)
    High,     // [50, 150)
    Extreme,  // [150, ∞)
}

impl RiskTier {
    /// Classify a percentage; total over every f64
    ///
    /// Zero, negatives and NaN are `None` (nothing to report).
    pub fn from_pct(pct: f64) -> Self {
        if pct.is_nan() || pct <= 0.0 {
            RiskTier::None
        } else if pct < 20.0 {
            RiskTier::Low
        } else if pct < 50.0 {
            RiskTier::Moderate
        } else if pct < 150.0 {
            RiskTier::High
        } else {
            RiskTier::Extreme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::None => "none",
            RiskTier::Low => "low",
            RiskTier::Moderate => "moderate",
            RiskTier::High => "high",
            RiskTier::Extreme => "extreme",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(RiskTier::from_pct(0.0), RiskTier::None);
        assert_eq!(RiskTier::from_pct(0.01), RiskTier::Low);
        assert_eq!(RiskTier::from_pct(19.9), RiskTier::Low);
        assert_eq!(RiskTier::from_pct(20.0), RiskTier::Moderate);
        assert_eq!(RiskTier::from_pct(49.99), RiskTier::Moderate);
        assert_eq!(RiskTier::from_pct(50.0), RiskTier::High);
        assert_eq!(RiskTier::from_pct(149.9), RiskTier::High);
        assert_eq!(RiskTier::from_pct(150.0), RiskTier::Extreme);
    }

    #[test]
    fn test_extremes_do_not_panic() {
        assert_eq!(RiskTier::from_pct(f64::MAX), RiskTier::Extreme);
        assert_eq!(RiskTier::from_pct(f64::INFINITY), RiskTier::Extreme);
        assert_eq!(RiskTier::from_pct(f64::NAN), RiskTier::None);
        assert_eq!(RiskTier::from_pct(-5.0), RiskTier::None);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskTier::Moderate).unwrap(), "\"moderate\"");
        assert_eq!(RiskTier::Extreme.to_string(), "extreme");
    }
}
