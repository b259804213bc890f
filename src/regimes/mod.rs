// 🏛️ Duty Regimes - Independent rule evaluators stacked by the overlay
//
// Each regime is a pure function of (normalized code, origin). Reference
// tables are static data, initialized once and never mutated.
//
// Evaluation order (see overlay::compute_overlay):
//   1. Section 232  - geographic surcharge, all origins except USMCA
//   2. Section 301  - origin-specific surcharge, China only
//   3. AD/CVD       - order lookup, reported as worst case, not additive
//   4. Compliance   - agency flags, informational
//   5. Section 122  - advisory only, never numeric

pub mod advisory;
pub mod adcvd;
pub mod compliance;
pub mod section232;
pub mod section301;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use advisory::{advisories, AdvisorySurcharge, SECTION_122};
pub use adcvd::{
    all_orders, lookup_adcvd, orders_by_chapter, AdcvdExposure, AdcvdOrder, OrderKind, OrderStatus,
    ADCVD_ORDERS,
};
pub use compliance::{
    assess_uflpa, compliance_flags, compliance_report, ComplianceReport, ComplianceRequirement,
    UflpaLevel, UflpaRisk,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Section232,
    Section301,
}

impl Regime {
    pub fn name(&self) -> &'static str {
        match self {
            Regime::Section232 => "Section 232",
            Regime::Section301 => "Section 301",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one additive regime contributes to an overlay
///
/// `notes` is provenance: present when the regime applies and also when it
/// is explicitly waived, so absence is as visible as presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub regime: Regime,
    pub applies: bool,
    pub percentage: f64,
    pub notes: Vec<String>,
}

impl Contribution {
    /// Regime charges `percentage`
    pub fn charged(regime: Regime, percentage: f64, note: String) -> Self {
        Contribution {
            regime,
            applies: true,
            percentage,
            notes: vec![note],
        }
    }

    /// Regime would apply to the code but the origin is exempt
    pub fn waived(regime: Regime, note: String) -> Self {
        Contribution {
            regime,
            applies: false,
            percentage: 0.0,
            notes: vec![note],
        }
    }

    /// Regime has nothing to say about this code/origin
    pub fn not_applicable(regime: Regime) -> Self {
        Contribution {
            regime,
            applies: false,
            percentage: 0.0,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}
