// 🧮 Tariff Overlay - Stack duty regimes on a base MFN rate
//
// effective_total = base + Section 232 + Section 301
// worst_case      = effective_total + AD/CVD estimate
//
// Advisory surcharges (Section 122) go to `advisory` only. A consumer reading
// `effective_total_pct` never sees them.

use crate::normalize::NormalizedCode;
use crate::origin::Origin;
use crate::regimes::{
    adcvd::{lookup_adcvd, AdcvdOrder},
    advisory::advisories,
    compliance::compliance_flags,
    section232, section301, Contribution, Regime,
};
use crate::risk::RiskTier;
use serde::{Serialize, Serializer};
use tracing::debug;

fn round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

/// AD/CVD sub-result, present only when an order matched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdcvdSection {
    #[serde(serialize_with = "round2")]
    pub estimated_additional_pct: f64,
    pub risk_level: RiskTier,
    pub matching_orders_count: usize,
    #[serde(serialize_with = "round2")]
    pub worst_case_total_pct: f64,
    pub warning: String,
    pub orders: Vec<&'static AdcvdOrder>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffOverlay {
    pub origin: String,
    pub origin_display: String,

    /// Normalized code (or the trimmed input when it does not normalize)
    pub code: String,

    #[serde(serialize_with = "round2")]
    pub base_mfn_pct: f64,
    #[serde(serialize_with = "round2")]
    pub section_232_pct: f64,
    #[serde(serialize_with = "round2")]
    pub section_301_pct: f64,
    #[serde(serialize_with = "round2")]
    pub total_additional_pct: f64,
    #[serde(serialize_with = "round2")]
    pub effective_total_pct: f64,
    #[serde(serialize_with = "round2")]
    pub worst_case_total_pct: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub adcvd: Option<AdcvdSection>,

    pub compliance_flags: Vec<String>,

    /// Ordered provenance notes; never empty
    pub notes: Vec<String>,

    /// Surcharges in force but excluded from every numeric field
    pub advisory: Vec<String>,
}

impl TariffOverlay {
    pub fn adcvd_estimated_pct(&self) -> f64 {
        self.adcvd.as_ref().map_or(0.0, |a| a.estimated_additional_pct)
    }

    pub fn adcvd_risk(&self) -> RiskTier {
        self.adcvd.as_ref().map_or(RiskTier::None, |a| a.risk_level)
    }
}

/// Compute the confirmed, in-force duty stack for one code and origin
///
/// Never fails: an unparseable code matches nothing, an unknown origin gets
/// zero surcharges and a neutral note, a non-finite base counts as 0.
pub fn compute_overlay(code: &str, origin: &str, base_rate_pct: f64) -> TariffOverlay {
    let origin = Origin::new(origin);
    let normalized = NormalizedCode::parse(code);
    let code_str = match &normalized {
        Some(c) => c.as_str().to_string(),
        None => code.trim().to_string(),
    };

    let mut notes: Vec<String> = Vec::new();

    let base = if base_rate_pct.is_finite() {
        base_rate_pct
    } else {
        notes.push("Base MFN rate unavailable; treated as 0%".to_string());
        0.0
    };

    let (s232, s301) = match &normalized {
        Some(c) => (section232::evaluate(c, &origin), section301::evaluate(c, &origin)),
        None => (
            Contribution::not_applicable(Regime::Section232),
            Contribution::not_applicable(Regime::Section301),
        ),
    };

    let surcharge_notes_before = notes.len();
    notes.extend(s232.notes.iter().cloned());
    notes.extend(s301.notes.iter().cloned());
    if notes.len() == surcharge_notes_before {
        notes.push(format!(
            "No additional Section 232 or 301 duties for origin: {}",
            origin.display_name()
        ));
    }

    let total_additional = s232.percentage + s301.percentage;
    let effective_total = base + total_additional;

    let exposure = normalized.as_ref().map(|c| lookup_adcvd(c, &origin));
    let adcvd = match exposure {
        Some(exp) if exp.has_orders() => {
            let estimate = exp.estimated_additional_pct;
            let worst_case = effective_total + estimate;
            notes.push(format!(
                "⚠ AD/CVD: {} active order(s), 'all others' rate up to +{:.1}%. \
                 Company-specific rate may differ.",
                exp.order_count(),
                estimate
            ));
            Some(AdcvdSection {
                estimated_additional_pct: estimate,
                risk_level: exp.risk_level,
                matching_orders_count: exp.order_count(),
                worst_case_total_pct: worst_case,
                warning: format!(
                    "AD/CVD duties could add +{:.1}% on top of all other duties \
                     (worst case: {:.1}%). Actual rate is company-specific; consult a \
                     trade attorney.",
                    estimate, worst_case
                ),
                orders: exp.matching_orders,
            })
        }
        _ => None,
    };

    let flags: Vec<String> = normalized
        .as_ref()
        .map(|c| compliance_flags(c).into_iter().map(String::from).collect())
        .unwrap_or_default();
    if !flags.is_empty() {
        notes.push(format!("Regulatory agencies: {}", flags.join(", ")));
    }

    let worst_case_total =
        effective_total + adcvd.as_ref().map_or(0.0, |a| a.estimated_additional_pct);

    debug!(
        code = %code_str,
        origin = %origin.key,
        effective_total,
        worst_case_total,
        "overlay computed"
    );

    TariffOverlay {
        origin_display: origin.display_name(),
        advisory: advisories(&origin),
        origin: origin.raw,
        code: code_str,
        base_mfn_pct: base,
        section_232_pct: s232.percentage,
        section_301_pct: s301.percentage,
        total_additional_pct: total_additional,
        effective_total_pct: effective_total,
        worst_case_total_pct: worst_case_total,
        adcvd,
        compliance_flags: flags,
        notes,
    }
}

// ============================================================================
// TESTS
// ============================================================================
