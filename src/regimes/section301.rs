// Section 301 (Trade Act of 1974) - China-specific surcharge
//
// Two tiers: List 4B for apparel/footwear chapters, Lists 1-4A for the rest.
// The struck-down IEEPA duties are always disclosed as not applied.

use super::{Contribution, Regime};
use crate::normalize::NormalizedCode;
use crate::origin::Origin;

/// List 4B: apparel, footwear, certain textile articles
pub const LIST_4B_PCT: f64 = 7.5;
pub const LIST_4B_CHAPTERS: &[&str] = &["61", "62", "63", "64"];

/// Lists 1-4A: all other goods
pub const DEFAULT_PCT: f64 = 25.0;

pub const IEEPA_DISCLOSURE: &str = "IEEPA tariffs (fentanyl/reciprocal) struck down by SCOTUS on 2026-02-20; \
     CBP stopped collection 2026-02-24. NOT applied here.";

pub fn evaluate(code: &NormalizedCode, origin: &Origin) -> Contribution {
    if !origin.is_china() {
        return Contribution::not_applicable(Regime::Section301);
    }

    let chapter = code.chapter();
    let contribution = if LIST_4B_CHAPTERS.contains(&chapter) {
        Contribution::charged(
            Regime::Section301,
            LIST_4B_PCT,
            format!(
                "Section 301 (Trade Act of 1974) List 4B, apparel/footwear ch. {}: +{:.1}%",
                chapter, LIST_4B_PCT
            ),
        )
    } else {
        Contribution::charged(
            Regime::Section301,
            DEFAULT_PCT,
            format!("Section 301 (Trade Act of 1974) Lists 1-4A: +{:.0}%", DEFAULT_PCT),
        )
    };

    contribution.with_note(IEEPA_DISCLOSURE.to_string())
}
