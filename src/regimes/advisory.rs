// 📣 Advisory surcharges - in force, reported, never added to a total

use crate::origin::Origin;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorySurcharge {
    pub authority: &'static str,
    pub hts_heading: &'static str,
    pub rate_pct: f64,
    pub in_effect_from: &'static str,
    pub expires: &'static str,

    /// Free text appended after the standard sentence
    pub caveat: &'static str,
}

impl AdvisorySurcharge {
    pub fn message(&self) -> String {
        format!(
            "{} (HTS {}): temporary {:.0}% global surcharge in effect from {} to {} \
             (150-day limit), applies to ALL origins including China. CBP is actively \
             collecting this duty. NOT included in effective_total_pct. {}",
            self.authority,
            self.hts_heading,
            self.rate_pct,
            self.in_effect_from,
            self.expires,
            self.caveat
        )
    }
}

pub static SECTION_122: AdvisorySurcharge = AdvisorySurcharge {
    authority: "Section 122",
    hts_heading: "9903.03.01",
    rate_pct: 10.0,
    in_effect_from: "2026-02-24",
    expires: "2026-07-24",
    caveat: "Trump has signalled a possible increase to 15%; no proclamation issued yet. \
             Verify with your customs broker before shipment.",
};

/// Advisory messages for an origin
///
/// Section 122 is global, so the list is never empty.
pub fn advisories(_origin: &Origin) -> Vec<String> {
    vec![SECTION_122.message()]
}
