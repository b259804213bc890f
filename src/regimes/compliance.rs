// 📋 Compliance - Regulatory agency flags, UFLPA risk and origin marking
//
// Informational only: nothing here contributes to a duty percentage.
// Requirements are keyed by 2-digit HTS chapter.

use crate::normalize::NormalizedCode;
use crate::origin::Origin;
use serde::Serialize;

// ============================================================================
// REGULATORY REQUIREMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceRequirement {
    /// "CPSC", "FDA", "FCC", ...
    pub agency: &'static str,
    pub requirement: &'static str,
    #[serde(skip)]
    pub chapters: &'static [&'static str],
    pub mandatory: bool,
    pub notes: &'static [&'static str],
}

impl ComplianceRequirement {
    pub fn covers_chapter(&self, chapter: &str) -> bool {
        self.chapters.contains(&chapter)
    }
}

pub static COMPLIANCE_MAP: &[ComplianceRequirement] = &[
    // Toys & children's products
    ComplianceRequirement {
        agency: "CPSC",
        requirement: "Children's Product Certificate (CPC) + ASTM F963 testing",
        chapters: &["95"],
        mandatory: true,
        notes: &[
            "Third-party testing by CPSC-accepted lab required",
            "Lead content, phthalate, and small parts testing mandatory",
            "General Certificate of Conformity (GCC) for non-children's toys",
        ],
    },
    ComplianceRequirement {
        agency: "CPSC",
        requirement: "Flammability standards (16 CFR 1610/1611) for textiles",
        chapters: &["61", "62", "63"],
        mandatory: true,
        notes: &[
            "Applies to clothing, curtains, upholstery fabric",
            "Children's sleepwear has additional requirements (16 CFR 1615/1616)",
        ],
    },
    // Electronics
    ComplianceRequirement {
        agency: "FCC",
        requirement: "FCC Part 15: unintentional/intentional radiator testing",
        chapters: &["84", "85"],
        mandatory: true,
        notes: &[
            "All electronic devices that emit RF need FCC authorization",
            "Three paths: Certification, SDoC (Supplier's Declaration), or Verification",
            "FCC ID label required on device",
        ],
    },
    ComplianceRequirement {
        agency: "UL / NRTL",
        requirement: "UL listing for electrical products (voluntary but expected by retailers)",
        chapters: &["84", "85"],
        mandatory: false,
        notes: &[
            "Amazon requires UL certification for many electrical categories",
            "Not legally mandatory but practically required for US market",
        ],
    },
    // Food & beverages
    ComplianceRequirement {
        agency: "FDA",
        requirement: "FDA Prior Notice + Food Facility Registration + FSVP",
        chapters: &["04", "07", "08", "09", "16", "17", "18", "19", "20", "21"],
        mandatory: true,
        notes: &[
            "Prior Notice must be filed before arrival at US port",
            "Foreign Supplier Verification Program (FSVP) for importer of record",
            "Acidified and low-acid canned foods need separate registration",
        ],
    },
    // Cosmetics
    ComplianceRequirement {
        agency: "FDA",
        requirement: "MoCRA facility registration + product listing + adverse event reporting",
        chapters: &["33"],
        mandatory: true,
        notes: &[
            "Modernization of Cosmetics Regulation Act (MoCRA) effective 2024",
            "Facility registration and product listing now mandatory",
            "Safety substantiation required",
        ],
    },
    // Pharmaceuticals / supplements
    ComplianceRequirement {
        agency: "FDA",
        requirement: "Drug/supplement registration + NDC labeling + cGMP",
        chapters: &["30"],
        mandatory: true,
        notes: &[
            "OTC drugs need NDC number",
            "Dietary supplements need structure/function claims review",
        ],
    },
    // Footwear
    ComplianceRequirement {
        agency: "FTC",
        requirement: "Footwear labeling (material composition)",
        chapters: &["64"],
        mandatory: true,
        notes: &["Upper, outsole, and lining material must be disclosed"],
    },
    // Automotive parts
    ComplianceRequirement {
        agency: "DOT / NHTSA",
        requirement: "FMVSS compliance for motor vehicle equipment",
        chapters: &["87"],
        mandatory: true,
        notes: &[
            "Tires, lighting, braking components need DOT marking",
            "Importer must file HS-7 declaration",
        ],
    },
    // Chemicals
    ComplianceRequirement {
        agency: "EPA / TSCA",
        requirement: "TSCA certification: chemical substance compliance",
        chapters: &["28", "29", "38"],
        mandatory: true,
        notes: &[
            "All chemical imports must certify TSCA compliance at entry",
            "EPA Form 3520-21 required",
            "Positive TSCA certification for listed substances",
        ],
    },
    // Solar panels / batteries
    ComplianceRequirement {
        agency: "DOE",
        requirement: "Energy efficiency standards + DOE test procedures",
        chapters: &["85"],
        mandatory: false,
        notes: &[
            "Certain appliances, motors, lighting products",
            "Energy Guide labels for covered products",
        ],
    },
    // Furniture
    ComplianceRequirement {
        agency: "CPSC / EPA",
        requirement: "CPSC furniture tip-over standards + EPA TSCA Title VI formaldehyde",
        chapters: &["94"],
        mandatory: true,
        notes: &[
            "Composite wood products need TSCA Title VI formaldehyde certification",
            "Clothing storage furniture needs ASTM F2057 tip-over stability",
        ],
    },
];

/// Chapter used for table lookups; codes shorter than 2 digits match nothing
fn lookup_chapter(code: &NormalizedCode) -> &str {
    let chapter = code.chapter();
    if chapter.chars().count() == 2 {
        chapter
    } else {
        ""
    }
}

fn requirements_for(chapter: &str) -> Vec<&'static ComplianceRequirement> {
    COMPLIANCE_MAP
        .iter()
        .filter(|req| req.covers_chapter(chapter))
        .collect()
}

fn distinct_agencies(reqs: &[&'static ComplianceRequirement]) -> Vec<&'static str> {
    let mut agencies: Vec<&'static str> = reqs.iter().map(|r| r.agency).collect();
    agencies.sort_unstable();
    agencies.dedup();
    agencies
}

/// Sorted, distinct agency labels for the code's chapter
pub fn compliance_flags(code: &NormalizedCode) -> Vec<&'static str> {
    distinct_agencies(&requirements_for(lookup_chapter(code)))
}

// ============================================================================
// UFLPA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UflpaLevel {
    None,
    Low,
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UflpaRisk {
    pub risk_level: UflpaLevel,

    /// What triggered the flag
    pub commodity_flag: &'static str,

    /// Expected CBP behavior
    pub cbp_action: &'static str,

    pub mitigation: &'static [&'static str],
}

/// Forced-labor detention risk; only China origin is assessed
pub fn assess_uflpa(chapter: &str, origin: &Origin) -> UflpaRisk {
    if !origin.is_china() {
        return UflpaRisk {
            risk_level: UflpaLevel::None,
            commodity_flag: "Non-China origin",
            cbp_action: "UFLPA does not apply",
            mitigation: &[],
        };
    }

    match chapter {
        "52" | "61" | "62" | "63" => UflpaRisk {
            risk_level: UflpaLevel::Extreme,
            commodity_flag: "Cotton / cotton textile products",
            cbp_action: "High probability of WRO detention; CBP actively targeting cotton from Xinjiang",
            mitigation: &[
                "Provide full supply chain traceability documentation",
                "Use isotope testing to prove non-Xinjiang origin of cotton",
                "Obtain third-party audit of ginning, spinning, and weaving facilities",
                "Consider sourcing cotton from non-China origins",
            ],
        },
        "85" => UflpaRisk {
            risk_level: UflpaLevel::Extreme,
            commodity_flag: "Solar cells / polysilicon products",
            cbp_action: "High probability of WRO detention; CBP actively targeting polysilicon from Xinjiang",
            mitigation: &[
                "Provide polysilicon supply chain mapping to ingot level",
                "Third-party audit of polysilicon sourcing (non-XUAR)",
                "Consider using non-China polysilicon wafers",
            ],
        },
        "20" => UflpaRisk {
            risk_level: UflpaLevel::High,
            commodity_flag: "Tomato products",
            cbp_action: "WRO in effect for Xinjiang tomato products; detention likely",
            mitigation: &[
                "Provide evidence of non-Xinjiang sourcing",
                "Third-party supply chain audit",
            ],
        },
        "67" => UflpaRisk {
            risk_level: UflpaLevel::High,
            commodity_flag: "Human hair products",
            cbp_action: "WRO issued against specific Chinese hair product manufacturers",
            mitigation: &[
                "Verify manufacturer is not on WRO entity list",
                "Document sourcing of raw hair material",
            ],
        },
        "76" => UflpaRisk {
            risk_level: UflpaLevel::Medium,
            commodity_flag: "Aluminum products",
            cbp_action: "CBP has flagged some aluminum from XUAR; not systematic detention",
            mitigation: &[
                "Document smelter location and bauxite source",
                "Prepare supply chain map if CBP requests",
            ],
        },
        "39" => UflpaRisk {
            risk_level: UflpaLevel::Medium,
            commodity_flag: "Plastics / PVC products",
            cbp_action: "Some PVC supply chains linked to XUAR; CBP may request documentation",
            mitigation: &[
                "Prepare documentation of PVC resin sourcing",
                "Third-party audit if supply chain touches Xinjiang",
            ],
        },
        _ => UflpaRisk {
            risk_level: UflpaLevel::Low,
            commodity_flag: "General merchandise",
            cbp_action: "No specific UFLPA targeting; standard entry processing",
            mitigation: &[
                "Maintain basic supply chain records",
                "Be prepared to respond to CBP inquiries",
            ],
        },
    }
}

// ============================================================================
// ORIGIN MARKING (19 USC 1304)
// ============================================================================

pub const MARKING_RULE: &str = "19 USC §1304: All imported articles must be conspicuously marked \
     with the English name of the country of origin (e.g. 'Made in China'). Marking must be \
     legible, indelible, and in a location where it will be seen by the ultimate purchaser.";

pub const MARKING_EXCEPTIONS: &[&str] = &[
    "Articles incapable of being marked (e.g. bulk chemicals)",
    "Articles that would be substantially damaged by marking",
    "Crude substances",
    "Articles imported for the use of the importer and not for resale",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkingRule {
    pub rule: &'static str,
    pub exceptions: &'static [&'static str],
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    /// Code as given by the caller
    pub code: String,
    pub origin: String,
    pub chapter: String,
    pub regulatory_requirements: Vec<&'static ComplianceRequirement>,
    pub regulatory_agencies: Vec<&'static str>,
    pub uflpa_risk: UflpaRisk,
    pub marking: MarkingRule,
    pub notes: Vec<String>,
}

pub fn compliance_report(code: &str, origin: &Origin) -> ComplianceReport {
    let chapter = NormalizedCode::parse(code)
        .map(|c| lookup_chapter(&c).to_string())
        .unwrap_or_default();

    let reqs = requirements_for(&chapter);
    let agencies = distinct_agencies(&reqs);
    let uflpa_risk = assess_uflpa(&chapter, origin);

    let mut notes = Vec::new();
    if reqs.is_empty() {
        notes.push(format!(
            "No specific product safety requirements mapped for HTS chapter {}. \
             This does not mean the product is unregulated; consult a compliance specialist.",
            chapter
        ));
    }
    if origin.is_china() {
        notes.push(
            "China-origin products face elevated CBP scrutiny. Ensure country-of-origin \
             marking is correct and all certifications are current."
                .to_string(),
        );
    }

    ComplianceReport {
        code: code.to_string(),
        origin: origin.raw.clone(),
        chapter,
        regulatory_requirements: reqs,
        regulatory_agencies: agencies,
        uflpa_risk,
        marking: MarkingRule {
            rule: MARKING_RULE,
            exceptions: MARKING_EXCEPTIONS,
        },
        notes,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(code: &str) -> Vec<&'static str> {
        compliance_flags(&NormalizedCode::parse(code).unwrap())
    }

    #[test]
    fn test_electronics_flags_sorted_and_distinct() {
        assert_eq!(flags("8517.62.0090"), vec!["DOE", "FCC", "UL / NRTL"]);
        assert_eq!(flags("8471300000"), vec!["FCC", "UL / NRTL"]);
    }

    #[test]
    fn test_fda_chapters_collapse_to_one_flag() {
        assert_eq!(flags("2002100000"), vec!["FDA"]);
        assert_eq!(flags("3304990000"), vec!["FDA"]);
    }

    #[test]
    fn test_unmapped_chapter_has_no_flags() {
        assert!(flags("7208101500").is_empty());
        assert!(flags("7").is_empty());
    }

    #[test]
    fn test_uflpa_non_china_is_none() {
        let risk = assess_uflpa("61", &Origin::new("VN"));
        assert_eq!(risk.risk_level, UflpaLevel::None);
        assert!(risk.mitigation.is_empty());
    }

    #[test]
    fn test_uflpa_levels_for_china() {
        let cn = Origin::new("cn");
        assert_eq!(assess_uflpa("52", &cn).risk_level, UflpaLevel::Extreme);
        assert_eq!(assess_uflpa("85", &cn).risk_level, UflpaLevel::Extreme);
        assert_eq!(assess_uflpa("20", &cn).risk_level, UflpaLevel::High);
        assert_eq!(assess_uflpa("67", &cn).risk_level, UflpaLevel::High);
        assert_eq!(assess_uflpa("76", &cn).risk_level, UflpaLevel::Medium);
        assert_eq!(assess_uflpa("39", &cn).risk_level, UflpaLevel::Medium);
        assert_eq!(assess_uflpa("95", &cn).risk_level, UflpaLevel::Low);
    }

    #[test]
    fn test_report_for_toys_from_china() {
        let report = compliance_report("9503.00.0013", &Origin::new("CN"));
        assert_eq!(report.chapter, "95");
        assert_eq!(report.regulatory_agencies, vec!["CPSC"]);
        assert_eq!(report.uflpa_risk.risk_level, UflpaLevel::Low);
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains("elevated CBP scrutiny"));
        assert_eq!(report.marking.exceptions.len(), 4);
    }

    #[test]
    fn test_report_unmapped_chapter_note() {
        let report = compliance_report("7208101500", &Origin::new("DE"));
        assert!(report.regulatory_requirements.is_empty());
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains("chapter 72"));
    }

    #[test]
    fn test_report_tolerates_garbage_code() {
        let report = compliance_report("", &Origin::new("CN"));
        assert_eq!(report.chapter, "");
        assert!(report.regulatory_requirements.is_empty());
    }

    #[test]
    fn test_report_serialization_skips_chapter_keys() {
        let report = compliance_report("6403990000", &Origin::new("CN"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["uflpa_risk"]["risk_level"], "low");
        assert_eq!(json["regulatory_requirements"][0]["agency"], "FTC");
        assert!(json["regulatory_requirements"][0].get("chapters").is_none());
    }
}
