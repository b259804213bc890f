// Section 232 (Trade Expansion Act) - steel and aluminum surcharge
//
// Applies to every origin except USMCA partners, who get an explicit
// waiver note instead of silence.

use super::{Contribution, Regime};
use crate::normalize::NormalizedCode;
use crate::origin::Origin;

pub const STEEL_PCT: f64 = 25.0;
pub const STEEL_CHAPTERS: &[&str] = &["72", "73"];

pub const ALUMINUM_PCT: f64 = 10.0;
pub const ALUMINUM_CHAPTERS: &[&str] = &["76"];

/// Metal covered by a chapter, with its surcharge
fn covered_metal(chapter: &str) -> Option<(&'static str, f64)> {
    if STEEL_CHAPTERS.contains(&chapter) {
        Some(("steel", STEEL_PCT))
    } else if ALUMINUM_CHAPTERS.contains(&chapter) {
        Some(("aluminum", ALUMINUM_PCT))
    } else {
        None
    }
}

pub fn evaluate(code: &NormalizedCode, origin: &Origin) -> Contribution {
    let (metal, pct) = match covered_metal(code.chapter()) {
        Some(covered) => covered,
        None => return Contribution::not_applicable(Regime::Section232),
    };

    if origin.is_usmca() {
        return Contribution::waived(
            Regime::Section232,
            format!(
                "Section 232 {} tariff waived: {} is a USMCA partner",
                metal,
                origin.display_name()
            ),
        );
    }

    Contribution::charged(
        Regime::Section232,
        pct,
        format!("Section 232 (Trade Expansion Act s. 232) {}: +{:.0}%", metal, pct),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(code: &str, origin: &str) -> Contribution {
        evaluate(&NormalizedCode::parse(code).unwrap(), &Origin::new(origin))
    }

    #[test]
    fn test_steel_from_non_exempt_origin() {
        let c = eval("7208.10.1500", "DE");
        assert!(c.applies);
        assert_eq!(c.percentage, 25.0);
        assert!(c.notes[0].contains("steel"));
    }

    #[test]
    fn test_aluminum_rate() {
        let c = eval("7604101000", "VN");
        assert_eq!(c.percentage, 10.0);
        assert!(c.notes[0].contains("aluminum"));
    }

    #[test]
    fn test_usmca_waiver_has_note() {
        let c = eval("7306", "Canada");
        assert!(!c.applies);
        assert_eq!(c.percentage, 0.0);
        assert_eq!(c.notes.len(), 1);
        assert!(c.notes[0].contains("waived"));
        assert!(c.notes[0].contains("Canada"));
    }

    #[test]
    fn test_other_chapter_is_silent() {
        let c = eval("8471300000", "CN");
        assert!(!c.applies);
        assert!(c.notes.is_empty());
    }
}
