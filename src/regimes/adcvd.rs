// ⚖️ AD/CVD - Anti-dumping and countervailing duty order catalogue
//
// Curated active orders against China (Commerce Dept. ITA). Rates are the
// "all others" rate applied to exporters without an individual rate from an
// administrative review. Actual rates are company-specific.
//
// Exposure is the MAX all-others rate across matching orders, not the sum:
// overlapping orders describe the same underlying risk.

use crate::normalize::NormalizedCode;
use crate::origin::Origin;
use crate::risk::RiskTier;
use serde::Serialize;

// ============================================================================
// ORDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderKind {
    #[serde(rename = "AD")]
    Ad,
    #[serde(rename = "CVD")]
    Cvd,
    #[serde(rename = "AD+CVD")]
    AdCvd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdcvdOrder {
    pub case_number: &'static str,
    pub order_kind: OrderKind,
    pub product_description: &'static str,

    /// ISO-2 country the order is against
    pub country: &'static str,

    /// 4-digit HTS headings covered
    pub hts_prefixes: &'static [&'static str],

    pub rate_range_low_pct: f64,
    pub rate_range_high_pct: f64,

    /// Default rate absent an individual determination
    pub all_others_rate_pct: f64,

    pub effective_date: &'static str,
    pub status: OrderStatus,
    pub federal_register_citation: &'static str,
    pub notes: &'static [&'static str],
}

impl AdcvdOrder {
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Any covered prefix is a left-prefix of `code`
    pub fn covers(&self, code: &NormalizedCode) -> bool {
        self.hts_prefixes.iter().any(|p| code.starts_with_str(p))
    }

    pub fn rate_range(&self) -> String {
        format!("{:.1}%-{:.1}%", self.rate_range_low_pct, self.rate_range_high_pct)
    }
}

const CHINA: &str = "CN";

pub static ADCVD_ORDERS: &[AdcvdOrder] = &[
    // ── Aluminum ─────────────────────────────────────────────────────────────
    AdcvdOrder {
        case_number: "A-570-967 / C-570-968",
        order_kind: OrderKind::AdCvd,
        product_description: "Aluminum Extrusions",
        country: CHINA,
        hts_prefixes: &["7604", "7608", "7610", "7615", "7616"],
        rate_range_low_pct: 32.79,
        rate_range_high_pct: 374.15,
        all_others_rate_pct: 32.79,
        effective_date: "2011-05-26",
        status: OrderStatus::Active,
        federal_register_citation: "76 FR 30650",
        notes: &[
            "Covers profiles, bars, pipes, tubes, and fabricated shapes",
            "CVD rate for 'all others' is up to 374.15% for some producers",
        ],
    },
    AdcvdOrder {
        case_number: "A-570-053",
        order_kind: OrderKind::Ad,
        product_description: "Common Alloy Aluminum Sheet",
        country: CHINA,
        hts_prefixes: &["7606"],
        rate_range_low_pct: 49.43,
        rate_range_high_pct: 176.2,
        all_others_rate_pct: 59.31,
        effective_date: "2021-04-08",
        status: OrderStatus::Active,
        federal_register_citation: "86 FR 18195",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-116 / C-570-117",
        order_kind: OrderKind::AdCvd,
        product_description: "Aluminum Foil",
        country: CHINA,
        hts_prefixes: &["7607"],
        rate_range_low_pct: 19.34,
        rate_range_high_pct: 106.09,
        all_others_rate_pct: 48.64,
        effective_date: "2018-03-15",
        status: OrderStatus::Active,
        federal_register_citation: "83 FR 11647",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-075 / C-570-076",
        order_kind: OrderKind::AdCvd,
        product_description: "Aluminum Wire and Cable",
        country: CHINA,
        hts_prefixes: &["7605", "7614", "8544"],
        rate_range_low_pct: 58.51,
        rate_range_high_pct: 188.56,
        all_others_rate_pct: 58.51,
        effective_date: "2019-11-01",
        status: OrderStatus::Active,
        federal_register_citation: "84 FR 58460",
        notes: &[],
    },
    // ── Steel ────────────────────────────────────────────────────────────────
    AdcvdOrder {
        case_number: "A-570-504",
        order_kind: OrderKind::Ad,
        product_description: "Steel Wire Rope",
        country: CHINA,
        hts_prefixes: &["7312"],
        rate_range_low_pct: 12.56,
        rate_range_high_pct: 44.99,
        all_others_rate_pct: 44.99,
        effective_date: "1992-03-25",
        status: OrderStatus::Active,
        federal_register_citation: "57 FR 10012",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-900 / C-570-901",
        order_kind: OrderKind::AdCvd,
        product_description: "Steel Nails",
        country: CHINA,
        hts_prefixes: &["7317"],
        rate_range_low_pct: 21.24,
        rate_range_high_pct: 118.04,
        all_others_rate_pct: 118.04,
        effective_date: "2008-07-14",
        status: OrderStatus::Active,
        federal_register_citation: "73 FR 40303",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-894 / C-570-895",
        order_kind: OrderKind::AdCvd,
        product_description: "Circular Welded Steel Pipe",
        country: CHINA,
        hts_prefixes: &["7306"],
        rate_range_low_pct: 29.57,
        rate_range_high_pct: 85.55,
        all_others_rate_pct: 85.55,
        effective_date: "2008-06-17",
        status: OrderStatus::Active,
        federal_register_citation: "73 FR 34170",
        notes: &[],
    },
    // ── Kitchen / Hardware ───────────────────────────────────────────────────
    AdcvdOrder {
        case_number: "A-570-998 / C-570-999",
        order_kind: OrderKind::AdCvd,
        product_description: "Steel Racks / Kitchen Shelving",
        country: CHINA,
        hts_prefixes: &["7321", "7323", "7326"],
        rate_range_low_pct: 50.09,
        rate_range_high_pct: 119.63,
        all_others_rate_pct: 119.63,
        effective_date: "2012-05-03",
        status: OrderStatus::Active,
        federal_register_citation: "77 FR 26240",
        notes: &["Includes wire shelving, bakers racks, utility carts"],
    },
    AdcvdOrder {
        case_number: "A-570-890",
        order_kind: OrderKind::Ad,
        product_description: "Steel Wire Garment Hangers",
        country: CHINA,
        hts_prefixes: &["7326"],
        rate_range_low_pct: 15.39,
        rate_range_high_pct: 187.25,
        all_others_rate_pct: 187.25,
        effective_date: "2008-01-30",
        status: OrderStatus::Active,
        federal_register_citation: "73 FR 5478",
        notes: &[],
    },
    // ── Other ────────────────────────────────────────────────────────────────
    AdcvdOrder {
        case_number: "A-570-979 / C-570-980",
        order_kind: OrderKind::AdCvd,
        product_description: "Crystalline Silicon Photovoltaic Cells",
        country: CHINA,
        hts_prefixes: &["8541"],
        rate_range_low_pct: 15.97,
        rate_range_high_pct: 238.95,
        all_others_rate_pct: 238.95,
        effective_date: "2012-12-07",
        status: OrderStatus::Active,
        federal_register_citation: "77 FR 73018",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-601",
        order_kind: OrderKind::Ad,
        product_description: "Tapered Roller Bearings",
        country: CHINA,
        hts_prefixes: &["8482"],
        rate_range_low_pct: 2.71,
        rate_range_high_pct: 66.00,
        all_others_rate_pct: 66.00,
        effective_date: "1987-06-19",
        status: OrderStatus::Active,
        federal_register_citation: "52 FR 23321",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-847",
        order_kind: OrderKind::Ad,
        product_description: "Wooden Bedroom Furniture",
        country: CHINA,
        hts_prefixes: &["9403"],
        rate_range_low_pct: 0.0,
        rate_range_high_pct: 198.08,
        all_others_rate_pct: 198.08,
        effective_date: "2005-01-04",
        status: OrderStatus::Active,
        federal_register_citation: "70 FR 329",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-082 / C-570-083",
        order_kind: OrderKind::AdCvd,
        product_description: "Quartz Surface Products",
        country: CHINA,
        hts_prefixes: &["6810"],
        rate_range_low_pct: 45.32,
        rate_range_high_pct: 294.57,
        all_others_rate_pct: 294.57,
        effective_date: "2019-04-18",
        status: OrderStatus::Active,
        federal_register_citation: "84 FR 16543",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-831",
        order_kind: OrderKind::Ad,
        product_description: "Honey",
        country: CHINA,
        hts_prefixes: &["0409"],
        rate_range_low_pct: 25.88,
        rate_range_high_pct: 183.80,
        all_others_rate_pct: 183.80,
        effective_date: "2001-12-10",
        status: OrderStatus::Active,
        federal_register_citation: "66 FR 63670",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-909",
        order_kind: OrderKind::Ad,
        product_description: "Laminated Woven Sacks",
        country: CHINA,
        hts_prefixes: &["6305"],
        rate_range_low_pct: 64.28,
        rate_range_high_pct: 91.73,
        all_others_rate_pct: 91.73,
        effective_date: "2008-07-11",
        status: OrderStatus::Active,
        federal_register_citation: "73 FR 40117",
        notes: &[],
    },
    AdcvdOrder {
        case_number: "A-570-075",
        order_kind: OrderKind::Ad,
        product_description: "Polyester Textured Yarn",
        country: CHINA,
        hts_prefixes: &["5402"],
        rate_range_low_pct: 32.85,
        rate_range_high_pct: 56.11,
        all_others_rate_pct: 56.11,
        effective_date: "2020-03-19",
        status: OrderStatus::Active,
        federal_register_citation: "85 FR 15769",
        notes: &[],
    },
];

// ============================================================================
// EXPOSURE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdcvdExposure {
    pub code: String,
    pub origin: String,
    pub matching_orders: Vec<&'static AdcvdOrder>,

    /// Highest all-others rate among matching orders (0 when none)
    pub estimated_additional_pct: f64,
    pub risk_level: RiskTier,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl AdcvdExposure {
    pub fn has_orders(&self) -> bool {
        !self.matching_orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.matching_orders.len()
    }
}

/// Orders covering `code`; only evaluated for the flagged origin
pub fn lookup_adcvd(code: &NormalizedCode, origin: &Origin) -> AdcvdExposure {
    let matching_orders: Vec<&'static AdcvdOrder> = if origin.is_china() {
        ADCVD_ORDERS
            .iter()
            .filter(|order| order.is_active() && order.covers(code))
            .collect()
    } else {
        Vec::new()
    };

    let estimated = matching_orders
        .iter()
        .map(|order| order.all_others_rate_pct)
        .fold(0.0_f64, f64::max);

    let warning = if matching_orders.is_empty() {
        None
    } else {
        Some(format!(
            "AD/CVD duties could add +{:.1}% on top of all other duties. This is the \
             'all others' rate; your actual rate depends on Commerce Dept. administrative \
             review. Consult a trade attorney or customs broker.",
            estimated
        ))
    };

    AdcvdExposure {
        code: code.as_str().to_string(),
        origin: origin.raw.clone(),
        matching_orders,
        estimated_additional_pct: estimated,
        risk_level: RiskTier::from_pct(estimated),
        warning,
    }
}

/// Every active order for the flagged origin; empty for other origins
pub fn all_orders(origin: &Origin) -> Vec<&'static AdcvdOrder> {
    if !origin.is_china() {
        return Vec::new();
    }
    ADCVD_ORDERS.iter().filter(|o| o.is_active()).collect()
}

/// Active orders with a covered prefix inside `chapter`
///
/// An empty chapter returns nothing rather than the whole table.
pub fn orders_by_chapter(chapter: &str, origin: &Origin) -> Vec<&'static AdcvdOrder> {
    let chapter = chapter.trim();
    if chapter.is_empty() || !origin.is_china() {
        return Vec::new();
    }
    ADCVD_ORDERS
        .iter()
        .filter(|o| o.is_active() && o.hts_prefixes.iter().any(|p| p.starts_with(chapter)))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
