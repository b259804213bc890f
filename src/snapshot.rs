// 📸 Snapshot - Immutable view of the published tariff table at one fetch time
//
// A new fetch produces a new Snapshot; an existing one is never mutated.

use crate::normalize::{clean_raw, clean_text, normalize_code, parse_rate, NormalizedCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// RAW ROW (producer contract)
// ============================================================================

/// One row as handed over by the importer, before normalization
///
/// Every field is optional: a missing column or empty cell is None.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub hts_code: Option<String>,
    pub description: Option<String>,
    pub rate_general_raw: Option<String>,
    pub rate_special_raw: Option<String>,
    pub rate_column2_raw: Option<String>,
}

impl RawRow {
    pub fn new(hts_code: &str, description: &str, rate_general_raw: &str) -> Self {
        RawRow {
            hts_code: Some(hts_code.to_string()),
            description: Some(description.to_string()),
            rate_general_raw: Some(rate_general_raw.to_string()),
            rate_special_raw: None,
            rate_column2_raw: None,
        }
    }
}

// ============================================================================
// SNAPSHOT ROW
// ============================================================================

/// One commodity entry: raw rate strings plus their parsed values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub code: NormalizedCode,
    pub description: Option<String>,

    pub rate_general_raw: Option<String>,
    pub rate_special_raw: Option<String>,
    pub rate_column2_raw: Option<String>,

    /// Parsed general rate (None = could not determine, not zero)
    pub rate_general_value: Option<f64>,
    pub rate_special_value: Option<f64>,
    pub rate_column2_value: Option<f64>,
}

impl SnapshotRow {
    /// Normalize a raw row; None when the code is absent
    pub fn from_raw(raw: &RawRow) -> Option<Self> {
        let code = normalize_code(raw.hts_code.as_deref())?;
        Some(Self::build(
            code,
            raw.description.as_deref(),
            raw.rate_general_raw.as_deref(),
            raw.rate_special_raw.as_deref(),
            raw.rate_column2_raw.as_deref(),
        ))
    }

    /// Row with only a general rate (tests and small callers)
    pub fn new(code: NormalizedCode, description: &str, rate_general_raw: &str) -> Self {
        Self::build(code, Some(description), Some(rate_general_raw), None, None)
    }

    fn build(
        code: NormalizedCode,
        description: Option<&str>,
        general: Option<&str>,
        special: Option<&str>,
        column2: Option<&str>,
    ) -> Self {
        SnapshotRow {
            code,
            description: clean_text(description),
            rate_general_raw: clean_raw(general),
            rate_special_raw: clean_raw(special),
            rate_column2_raw: clean_raw(column2),
            rate_general_value: parse_rate(general),
            rate_special_value: parse_rate(special),
            rate_column2_value: parse_rate(column2),
        }
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot ID
    pub snapshot_id: String,

    /// When the table was fetched
    pub fetched_at: DateTime<Utc>,

    /// Where the table came from (URL, file name)
    pub source: Option<String>,

    /// Rows keyed by code; BTreeMap keeps iteration in code order
    rows: BTreeMap<NormalizedCode, SnapshotRow>,
}

impl Snapshot {
    /// Build a snapshot; a duplicated code keeps the last row seen
    pub fn new<I>(fetched_at: DateTime<Utc>, source: Option<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = SnapshotRow>,
    {
        let mut by_code = BTreeMap::new();
        for row in rows {
            by_code.insert(row.code.clone(), row);
        }

        Snapshot {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            fetched_at,
            source,
            rows: by_code,
        }
    }

    /// Normalize raw rows, dropping those without a usable code
    pub fn from_raw_rows<'a, I>(fetched_at: DateTime<Utc>, source: Option<String>, raw: I) -> Self
    where
        I: IntoIterator<Item = &'a RawRow>,
    {
        let rows = raw.into_iter().filter_map(|r| {
            let row = SnapshotRow::from_raw(r);
            if row.is_none() {
                debug!(hts_code = ?r.hts_code, "row without a usable code dropped");
            }
            row
        });
        Self::new(fetched_at, source, rows)
    }

    /// Snapshot with no rows (first run / nothing fetched)
    pub fn empty() -> Self {
        Self::new(Utc::now(), None, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, code: &NormalizedCode) -> Option<&SnapshotRow> {
        self.rows.get(code)
    }

    pub fn contains(&self, code: &NormalizedCode) -> bool {
        self.rows.contains_key(code)
    }

    /// Rows in ascending code order
    pub fn rows(&self) -> impl Iterator<Item = &SnapshotRow> {
        self.rows.values()
    }

    /// Codes in ascending order
    pub fn codes(&self) -> impl Iterator<Item = &NormalizedCode> {
        self.rows.keys()
    }

    /// Rows whose code starts with any of `prefixes`
    pub fn matching<'a>(
        &'a self,
        prefixes: &'a [NormalizedCode],
    ) -> impl Iterator<Item = &'a SnapshotRow> + 'a {
        self.rows
            .values()
            .filter(move |row| prefixes.iter().any(|p| row.code.has_prefix(p)))
    }

    /// New snapshot restricted to tracked prefixes (tracked_only mode)
    ///
    /// An empty prefix list yields an empty snapshot, never the full table.
    pub fn filter_prefixes(&self, prefixes: &[NormalizedCode]) -> Snapshot {
        Snapshot {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            fetched_at: self.fetched_at,
            source: self.source.clone(),
            rows: self
                .matching(prefixes)
                .map(|row| (row.code.clone(), row.clone()))
                .collect(),
        }
    }

    /// Content hash over code, description and raw rates
    ///
    /// Two snapshots with the same digest diff to an empty change list.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for row in self.rows.values() {
            hasher.update(row.code.as_str());
            for field in [
                &row.description,
                &row.rate_general_raw,
                &row.rate_special_raw,
                &row.rate_column2_raw,
            ] {
                hasher.update(b"\x1f");
                hasher.update(field.as_deref().unwrap_or(""));
            }
            hasher.update(b"\x1e");
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> NormalizedCode {
        NormalizedCode::parse(s).unwrap()
    }

    #[test]
    fn test_row_from_raw_parses_rates() {
        let raw = RawRow {
            hts_code: Some("8542.31.00.00".to_string()),
            description: Some("  IC   processors ".to_string()),
            rate_general_raw: Some(" 5% ".to_string()),
            rate_special_raw: Some("Free".to_string()),
            rate_column2_raw: Some("35¢/kg".to_string()),
        };

        let row = SnapshotRow::from_raw(&raw).unwrap();
        assert_eq!(row.code.as_str(), "8542310000");
        assert_eq!(row.description, Some("IC processors".to_string()));
        assert_eq!(row.rate_general_raw, Some("5%".to_string()));
        assert_eq!(row.rate_general_value, Some(5.0));
        assert_eq!(row.rate_special_value, Some(0.0));
        assert_eq!(row.rate_column2_value, None);
    }

    #[test]
    fn test_row_without_code_is_dropped() {
        let raw = vec![
            RawRow::new("", "Header artefact", ""),
            RawRow::new("0101.21", "Horses", "Free"),
            RawRow::default(),
        ];

        let snapshot = Snapshot::from_raw_rows(Utc::now(), None, &raw);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&code("010121")));
    }

    #[test]
    fn test_duplicate_code_last_write_wins() {
        let snapshot = Snapshot::new(
            Utc::now(),
            None,
            vec![
                SnapshotRow::new(code("8471300000"), "First", "Free"),
                SnapshotRow::new(code("8471.30.00.00"), "Second", "2%"),
            ],
        );

        assert_eq!(snapshot.len(), 1);
        let row = snapshot.get(&code("8471300000")).unwrap();
        assert_eq!(row.description.as_deref(), Some("Second"));
        assert_eq!(row.rate_general_value, Some(2.0));
    }

    #[test]
    fn test_rows_iterate_in_code_order() {
        let snapshot = Snapshot::new(
            Utc::now(),
            None,
            vec![
                SnapshotRow::new(code("8542"), "b", "Free"),
                SnapshotRow::new(code("0101"), "a", "Free"),
                SnapshotRow::new(code("7604"), "c", "Free"),
            ],
        );

        let codes: Vec<&str> = snapshot.codes().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["0101", "7604", "8542"]);
    }

    #[test]
    fn test_filter_prefixes() {
        let snapshot = Snapshot::new(
            Utc::now(),
            Some("test.csv".to_string()),
            vec![
                SnapshotRow::new(code("7604101000"), "Aluminum bars", "5%"),
                SnapshotRow::new(code("7606110000"), "Aluminum plates", "3%"),
                SnapshotRow::new(code("8471300000"), "Laptops", "Free"),
            ],
        );

        let tracked = snapshot.filter_prefixes(&[code("7604"), code("8471.30")]);
        assert_eq!(tracked.len(), 2);
        assert!(tracked.contains(&code("7604101000")));
        assert!(tracked.contains(&code("8471300000")));
        assert_ne!(tracked.snapshot_id, snapshot.snapshot_id);

        // Original untouched
        assert_eq!(snapshot.len(), 3);

        assert!(snapshot.filter_prefixes(&[]).is_empty());
    }

    #[test]
    fn test_digest_tracks_content() {
        let rows = vec![SnapshotRow::new(code("8471300000"), "Laptops", "Free")];
        let a = Snapshot::new(Utc::now(), None, rows.clone());
        let b = Snapshot::new(Utc::now(), Some("other".to_string()), rows);
        let c = Snapshot::new(
            Utc::now(),
            None,
            vec![SnapshotRow::new(code("8471300000"), "Laptops", "2%")],
        );

        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }
}
