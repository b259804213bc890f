// 🔀 Snapshot Differ - Week-over-week change detection
//
// Compares two snapshots keyed by normalized code. Pure function, no I/O.
// Output order: added, removed, then changed rows, each group in code order.

use crate::normalize::NormalizedCode;
use crate::snapshot::{Snapshot, SnapshotRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

// ============================================================================
// CHANGE TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Code only in the current snapshot
    Added,

    /// Code only in the previous snapshot
    Removed,

    /// Raw general-rate text differs (textual comparison)
    RateChanged,

    /// Whitespace-normalized description differs
    DescriptionChanged,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::RateChanged => "rate_changed",
            ChangeType::DescriptionChanged => "description_changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(ChangeType::Added),
            "removed" => Some(ChangeType::Removed),
            "rate_changed" => Some(ChangeType::RateChanged),
            "description_changed" => Some(ChangeType::DescriptionChanged),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CHANGE RECORD
// ============================================================================

/// Value channel of a change: parsed rate or description text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeValue {
    Rate(f64),
    Text(String),
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeValue::Rate(pct) => write!(f, "{}%", pct),
            ChangeValue::Text(text) => f.write_str(text),
        }
    }
}

/// One row-level change
///
/// `old_value`/`new_value` carry the parsed channel (rate or description),
/// `old_raw`/`new_raw` the raw general-rate text. Report formatters use both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub code: NormalizedCode,
    pub change_type: ChangeType,
    pub old_value: Option<ChangeValue>,
    pub new_value: Option<ChangeValue>,
    pub old_raw: Option<String>,
    pub new_raw: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ChangeRecord {
    fn added(row: &SnapshotRow, detected_at: DateTime<Utc>) -> Self {
        ChangeRecord {
            code: row.code.clone(),
            change_type: ChangeType::Added,
            old_value: None,
            new_value: row.description.clone().map(ChangeValue::Text),
            old_raw: None,
            new_raw: row.rate_general_raw.clone(),
            detected_at,
            notes: Some("New HTS code detected".to_string()),
        }
    }

    fn removed(row: &SnapshotRow, detected_at: DateTime<Utc>) -> Self {
        ChangeRecord {
            code: row.code.clone(),
            change_type: ChangeType::Removed,
            old_value: row.description.clone().map(ChangeValue::Text),
            new_value: None,
            old_raw: row.rate_general_raw.clone(),
            new_raw: None,
            detected_at,
            notes: Some("HTS code no longer present".to_string()),
        }
    }

    fn rate_changed(prev: &SnapshotRow, curr: &SnapshotRow, detected_at: DateTime<Utc>) -> Self {
        let notes = match (prev.rate_general_value, curr.rate_general_value) {
            (Some(_), None) => Some("New rate could not be parsed (compound or specific rate)".to_string()),
            (None, Some(_)) => Some("Previous rate could not be parsed".to_string()),
            _ => None,
        };

        ChangeRecord {
            code: curr.code.clone(),
            change_type: ChangeType::RateChanged,
            old_value: prev.rate_general_value.map(ChangeValue::Rate),
            new_value: curr.rate_general_value.map(ChangeValue::Rate),
            old_raw: prev.rate_general_raw.clone(),
            new_raw: curr.rate_general_raw.clone(),
            detected_at,
            notes,
        }
    }

    fn description_changed(
        code: &NormalizedCode,
        old: &str,
        new: &str,
        detected_at: DateTime<Utc>,
    ) -> Self {
        ChangeRecord {
            code: code.clone(),
            change_type: ChangeType::DescriptionChanged,
            old_value: non_empty(old).map(ChangeValue::Text),
            new_value: non_empty(new).map(ChangeValue::Text),
            old_raw: None,
            new_raw: None,
            detected_at,
            notes: None,
        }
    }

    /// Rate delta in percentage points when both sides parsed
    pub fn rate_delta(&self) -> Option<f64> {
        match (&self.old_value, &self.new_value) {
            (Some(ChangeValue::Rate(old)), Some(ChangeValue::Rate(new))) => Some(new - old),
            _ => None,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ============================================================================
// DIFF
// ============================================================================

/// Classify row-level changes between two snapshots
///
/// An empty snapshot on either side means "no baseline" and yields no
/// changes. A code in both can produce a rate change and a description
/// change in the same pass; they are emitted together, rate first.
pub fn diff(previous: &Snapshot, current: &Snapshot, detected_at: DateTime<Utc>) -> Vec<ChangeRecord> {
    if previous.is_empty() {
        debug!("previous snapshot is empty; no baseline to compare");
        return Vec::new();
    }
    if current.is_empty() {
        debug!("current snapshot is empty; no baseline to compare");
        return Vec::new();
    }

    let mut changes = Vec::new();

    for row in current.rows().filter(|r| !previous.contains(&r.code)) {
        changes.push(ChangeRecord::added(row, detected_at));
    }

    for row in previous.rows().filter(|r| !current.contains(&r.code)) {
        changes.push(ChangeRecord::removed(row, detected_at));
    }

    for prev_row in previous.rows() {
        let curr_row = match current.get(&prev_row.code) {
            Some(row) => row,
            None => continue,
        };

        let old_rate = prev_row.rate_general_raw.as_deref().map(str::trim);
        let new_rate = curr_row.rate_general_raw.as_deref().map(str::trim);
        if old_rate != new_rate {
            changes.push(ChangeRecord::rate_changed(prev_row, curr_row, detected_at));
        }

        let old_desc = prev_row.description.as_deref().unwrap_or("").trim();
        let new_desc = curr_row.description.as_deref().unwrap_or("").trim();
        if old_desc != new_desc {
            changes.push(ChangeRecord::description_changed(
                &prev_row.code,
                old_desc,
                new_desc,
                detected_at,
            ));
        }
    }

    let summary = DiffSummary::from_changes(&changes);
    info!(
        added = summary.added,
        removed = summary.removed,
        rate_changed = summary.rate_changed,
        description_changed = summary.description_changed,
        "diff complete"
    );

    changes
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub rate_changed: usize,
    pub description_changed: usize,
}

impl DiffSummary {
    pub fn from_changes(changes: &[ChangeRecord]) -> Self {
        let mut summary = DiffSummary::default();
        for change in changes {
            match change.change_type {
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::RateChanged => summary.rate_changed += 1,
                ChangeType::DescriptionChanged => summary.description_changed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.added + self.removed + self.rate_changed + self.description_changed
    }

    pub fn summary(&self) -> String {
        format!(
            "{} changes: {} added, {} removed, {} rate changes, {} description changes",
            self.total(),
            self.added,
            self.removed,
            self.rate_changed,
            self.description_changed
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn code(s: &str) -> NormalizedCode {
        NormalizedCode::parse(s).unwrap()
    }

    fn snapshot(rows: &[(&str, &str, &str)]) -> Snapshot {
        Snapshot::new(
            Utc::now(),
            None,
            rows.iter()
                .map(|(c, d, r)| SnapshotRow::new(code(c), d, r))
                .collect::<Vec<_>>(),
        )
    }

    fn prev() -> Snapshot {
        snapshot(&[
            ("8471300000", "Portable machines", "Free"),
            ("8542310000", "IC processors", "Free"),
            ("0101210000", "Breeding horses", "Free"),
        ])
    }

    fn current() -> Snapshot {
        snapshot(&[
            ("8471300000", "Portable machines", "Free"),
            ("8542310000", "IC processors updated", "5%"),
            ("0202300050", "Frozen boneless beef", "26.4%"),
        ])
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn of_type(changes: &[ChangeRecord], t: ChangeType) -> Vec<&ChangeRecord> {
        changes.iter().filter(|c| c.change_type == t).collect()
    }

    #[test]
    fn test_detects_added() {
        let changes = diff(&prev(), &current(), at());
        let added = of_type(&changes, ChangeType::Added);

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].code.as_str(), "0202300050");
        assert_eq!(added[0].old_value, None);
        assert_eq!(
            added[0].new_value,
            Some(ChangeValue::Text("Frozen boneless beef".to_string()))
        );
        assert_eq!(added[0].new_raw.as_deref(), Some("26.4%"));
    }

    #[test]
    fn test_detects_removed() {
        let changes = diff(&prev(), &current(), at());
        let removed = of_type(&changes, ChangeType::Removed);

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].code.as_str(), "0101210000");
        assert_eq!(removed[0].new_value, None);
        assert_eq!(removed[0].old_raw.as_deref(), Some("Free"));
    }

    #[test]
    fn test_detects_rate_change() {
        let changes = diff(&prev(), &current(), at());
        let rate = of_type(&changes, ChangeType::RateChanged);

        assert_eq!(rate.len(), 1);
        let c = rate[0];
        assert_eq!(c.code.as_str(), "8542310000");
        assert_eq!(c.old_raw.as_deref(), Some("Free"));
        assert_eq!(c.new_raw.as_deref(), Some("5%"));
        assert_eq!(c.old_value, Some(ChangeValue::Rate(0.0)));
        assert_eq!(c.new_value, Some(ChangeValue::Rate(5.0)));
        assert_eq!(c.rate_delta(), Some(5.0));
        assert_eq!(c.detected_at, at());
    }

    #[test]
    fn test_rate_and_description_change_both_fire() {
        let changes = diff(&prev(), &current(), at());
        let for_code: Vec<&ChangeRecord> = changes
            .iter()
            .filter(|c| c.code.as_str() == "8542310000")
            .collect();

        assert_eq!(for_code.len(), 2);
        assert_eq!(for_code[0].change_type, ChangeType::RateChanged);
        assert_eq!(for_code[1].change_type, ChangeType::DescriptionChanged);
        assert_eq!(
            for_code[1].new_value,
            Some(ChangeValue::Text("IC processors updated".to_string()))
        );
    }

    #[test]
    fn test_changes_for_same_code_are_adjacent() {
        let changes = diff(&prev(), &current(), at());
        let positions: Vec<usize> = changes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.code.as_str() == "8542310000")
            .map(|(i, _)| i)
            .collect();

        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1], positions[0] + 1);
    }

    #[test]
    fn test_unchanged_code_yields_nothing() {
        let changes = diff(&prev(), &current(), at());
        assert!(changes.iter().all(|c| c.code.as_str() != "8471300000"));
    }

    #[test]
    fn test_no_changes_when_identical() {
        let p = prev();
        assert!(diff(&p, &p, at()).is_empty());
    }

    #[test]
    fn test_empty_previous_is_first_run() {
        assert!(diff(&Snapshot::empty(), &current(), at()).is_empty());
        assert!(diff(&prev(), &Snapshot::empty(), at()).is_empty());
    }

    #[test]
    fn test_whitespace_only_description_change_is_ignored() {
        let a = snapshot(&[("8471300000", "Portable   machines", "Free")]);
        let b = snapshot(&[("8471300000", " Portable machines ", "Free")]);
        assert!(diff(&a, &b, at()).is_empty());
    }

    #[test]
    fn test_compound_rate_transition_keeps_raw_text() {
        let a = snapshot(&[("0202300050", "Beef", "26.4%")]);
        let b = snapshot(&[("0202300050", "Beef", "4.4¢/kg + 26.4%")]);
        let changes = diff(&a, &b, at());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::RateChanged);
        assert_eq!(changes[0].old_value, Some(ChangeValue::Rate(26.4)));
        assert_eq!(changes[0].new_value, None);
        assert_eq!(changes[0].new_raw.as_deref(), Some("4.4¢/kg + 26.4%"));
        assert!(changes[0].notes.is_some());
    }

    #[test]
    fn test_unparsed_to_unparsed_still_fires() {
        let a = snapshot(&[("0202300050", "Beef", "4.4¢/kg")]);
        let b = snapshot(&[("0202300050", "Beef", "4.8¢/kg")]);
        let changes = diff(&a, &b, at());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, None);
        assert_eq!(changes[0].new_value, None);
    }

    #[test]
    fn test_groups_are_in_code_order() {
        let a = snapshot(&[("5000", "x", "Free")]);
        let b = snapshot(&[("9000", "z", "Free"), ("1000", "a", "Free"), ("5000", "x", "Free")]);
        let changes = diff(&a, &b, at());

        let codes: Vec<&str> = changes.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["1000", "9000"]);
    }

    #[test]
    fn test_diff_is_deterministic() {
        let first = diff(&prev(), &current(), at());
        let second = diff(&prev(), &current(), at());
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_counts() {
        let changes = diff(&prev(), &current(), at());
        let summary = DiffSummary::from_changes(&changes);

        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.rate_changed, 1);
        assert_eq!(summary.description_changed, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_change_record_serializes_field_names() {
        let changes = diff(&prev(), &current(), at());
        let rate = of_type(&changes, ChangeType::RateChanged)[0];
        let json = serde_json::to_value(rate).unwrap();

        assert_eq!(json["code"], "8542310000");
        assert_eq!(json["change_type"], "rate_changed");
        assert_eq!(json["old_raw"], "Free");
        assert_eq!(json["new_value"], 5.0);
    }
}
