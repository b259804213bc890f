// Weekly pipeline end to end: CSV import → store → diff → history database

use chrono::{NaiveDate, TimeZone, Utc};
use tariff_watch::{
    diff, insert_changes, open_database, read_snapshot, recent_changes, upsert_snapshot_rows,
    ChangeType, ChangeValue, DiffSummary, NormalizedCode, SnapshotStore,
};
use tempfile::tempdir;

const WEEK_1: &str = "\
HTS Number,Brief Description,General Rate of Duty
7604.10.10,Bars and rods of non-alloy aluminum,5%
7604.21.00,Hollow profiles of aluminum alloys,5%
8471.30.01,Laptops,Free
9503.00.00,Toys,Free
";

const WEEK_2: &str = "\
HTS Number,Brief Description,General Rate of Duty
7604.10.10,Bars and rods of non-alloy aluminum,6%
8471.30.01,Portable computers,Free
9503.00.00,Toys and games,Free
";

fn tracked() -> Vec<NormalizedCode> {
    vec![
        NormalizedCode::parse("7604").unwrap(),
        NormalizedCode::parse("8471").unwrap(),
    ]
}

#[test]
fn test_weekly_run_detects_tracked_changes() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshots"));
    let week_1 = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
    let week_2 = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();

    let first = read_snapshot(WEEK_1.as_bytes(), Utc::now(), None)
        .unwrap()
        .filter_prefixes(&tracked());
    assert_eq!(first.len(), 3);
    store.save(&first, week_1).unwrap();

    let second = read_snapshot(WEEK_2.as_bytes(), Utc::now(), None)
        .unwrap()
        .filter_prefixes(&tracked());
    store.save(&second, week_2).unwrap();

    let previous_path = store.find_previous(Some(week_2)).unwrap().unwrap();
    let previous = store.load(&previous_path).unwrap();
    assert_eq!(previous.len(), 3);

    let detected_at = Utc.with_ymd_and_hms(2026, 10, 12, 6, 0, 0).unwrap();
    let changes = diff(&previous, &second, detected_at);

    let kinds: Vec<(&str, ChangeType)> = changes
        .iter()
        .map(|c| (c.code.as_str(), c.change_type))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("76042100", ChangeType::Removed),
            ("76041010", ChangeType::RateChanged),
            ("84713001", ChangeType::DescriptionChanged),
        ]
    );

    let rate = &changes[1];
    assert_eq!(rate.old_value, Some(ChangeValue::Rate(5.0)));
    assert_eq!(rate.new_value, Some(ChangeValue::Rate(6.0)));
    assert_eq!(rate.new_raw.as_deref(), Some("6%"));

    // 9503 is untracked, so its description change never surfaces
    assert!(changes.iter().all(|c| !c.code.as_str().starts_with("9503")));

    let summary = DiffSummary::from_changes(&changes);
    assert_eq!(summary.total(), 3);
    assert_eq!(summary.rate_changed, 1);
}

#[test]
fn test_history_is_idempotent_across_reruns() {
    let dir = tempdir().unwrap();
    let conn = open_database(&dir.path().join("history.db")).unwrap();

    let previous = read_snapshot(WEEK_1.as_bytes(), Utc::now(), None).unwrap();
    let current = read_snapshot(WEEK_2.as_bytes(), Utc::now(), None).unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
    let detected_at = Utc.with_ymd_and_hms(2026, 10, 12, 6, 0, 0).unwrap();
    let changes = diff(&previous, &current, detected_at);

    upsert_snapshot_rows(&conn, &current, today).unwrap();
    let first = insert_changes(&conn, &changes).unwrap();
    assert_eq!(first, changes.len());

    // Same run again: rows are upserted, changes are skipped
    upsert_snapshot_rows(&conn, &current, today).unwrap();
    let second = insert_changes(&conn, &changes).unwrap();
    assert_eq!(second, 0);

    let since = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    let all = recent_changes(&conn, since, None, 100).unwrap();
    assert_eq!(all.len(), changes.len());

    let aluminum = recent_changes(&conn, since, Some("7604"), 100).unwrap();
    assert_eq!(aluminum.len(), 2);
    assert!(aluminum.iter().all(|c| c.code.as_str().starts_with("7604")));

    let later = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
    assert!(recent_changes(&conn, later, None, 100).unwrap().is_empty());
}

#[test]
fn test_first_run_records_baseline_only() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let today = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();

    let current = read_snapshot(WEEK_1.as_bytes(), Utc::now(), None).unwrap();
    store.save(&current, today).unwrap();

    assert!(store.find_previous(Some(today)).unwrap().is_none());
    let changes = diff(&tariff_watch::Snapshot::empty(), &current, Utc::now());
    assert!(changes.is_empty());
}
