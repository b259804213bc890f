// 🗄️ History DB - SQLite record of snapshot rows and detected changes
//
// snapshot_rows: one row per (snapshot_date, code), upserted on re-run
// changes:       one row per change record, deduplicated by idempotency hash

use crate::diff::{ChangeRecord, ChangeType, ChangeValue};
use crate::normalize::NormalizedCode;
use crate::snapshot::Snapshot;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database dir: {}", parent.display()))?;
        }
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshot_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snapshot_date TEXT NOT NULL,
            code TEXT NOT NULL,
            description TEXT,
            rate_general_raw TEXT,
            rate_general_value REAL,
            rate_special_raw TEXT,
            rate_special_value REAL,
            rate_column2_raw TEXT,
            rate_column2_value REAL,
            UNIQUE(snapshot_date, code)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            code TEXT NOT NULL,
            change_type TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            old_raw TEXT,
            new_raw TEXT,
            detected_at TEXT NOT NULL,
            notes TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshot_rows_code ON snapshot_rows(code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_changes_detected_at ON changes(detected_at)",
        [],
    )?;

    Ok(())
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ============================================================================
// SNAPSHOT ROWS
// ============================================================================

/// Store every row of `snapshot` under `snapshot_date`; re-runs overwrite
pub fn upsert_snapshot_rows(conn: &Connection, snapshot: &Snapshot, snapshot_date: NaiveDate) -> Result<usize> {
    let date = snapshot_date.to_string();
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO snapshot_rows (
                snapshot_date, code, description,
                rate_general_raw, rate_general_value,
                rate_special_raw, rate_special_value,
                rate_column2_raw, rate_column2_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(snapshot_date, code) DO UPDATE SET
                description = excluded.description,
                rate_general_raw = excluded.rate_general_raw,
                rate_general_value = excluded.rate_general_value,
                rate_special_raw = excluded.rate_special_raw,
                rate_special_value = excluded.rate_special_value,
                rate_column2_raw = excluded.rate_column2_raw,
                rate_column2_value = excluded.rate_column2_value",
        )?;

        for row in snapshot.rows() {
            stmt.execute(params![
                date,
                row.code.as_str(),
                row.description,
                row.rate_general_raw,
                row.rate_general_value,
                row.rate_special_raw,
                row.rate_special_value,
                row.rate_column2_raw,
                row.rate_column2_value,
            ])?;
        }
    }
    tx.commit().context("Failed to commit snapshot rows")?;

    info!(snapshot_date = %date, rows = snapshot.len(), "snapshot rows upserted");
    Ok(snapshot.len())
}

/// A stored snapshot row as read back for history queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRate {
    pub snapshot_date: String,
    pub code: String,
    pub description: Option<String>,
    pub rate_general_raw: Option<String>,
    pub rate_general_value: Option<f64>,
    pub rate_special_raw: Option<String>,
    pub rate_column2_raw: Option<String>,
}

fn stored_rate(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRate> {
    Ok(StoredRate {
        snapshot_date: row.get(0)?,
        code: row.get(1)?,
        description: row.get(2)?,
        rate_general_raw: row.get(3)?,
        rate_general_value: row.get(4)?,
        rate_special_raw: row.get(5)?,
        rate_column2_raw: row.get(6)?,
    })
}

/// Per-snapshot history of one exact code, newest first
pub fn rate_history(conn: &Connection, code: &NormalizedCode, limit: usize) -> Result<Vec<StoredRate>> {
    let mut stmt = conn.prepare(
        "SELECT snapshot_date, code, description, rate_general_raw, rate_general_value,
                rate_special_raw, rate_column2_raw
         FROM snapshot_rows
         WHERE code = ?1
         ORDER BY snapshot_date DESC
         LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(params![code.as_str(), limit as i64], stored_rate)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Latest stored row of every code under `prefix`
///
/// A prefix that normalizes to nothing returns no rows, never the full table.
pub fn current_rates(conn: &Connection, prefix: &str) -> Result<Vec<StoredRate>> {
    let prefix = match NormalizedCode::parse(prefix) {
        Some(p) => p,
        None => return Ok(Vec::new()),
    };

    let mut stmt = conn.prepare(
        "SELECT s.snapshot_date, s.code, s.description, s.rate_general_raw, s.rate_general_value,
                s.rate_special_raw, s.rate_column2_raw
         FROM snapshot_rows s
         WHERE substr(s.code, 1, length(?1)) = ?1
           AND s.snapshot_date = (
               SELECT MAX(snapshot_date) FROM snapshot_rows WHERE code = s.code
           )
         ORDER BY s.code",
    )?;

    let rows = stmt
        .query_map(params![prefix.as_str()], stored_rate)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============================================================================
// CHANGES
// ============================================================================

/// Hash for duplicate detection: same change on the same day is one record
pub fn change_hash(change: &ChangeRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}|{}|{}|{}|{}|{}|{}",
        change.code,
        change.change_type,
        change.old_value.as_ref().map(|v| v.to_string()).unwrap_or_default(),
        change.new_value.as_ref().map(|v| v.to_string()).unwrap_or_default(),
        change.old_raw.as_deref().unwrap_or(""),
        change.new_raw.as_deref().unwrap_or(""),
        change.detected_at.date_naive(),
    ));
    format!("{:x}", hasher.finalize())
}

fn encode_value(value: &Option<ChangeValue>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(Into::into))
        .transpose()
}

fn decode_value(text: Option<String>) -> Result<Option<ChangeValue>> {
    text.map(|t| serde_json::from_str(&t).with_context(|| format!("Bad stored change value: {}", t)))
        .transpose()
}

/// Insert change records, skipping ones already stored; returns the count inserted
pub fn insert_changes(conn: &Connection, changes: &[ChangeRecord]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for change in changes {
        let result = conn.execute(
            "INSERT INTO changes (
                idempotency_hash, code, change_type, old_value, new_value,
                old_raw, new_raw, detected_at, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                change_hash(change),
                change.code.as_str(),
                change.change_type.as_str(),
                encode_value(&change.old_value)?,
                encode_value(&change.new_value)?,
                change.old_raw,
                change.new_raw,
                timestamp(&change.detected_at),
                change.notes,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(inserted, duplicates, "changes stored");
    Ok(inserted)
}

type ChangeColumns = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
);

fn to_change_record(cols: ChangeColumns) -> Result<ChangeRecord> {
    let (code, change_type, old_value, new_value, old_raw, new_raw, detected_at, notes) = cols;
    let code = NormalizedCode::parse(&code).ok_or_else(|| anyhow!("Bad stored code: {:?}", code))?;
    let change_type = ChangeType::parse(&change_type)
        .ok_or_else(|| anyhow!("Bad stored change type: {}", change_type))?;
    let detected_at = DateTime::parse_from_rfc3339(&detected_at)
        .with_context(|| format!("Bad stored timestamp: {}", detected_at))?
        .with_timezone(&Utc);

    Ok(ChangeRecord {
        code,
        change_type,
        old_value: decode_value(old_value)?,
        new_value: decode_value(new_value)?,
        old_raw,
        new_raw,
        detected_at,
        notes,
    })
}

/// Changes detected at or after `since`, newest first, optionally under a code prefix
///
/// `Some(prefix)` that normalizes to nothing matches no rows.
pub fn recent_changes(
    conn: &Connection,
    since: DateTime<Utc>,
    prefix: Option<&str>,
    limit: usize,
) -> Result<Vec<ChangeRecord>> {
    let prefix = match prefix {
        None => None,
        Some(raw) => match NormalizedCode::parse(raw) {
            Some(p) => Some(p),
            None => return Ok(Vec::new()),
        },
    };

    let mut stmt = conn.prepare(
        "SELECT code, change_type, old_value, new_value, old_raw, new_raw, detected_at, notes
         FROM changes
         WHERE detected_at >= ?1
           AND (?2 IS NULL OR substr(code, 1, length(?2)) = ?2)
         ORDER BY detected_at DESC, code
         LIMIT ?3",
    )?;

    let rows = stmt
        .query_map(
            params![timestamp(&since), prefix.as_ref().map(|p| p.as_str()), limit as i64],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            },
        )?
        .collect::<Result<Vec<ChangeColumns>, _>>()?;

    debug!(rows = rows.len(), "recent changes queried");
    rows.into_iter().map(to_change_record).collect()
}

pub fn count_changes(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM changes", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
