// 📥 Snapshot Import - Read a published tariff table export into a Snapshot
//
// Header names vary between export formats, so columns are matched through
// an alias table (case-insensitive, spaces → underscores). Missing columns
// are tolerated; a table without a code column yields an empty snapshot.

use crate::snapshot::{RawRow, Snapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Canonical columns, in the order the store writes them
pub const CANONICAL_COLUMNS: &[&str] = &[
    "hts_code",
    "description",
    "rate_general_raw",
    "rate_special_raw",
    "rate_column2_raw",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Code,
    Description,
    General,
    Special,
    Column2,
}

const COLUMN_ALIASES: &[(&str, Column)] = &[
    ("hts_number", Column::Code),
    ("htsno", Column::Code),
    ("hts", Column::Code),
    ("hts_code", Column::Code),
    ("brief_description", Column::Description),
    ("description", Column::Description),
    ("article_description", Column::Description),
    ("rate_of_duty_general", Column::General),
    ("general_rate_of_duty", Column::General),
    ("general", Column::General),
    ("rate_general_raw", Column::General),
    ("rate_of_duty_special", Column::Special),
    ("special", Column::Special),
    ("rate_special_raw", Column::Special),
    ("rate_of_duty_col2", Column::Column2),
    ("column_2", Column::Column2),
    ("col2", Column::Column2),
    ("rate_column2_raw", Column::Column2),
];

fn header_key(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

fn lookup_column(header: &str) -> Option<Column> {
    let key = header_key(header);
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, column)| *column)
}

/// Position of each canonical column in the file; first alias wins
#[derive(Debug, Default)]
struct ColumnMap {
    code: Option<usize>,
    description: Option<usize>,
    general: Option<usize>,
    special: Option<usize>,
    column2: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            let slot = match lookup_column(header) {
                Some(Column::Code) => &mut map.code,
                Some(Column::Description) => &mut map.description,
                Some(Column::General) => &mut map.general,
                Some(Column::Special) => &mut map.special,
                Some(Column::Column2) => &mut map.column2,
                None => {
                    debug!(header, "unmapped column");
                    continue;
                }
            };
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
        map
    }

    fn extract(&self, record: &StringRecord) -> RawRow {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::to_string);
        RawRow {
            hts_code: cell(self.code),
            description: cell(self.description),
            rate_general_raw: cell(self.general),
            rate_special_raw: cell(self.special),
            rate_column2_raw: cell(self.column2),
        }
    }
}

/// Parse CSV from any reader into a snapshot
pub fn read_snapshot<R: Read>(
    reader: R,
    fetched_at: DateTime<Utc>,
    source: Option<String>,
) -> Result<Snapshot> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let columns = ColumnMap::from_headers(&headers);

    if columns.code.is_none() {
        warn!(
            source = source.as_deref().unwrap_or("unknown"),
            "no HTS code column found; snapshot will be empty"
        );
        return Ok(Snapshot::new(fetched_at, source, Vec::new()));
    }

    let mut raw_rows = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to parse CSV line {}", line_num + 2))?;
        raw_rows.push(columns.extract(&record));
    }

    let read = raw_rows.len();
    let snapshot = Snapshot::from_raw_rows(fetched_at, source, raw_rows.iter());
    let dropped = read.saturating_sub(snapshot.len());

    info!(rows = snapshot.len(), read, dropped, "snapshot imported");
    Ok(snapshot)
}

/// Open and import a CSV file; `fetched_at` is the import time
pub fn load_snapshot_csv(path: &Path, source: Option<String>) -> Result<Snapshot> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot file: {}", path.display()))?;
    let source = source.or_else(|| Some(path.display().to_string()));
    read_snapshot(file, Utc::now(), source)
        .with_context(|| format!("Failed to import snapshot: {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================
