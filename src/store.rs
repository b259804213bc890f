// 🗂️ Snapshot Store - Dated snapshot CSV files on disk
//
// One file per run: hts_snapshot_YYYYMMDD.csv, canonical columns. File-name
// order is date order.

use crate::import::{load_snapshot_csv, CANONICAL_COLUMNS};
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const FILE_PREFIX: &str = "hts_snapshot_";
const FILE_SUFFIX: &str = ".csv";
const DATE_FORMAT: &str = "%Y%m%d";

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, date.format(DATE_FORMAT), FILE_SUFFIX))
    }

    /// Write `snapshot` as the file for `date`, replacing any earlier file for that day
    pub fn save(&self, snapshot: &Snapshot, date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create snapshot dir: {}", self.dir.display()))?;

        let path = self.path_for(date);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create snapshot file: {}", path.display()))?;

        writer.write_record(CANONICAL_COLUMNS)?;
        for row in snapshot.rows() {
            writer.write_record([
                row.code.as_str(),
                row.description.as_deref().unwrap_or(""),
                row.rate_general_raw.as_deref().unwrap_or(""),
                row.rate_special_raw.as_deref().unwrap_or(""),
                row.rate_column2_raw.as_deref().unwrap_or(""),
            ])?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write snapshot file: {}", path.display()))?;

        info!(path = %path.display(), rows = snapshot.len(), "snapshot saved");
        Ok(path)
    }

    /// Snapshot files, oldest first; a missing directory is an empty store
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read snapshot dir: {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| snapshot_date(path).is_some())
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Newest snapshot strictly older than `date`
    ///
    /// Without a date, the second-to-last file (the last one is the run that
    /// was just saved).
    pub fn find_previous(&self, date: Option<NaiveDate>) -> Result<Option<PathBuf>> {
        let paths = self.list()?;
        let previous = match date {
            Some(date) => paths
                .into_iter()
                .filter(|p| snapshot_date(p).is_some_and(|d| d < date))
                .next_back(),
            None => {
                let n = paths.len();
                if n >= 2 {
                    paths.into_iter().nth(n - 2)
                } else {
                    None
                }
            }
        };
        Ok(previous)
    }

    pub fn load(&self, path: &Path) -> Result<Snapshot> {
        load_snapshot_csv(path, None)
    }

    /// Keep the newest `max(2 * retain_weeks, 2)` files; returns what was deleted
    pub fn apply_retention(&self, retain_weeks: u32) -> Result<Vec<PathBuf>> {
        let keep = (retain_weeks as usize * 2).max(2);
        let paths = self.list()?;
        if paths.len() <= keep {
            return Ok(Vec::new());
        }

        let cutoff = paths.len() - keep;
        let mut deleted = Vec::with_capacity(cutoff);
        for path in paths.into_iter().take(cutoff) {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete snapshot: {}", path.display()))?;
            info!(path = %path.display(), "old snapshot removed");
            deleted.push(path);
        }
        Ok(deleted)
    }
}

/// Date encoded in a snapshot file name
pub fn snapshot_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(stamp, DATE_FORMAT).ok()
}

// ============================================================================
// TESTS
// ============================================================================
