// =============================================================================
// State Store — persisted per-instrument snapshots with atomic save
// =============================================================================
//
// The snapshot table is the engine's only cross-run memory.  One JSON file
// maps instrument id -> the handful of values the transition detector needs
// next run.  Persistence uses the tmp + rename pattern so a crash mid-write
// never corrupts the table, and an unreadable/corrupt file is a logged cold
// start, never a fatal error.
//
// There is no locking: only one scan may hold the store at a time.  Partial
// runs are safe because the engine merges its results over the loaded table
// before saving, so instruments skipped this run keep their entries.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ScanError};
use crate::metrics::EnrichedRow;

/// Neutral sentinel for an undefined RSI value: mid-scale, so the first
/// defined reading cannot fake a threshold cross.
pub const RSI_SENTINEL: f64 = 50.0;

/// Minimal persisted subset of an instrument's latest enriched row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub close: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub rsi_weekly: f64,
    pub mrs: f64,
    pub rel_volume: f64,
    pub is_stage2: bool,
}

impl Snapshot {
    /// Extract the persisted fields from a freshly computed row.
    ///
    /// Every numeric field is coerced to something finite: price-like and
    /// ratio fields fall back to 0.0, RSI to the 50.0 mid-scale sentinel.
    /// That keeps next run's edge triggers predictable — a comparison against
    /// the sentinel can establish a level but never fabricate a cross.
    pub fn from_row(row: &EnrichedRow) -> Self {
        Self {
            close: finite_or(Some(row.close), 0.0),
            sma50: finite_or(row.sma50, 0.0),
            sma200: finite_or(row.sma200, 0.0),
            rsi_weekly: finite_or(row.rsi_weekly, RSI_SENTINEL),
            mrs: finite_or(row.mrs, 0.0),
            rel_volume: finite_or(row.rel_volume, 0.0),
            is_stage2: row.is_stage2(),
        }
    }
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => fallback,
    }
}

/// JSON-file-backed snapshot table.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

pub type SnapshotMap = HashMap<String, Snapshot>;

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the snapshot table.
    ///
    /// A missing file is a normal first run; a corrupt file is logged and
    /// also treated as a cold start.  Neither aborts the scan.
    pub fn load(&self) -> SnapshotMap {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot table yet, cold start");
                return SnapshotMap::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "snapshot table unreadable, cold start");
                return SnapshotMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "snapshot table corrupt, cold start");
                SnapshotMap::new()
            }
        }
    }

    /// Atomically overwrite the full table (write to `.tmp`, then rename).
    ///
    /// Callers must merge their results over the previously loaded table
    /// first; this writes exactly what it is given.
    pub fn save(&self, map: &SnapshotMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content).map_err(|e| {
            ScanError::Persistence(format!("write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            ScanError::Persistence(format!("rename to {}: {e}", self.path.display()))
        })?;

        info!(path = %self.path.display(), entries = map.len(), "snapshot table saved");
        Ok(())
    }
}

/// Merge `current` over `prior`, preserving prior entries for instruments not
/// touched this run.
pub fn merge_snapshots(prior: SnapshotMap, current: SnapshotMap) -> SnapshotMap {
    let mut merged = prior;
    merged.extend(current);
    merged
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row() -> EnrichedRow {
        EnrichedRow {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 10_000.0,
            sma20: Some(99.0),
            sma50: Some(95.0),
            sma200: Some(90.0),
            rsi: Some(55.0),
            rsi_weekly: Some(58.0),
            rsi_monthly: Some(52.0),
            atr14: Some(2.0),
            dist_sma20: Some(0.5),
            rs_line: Some(2.0),
            rs_sma20: Some(1.98),
            rs_sma50: Some(1.95),
            mrs: Some(2.5),
            rel_volume: Some(1.2),
            high_52w: Some(110.0),
            low_52w: Some(80.0),
            golden_cross: false,
            rs_breakout: false,
        }
    }

    #[test]
    fn snapshot_extracts_row_fields() {
        let snap = Snapshot::from_row(&row());
        assert_eq!(snap.close, 100.0);
        assert_eq!(snap.sma50, 95.0);
        assert_eq!(snap.sma200, 90.0);
        assert_eq!(snap.rsi_weekly, 58.0);
        assert_eq!(snap.mrs, 2.5);
        assert_eq!(snap.rel_volume, 1.2);
        assert!(snap.is_stage2);
    }

    #[test]
    fn snapshot_coerces_missing_values_to_sentinels() {
        let mut r = row();
        r.sma50 = None;
        r.sma200 = None;
        r.rsi_weekly = None;
        r.mrs = None;
        r.rel_volume = None;
        let snap = Snapshot::from_row(&r);
        assert_eq!(snap.sma50, 0.0);
        assert_eq!(snap.sma200, 0.0);
        assert_eq!(snap.rsi_weekly, RSI_SENTINEL);
        assert_eq!(snap.mrs, 0.0);
        assert_eq!(snap.rel_volume, 0.0);
        assert!(!snap.is_stage2);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = StateStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut map = SnapshotMap::new();
        map.insert("AAPL".to_string(), Snapshot::from_row(&row()));
        store.save(&map).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["AAPL"], map["AAPL"]);
        // No tmp file left behind.
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("state.json");
        let store = StateStore::new(&path);
        store.save(&SnapshotMap::new()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn merge_preserves_untouched_entries() {
        let mut prior = SnapshotMap::new();
        prior.insert("AAPL".to_string(), Snapshot::from_row(&row()));
        prior.insert("MSFT".to_string(), Snapshot::from_row(&row()));

        let mut r = row();
        r.close = 123.0;
        let mut current = SnapshotMap::new();
        current.insert("AAPL".to_string(), Snapshot::from_row(&r));

        let merged = merge_snapshots(prior, current);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["AAPL"].close, 123.0); // updated
        assert_eq!(merged["MSFT"].close, 100.0); // preserved
    }
}
