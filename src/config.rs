// =============================================================================
// Scan Configuration — persisted engine settings with atomic save
// =============================================================================
//
// Every tunable parameter of the scanner lives here.  Persistence uses the
// atomic tmp + rename pattern, and all fields carry `#[serde(default)]` so
// that adding new fields never breaks loading an older config file.
//
// A missing file is seeded with the defaults (and written out, so a fresh
// checkout leaves an editable file behind); a file that exists but cannot be
// parsed is a hard error — the operator clearly meant it to be used and there
// is no safe way to guess what they wanted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_benchmark() -> String {
    "SPY".to_string()
}

fn default_min_bars() -> usize {
    60
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("state/state.json")
}

fn default_watchlist_path() -> PathBuf {
    PathBuf::from("watchlist.json")
}

fn default_report_hash_path() -> PathBuf {
    PathBuf::from("state/last_report_hash.json")
}

fn default_leader_score() -> u32 {
    85
}

fn default_laggard_score() -> u32 {
    25
}

// =============================================================================
// ScanConfig
// =============================================================================

/// Top-level configuration for the leadership scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Benchmark symbol every instrument is measured against.
    #[serde(default = "default_benchmark")]
    pub benchmark: String,

    /// Minimum bars of history before an instrument is scored.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    /// Directory of per-symbol OHLCV CSV files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Snapshot table location.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Instrument universe location.
    #[serde(default = "default_watchlist_path")]
    pub watchlist_path: PathBuf,

    /// Where the last report's content hash is remembered for dedup.
    #[serde(default = "default_report_hash_path")]
    pub report_hash_path: PathBuf,

    /// Score at or above which an instrument is bucketed as a leader.
    #[serde(default = "default_leader_score")]
    pub leader_score: u32,

    /// Score at or below which an instrument is bucketed as a laggard.
    #[serde(default = "default_laggard_score")]
    pub laggard_score: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            benchmark: default_benchmark(),
            min_bars: default_min_bars(),
            data_dir: default_data_dir(),
            state_path: default_state_path(),
            watchlist_path: default_watchlist_path(),
            report_hash_path: default_report_hash_path(),
            leader_score: default_leader_score(),
            laggard_score: default_laggard_score(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scan config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scan config from {}", path.display()))?;

        info!(
            path = %path.display(),
            benchmark = %config.benchmark,
            min_bars = config.min_bars,
            "scan config loaded"
        );

        Ok(config)
    }

    /// Load `path` if it exists; otherwise write the defaults there and use
    /// them.  A file that exists but fails to parse is fatal.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.save(path)?;
            warn!(path = %path.display(), "no config file, defaults written");
            Ok(config)
        }
    }

    /// Reject settings a scan run cannot work with.
    pub fn validate(&self) -> std::result::Result<(), crate::error::ScanError> {
        if self.benchmark.trim().is_empty() {
            return Err(crate::error::ScanError::Config(
                "benchmark symbol must not be empty".into(),
            ));
        }
        if self.min_bars == 0 {
            return Err(crate::error::ScanError::Config(
                "min_bars must be at least 1".into(),
            ));
        }
        if self.laggard_score >= self.leader_score {
            return Err(crate::error::ScanError::Config(format!(
                "laggard_score ({}) must be below leader_score ({})",
                self.laggard_score, self.leader_score
            )));
        }
        Ok(())
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create config directory {}", parent.display())
                })?;
            }
        }

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise scan config")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "scan config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.benchmark, "SPY");
        assert_eq!(cfg.min_bars, 60);
        assert_eq!(cfg.leader_score, 85);
        assert_eq!(cfg.laggard_score, 25);
        assert_eq!(cfg.state_path, PathBuf::from("state/state.json"));
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ScanConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.benchmark, "SPY");
        assert_eq!(cfg.min_bars, 60);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "benchmark": "QQQ", "min_bars": 120 }"#;
        let cfg: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.benchmark, "QQQ");
        assert_eq!(cfg.min_bars, 120);
        assert_eq!(cfg.leader_score, 85);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = ScanConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.benchmark, cfg2.benchmark);
        assert_eq!(cfg.data_dir, cfg2.data_dir);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut cfg = ScanConfig::default();
        cfg.benchmark = "IWM".to_string();
        cfg.save(&path).unwrap();

        let loaded = ScanConfig::load(&path).unwrap();
        assert_eq!(loaded.benchmark, "IWM");
    }

    #[test]
    fn validate_rejects_degenerate_settings() {
        assert!(ScanConfig::default().validate().is_ok());

        let mut cfg = ScanConfig::default();
        cfg.benchmark = "  ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = ScanConfig::default();
        cfg.min_bars = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ScanConfig::default();
        cfg.laggard_score = 90;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_seeds_defaults_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("config.json");
        let cfg = ScanConfig::load_or_default(&path).unwrap();
        assert_eq!(cfg.benchmark, "SPY");
        // Defaults are written out so the operator has a file to edit.
        assert!(path.exists());

        std::fs::write(&path, "{nope").unwrap();
        assert!(ScanConfig::load_or_default(&path).is_err());
    }
}
