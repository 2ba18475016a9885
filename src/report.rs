// =============================================================================
// Report assembly — per-instrument lines, regime header, dedup gate
// =============================================================================
//
// The engine's outward product is a plain-text bundle: a market-regime
// header, the watchlist section, and sector-grouped leader/laggard sections.
// A sha256 of the final text is remembered on disk so an unchanged report is
// not re-emitted by back-to-back runs (weekends, holidays).

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::metrics::EnrichedRow;
use crate::scoring::ScoreResult;
use crate::transitions::AlertEvent;

/// Coarse market-regime label derived from the benchmark's own enriched rows.
pub fn market_regime(benchmark_rows: &[EnrichedRow]) -> &'static str {
    let Some(last) = benchmark_rows.last() else {
        return "Unknown";
    };
    match last.sma200 {
        None => "Unknown",
        Some(_) if last.is_stage2() => "Risk-On (Uptrend)",
        Some(sma200) if last.close < sma200 => "Risk-Off (Downtrend)",
        Some(_) => "Neutral / Transitional",
    }
}

/// One instrument's report block: score line plus any non-baseline alerts.
pub fn format_instrument(symbol: &str, result: &ScoreResult, alerts: &[AlertEvent]) -> String {
    let mut out = format!("{symbol}: {} | score {}", result.tier, result.score);
    if let Some(rsi) = result.metrics.weekly_rsi {
        out.push_str(&format!(" | wRSI {rsi:.1}"));
    }
    if let Some(mrs) = result.metrics.mrs {
        out.push_str(&format!(" | MRS {mrs:+.2}"));
    }
    if let Some(off_high) = result.metrics.pct_off_52w_high {
        out.push_str(&format!(" | {off_high:.1}% off 52w high"));
    }
    if result.is_extended {
        out.push_str(" | EXTENDED");
    }
    out.push('\n');
    for alert in alerts.iter().filter(|a| !a.is_baseline()) {
        out.push_str(&format!("  - {alert}\n"));
    }
    out
}

/// Assemble the full bundle.
pub fn build_report(
    regime: &str,
    watchlist: &[String],
    leaders: &BTreeMap<String, Vec<String>>,
    laggards: &BTreeMap<String, Vec<String>>,
) -> String {
    let mut out = format!("MARKET REGIME: {regime}\n\nWATCHLIST\n");
    for line in watchlist {
        out.push_str(line);
    }
    out.push_str("\nLEADERS\n");
    for (sector, lines) in leaders {
        out.push_str(&format!("[{sector}]\n"));
        for line in lines {
            out.push_str(line);
        }
    }
    out.push_str("\nLAGGARDS\n");
    for (sector, lines) in laggards {
        out.push_str(&format!("[{sector}]\n"));
        for line in lines {
            out.push_str(line);
        }
    }
    out
}

// =============================================================================
// Dedup gate
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct HashRecord {
    hash: String,
    ts: String,
}

/// Remembers the last emitted report's content hash.
#[derive(Debug, Clone)]
pub struct ReportDedup {
    path: PathBuf,
}

impl ReportDedup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// True when `content` differs from the last emitted report.  Records the
    /// new hash as a side effect, so a `true` answer arms the gate for the
    /// next run.
    pub fn should_emit(&self, content: &str) -> Result<bool> {
        let hash = hex::encode(Sha256::digest(content.as_bytes()));

        if let Ok(existing) = std::fs::read_to_string(&self.path) {
            if let Ok(record) = serde_json::from_str::<HashRecord>(&existing) {
                if record.hash == hash {
                    debug!("report unchanged since last run, suppressing");
                    return Ok(false);
                }
            }
            // Unreadable/corrupt hash file: treat as "emit" and overwrite.
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let record = HashRecord {
            hash,
            ts: chrono::Utc::now().to_rfc3339(),
        };
        std::fs::write(&self.path, serde_json::to_string(&record)?)
            .with_context(|| format!("failed to write report hash to {}", self.path.display()))?;
        Ok(true)
    }
}
