// =============================================================================
// Scoring Engine — 0-100 leadership rating
// =============================================================================
//
// Deterministic, side-effect-free transform of the latest enriched row into a
// score, a tier and display metrics.  Weight blocks:
//
//   Trend / Stage        40   close > SMA50 > SMA200 (Stage 2) => 40
//                             close > SMA200 only              => 20
//   Relative strength    30   MRS > 0 => 20, RS line > its SMA20 => +10
//   Momentum / Volume    30   weekly RSI > 50, monthly RSI > 50,
//                             relative volume > 1.5 => +10 each
//   Volatility guard    -25   close more than 3 ATRs above SMA20
//
// Fails closed: a row missing SMA200, weekly RSI or MRS scores 0 with tier
// DataError — a half-warm instrument is never presented as merely "weak".

use serde::{Deserialize, Serialize};

use crate::metrics::EnrichedRow;

/// Extension threshold in ATR units above the SMA20.
pub const EXTENSION_ATR_LIMIT: f64 = 3.0;

/// Relative-volume level that earns the volume score block.
pub const VOLUME_SCORE_LEVEL: f64 = 1.5;

/// Five-level ordinal rating, plus the fail-closed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Avoid,
    Lagging,
    Neutral,
    Improving,
    Leader,
    DataError,
}

impl Tier {
    fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Leader,
            60..=79 => Self::Improving,
            40..=59 => Self::Neutral,
            20..=39 => Self::Lagging,
            _ => Self::Avoid,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leader => write!(f, "Tier 1: Market Leader"),
            Self::Improving => write!(f, "Tier 2: Improving"),
            Self::Neutral => write!(f, "Tier 3: Neutral"),
            Self::Lagging => write!(f, "Tier 4: Lagging"),
            Self::Avoid => write!(f, "Tier 5: Avoid"),
            Self::DataError => write!(f, "Data Error"),
        }
    }
}

/// Rounded display values carried alongside the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreMetrics {
    pub weekly_rsi: Option<f64>,
    pub mrs: Option<f64>,
    pub rel_volume: Option<f64>,
    /// Percent below the rolling 252-bar high.
    pub pct_off_52w_high: Option<f64>,
    /// Percent above the rolling 252-bar low.
    pub pct_above_52w_low: Option<f64>,
    pub volatility_risk: &'static str,
}

/// Result of scoring one instrument's latest row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Always in [0, 100].
    pub score: u32,
    pub tier: Tier,
    pub is_stage2: bool,
    /// Mirrors the volatility-guard condition, independent of the score.
    pub is_extended: bool,
    pub metrics: ScoreMetrics,
}

impl ScoreResult {
    fn data_error() -> Self {
        Self {
            score: 0,
            tier: Tier::DataError,
            is_stage2: false,
            is_extended: false,
            metrics: ScoreMetrics {
                volatility_risk: "NORMAL",
                ..ScoreMetrics::default()
            },
        }
    }
}

/// Score the latest enriched row.
pub fn score(row: &EnrichedRow) -> ScoreResult {
    // Mandatory inputs; anything missing means the history is still warming
    // up and the instrument cannot be rated.
    let (Some(sma200), Some(rsi_weekly), Some(mrs)) = (row.sma200, row.rsi_weekly, row.mrs) else {
        return ScoreResult::data_error();
    };

    let mut total: i64 = 0;

    // --- 1. Trend / Stage (40) ----------------------------------------------
    let is_stage2 = row.is_stage2();
    if is_stage2 {
        total += 40;
    } else if row.close > sma200 {
        total += 20;
    }

    // --- 2. Relative strength (30) ------------------------------------------
    if mrs > 0.0 {
        total += 20;
    }
    if let (Some(rs), Some(rs_sma20)) = (row.rs_line, row.rs_sma20) {
        if rs > rs_sma20 {
            total += 10;
        }
    }

    // --- 3. Momentum / Volume (30) ------------------------------------------
    if rsi_weekly > 50.0 {
        total += 10;
    }
    if row.rsi_monthly.is_some_and(|m| m > 50.0) {
        total += 10;
    }
    if row.rel_volume.is_some_and(|rv| rv > VOLUME_SCORE_LEVEL) {
        total += 10;
    }

    // --- 4. Volatility guard (penalty) --------------------------------------
    let is_extended = row.dist_sma20.is_some_and(|d| d > EXTENSION_ATR_LIMIT);
    if is_extended {
        total -= 25;
    }

    let score = total.clamp(0, 100) as u32;

    ScoreResult {
        score,
        tier: Tier::from_score(score),
        is_stage2,
        is_extended,
        metrics: display_metrics(row, is_extended),
    }
}

fn display_metrics(row: &EnrichedRow, is_extended: bool) -> ScoreMetrics {
    let pct_off_high = row.high_52w.and_then(|h| {
        (h > 0.0).then(|| round2((h - row.close) / h * 100.0))
    });
    let pct_above_low = row.low_52w.and_then(|l| {
        (l > 0.0).then(|| round2((row.close - l) / l * 100.0))
    });

    ScoreMetrics {
        weekly_rsi: row.rsi_weekly.map(round2),
        mrs: row.mrs.map(round2),
        rel_volume: row.rel_volume.map(round2),
        pct_off_52w_high: pct_off_high,
        pct_above_52w_low: pct_above_low,
        volatility_risk: if is_extended { "HIGH" } else { "NORMAL" },
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
