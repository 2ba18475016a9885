// =============================================================================
// Transition Detector — edge-triggered alerts across scheduled runs
// =============================================================================
//
// Diffs the latest enriched row against the STORED prior snapshot (never a
// recomputation) and emits one event per detected state transition.  Every
// comparison is a strict edge trigger: a condition fires on the bar where it
// becomes true, then stays silent while it persists, which is what makes
// alerting idempotent — once the snapshot is persisted, re-running the
// detector with unchanged inputs yields nothing.
//
// The per-instrument state machine (Unknown, Tracked-NoSignal, Tracked-Stage2,
// Tracked-RSLeading) is re-derived each run from the stored scalars; each
// threshold condition is independently edge-triggered, so no explicit state
// enum is stored.

use serde::{Deserialize, Serialize};

use crate::metrics::EnrichedRow;
use crate::state_store::SnapshotMap;

/// Relative-volume level whose upward cross fires a spike alert.
pub const VOLUME_SPIKE_LEVEL: f64 = 2.0;

/// One detected state transition for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum AlertEvent {
    /// First-ever run for this instrument; no comparison possible yet.
    /// Returned so callers can distinguish new instruments, conventionally
    /// suppressed from outward notification.
    Baseline,
    PriceAboveSma200 { sma200: f64 },
    PriceBelowSma200 { sma200: f64 },
    PriceAboveSma50 { sma50: f64 },
    PriceBelowSma50 { sma50: f64 },
    WeeklyRsiAbove40 { rsi: f64 },
    WeeklyRsiBelow40 { rsi: f64 },
    WeeklyRsiAbove50 { rsi: f64 },
    WeeklyRsiBelow50 { rsi: f64 },
    Stage2Entered,
    Stage2Lost,
    RsBreakout { mrs: f64 },
    RsBreakdown { mrs: f64 },
    VolumeSpike { rel_volume: f64 },
    New52WeekHigh { close: f64 },
}

impl AlertEvent {
    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Baseline)
    }
}

impl std::fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => {
                write!(f, "Initial data recorded; monitoring for changes from next run")
            }
            Self::PriceAboveSma200 { sma200 } => {
                write!(f, "Price crossed ABOVE SMA200 ({sma200:.2})")
            }
            Self::PriceBelowSma200 { sma200 } => {
                write!(f, "Price crossed BELOW SMA200 ({sma200:.2})")
            }
            Self::PriceAboveSma50 { sma50 } => {
                write!(f, "Price crossed ABOVE SMA50 ({sma50:.2})")
            }
            Self::PriceBelowSma50 { sma50 } => {
                write!(f, "Price crossed BELOW SMA50 ({sma50:.2})")
            }
            Self::WeeklyRsiAbove40 { rsi } => {
                write!(f, "Weekly RSI reclaimed 40 (now {rsi:.1}, bullish momentum)")
            }
            Self::WeeklyRsiBelow40 { rsi } => {
                write!(f, "Weekly RSI dropped below 40 (now {rsi:.1}, bearish shift)")
            }
            Self::WeeklyRsiAbove50 { rsi } => {
                write!(f, "Weekly RSI crossed above 50 (now {rsi:.1})")
            }
            Self::WeeklyRsiBelow50 { rsi } => {
                write!(f, "Weekly RSI slipped below 50 (now {rsi:.1})")
            }
            Self::Stage2Entered => write!(f, "Entered Stage 2 (close > SMA50 > SMA200)"),
            Self::Stage2Lost => write!(f, "Lost Stage 2 alignment"),
            Self::RsBreakout { mrs } => {
                write!(f, "Relative strength breakout: MRS crossed above 0 (now {mrs:.2})")
            }
            Self::RsBreakdown { mrs } => {
                write!(f, "Relative strength breakdown: MRS crossed below 0 (now {mrs:.2})")
            }
            Self::VolumeSpike { rel_volume } => {
                write!(f, "Volume spike: {rel_volume:.2}x the 20-day average")
            }
            Self::New52WeekHigh { close } => {
                write!(f, "NEW 52-week high at {close:.2}")
            }
        }
    }
}

/// Detect transitions for one instrument.
///
/// With no prior snapshot this returns exactly one [`AlertEvent::Baseline`].
/// Otherwise each comparison fires only when the current row is on one side
/// of a threshold and the STORED prior values were on the other.  Comparisons
/// whose current field is undefined are skipped — an indicator that has not
/// warmed up cannot cross anything.
pub fn detect_transitions(id: &str, row: &EnrichedRow, prior: &SnapshotMap) -> Vec<AlertEvent> {
    let Some(prev) = prior.get(id) else {
        return vec![AlertEvent::Baseline];
    };

    let mut events = Vec::new();

    // 1. Price vs long- and medium-term trend.
    if let Some(sma200) = row.sma200 {
        if row.close > sma200 && prev.close <= prev.sma200 {
            events.push(AlertEvent::PriceAboveSma200 { sma200 });
        } else if row.close < sma200 && prev.close >= prev.sma200 {
            events.push(AlertEvent::PriceBelowSma200 { sma200 });
        }
    }
    if let Some(sma50) = row.sma50 {
        if row.close > sma50 && prev.close <= prev.sma50 {
            events.push(AlertEvent::PriceAboveSma50 { sma50 });
        } else if row.close < sma50 && prev.close >= prev.sma50 {
            events.push(AlertEvent::PriceBelowSma50 { sma50 });
        }
    }

    // 2. Weekly RSI momentum thresholds.
    if let Some(rsi) = row.rsi_weekly {
        if rsi >= 40.0 && prev.rsi_weekly < 40.0 {
            events.push(AlertEvent::WeeklyRsiAbove40 { rsi });
        } else if rsi < 40.0 && prev.rsi_weekly >= 40.0 {
            events.push(AlertEvent::WeeklyRsiBelow40 { rsi });
        }
        if rsi >= 50.0 && prev.rsi_weekly < 50.0 {
            events.push(AlertEvent::WeeklyRsiAbove50 { rsi });
        } else if rsi < 50.0 && prev.rsi_weekly >= 50.0 {
            events.push(AlertEvent::WeeklyRsiBelow50 { rsi });
        }
    }

    // 3. Stage-2 regime flips.
    let stage2_now = row.is_stage2();
    if stage2_now && !prev.is_stage2 {
        events.push(AlertEvent::Stage2Entered);
    } else if !stage2_now && prev.is_stage2 {
        events.push(AlertEvent::Stage2Lost);
    }

    // 4. Mansfield RS zero crosses.
    if let Some(mrs) = row.mrs {
        if mrs > 0.0 && prev.mrs <= 0.0 {
            events.push(AlertEvent::RsBreakout { mrs });
        } else if mrs < 0.0 && prev.mrs >= 0.0 {
            events.push(AlertEvent::RsBreakdown { mrs });
        }
    }

    // 5. Relative-volume spike (upward cross only).
    if let Some(rel_volume) = row.rel_volume {
        if rel_volume >= VOLUME_SPIKE_LEVEL && prev.rel_volume < VOLUME_SPIKE_LEVEL {
            events.push(AlertEvent::VolumeSpike { rel_volume });
        }
    }

    // 6. New 52-week high.  The close must both be the rolling-window max AND
    // exceed the stored prior close, so a flat plateau at the high does not
    // re-fire every run.
    if let Some(high) = row.high_52w {
        if row.close >= high && row.close > prev.close {
            events.push(AlertEvent::New52WeekHigh { close: row.close });
        }
    }

    events
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::Snapshot;
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
            rsi_weekly: Some(55.0),
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

    /// Snapshot agreeing with `row()` on every threshold side.
    fn settled_snapshot() -> Snapshot {
        Snapshot::from_row(&row())
    }

    fn map_with(snap: Snapshot) -> SnapshotMap {
        let mut map = SnapshotMap::new();
        map.insert("AAPL".to_string(), snap);
        map
    }

    #[test]
    fn new_instrument_gets_exactly_one_baseline() {
        let events = detect_transitions("AAPL", &row(), &SnapshotMap::new());
        assert_eq!(events, vec![AlertEvent::Baseline]);
    }

    #[test]
    fn unchanged_state_is_silent() {
        let events = detect_transitions("AAPL", &row(), &map_with(settled_snapshot()));
        assert!(events.is_empty(), "got {events:?}");
    }

    #[test]
    fn idempotent_after_snapshot_update() {
        // First run from an older state fires events; after persisting the
        // new snapshot, the same row must be silent.
        let mut old = settled_snapshot();
        old.close = 85.0; // below both SMAs last run
        let first = detect_transitions("AAPL", &row(), &map_with(old));
        assert!(!first.is_empty());

        let updated = Snapshot::from_row(&row());
        let second = detect_transitions("AAPL", &row(), &map_with(updated));
        assert!(second.is_empty(), "got {second:?}");
    }

    #[test]
    fn price_crossing_above_sma200_fires_once() {
        let mut prev = settled_snapshot();
        prev.close = 85.0;
        prev.sma200 = 90.0;
        prev.sma50 = 95.0;
        let events = detect_transitions("AAPL", &row(), &map_with(prev));
        assert!(events.contains(&AlertEvent::PriceAboveSma200 { sma200: 90.0 }));
        assert!(events.contains(&AlertEvent::PriceAboveSma50 { sma50: 95.0 }));
    }

    #[test]
    fn price_crossing_below_sma50_fires() {
        let mut r = row();
        r.close = 94.0; // below SMA50 (95), above SMA200 (90)
        let events = detect_transitions("AAPL", &r, &map_with(settled_snapshot()));
        assert!(events.contains(&AlertEvent::PriceBelowSma50 { sma50: 95.0 }));
        assert!(!events.iter().any(|e| matches!(e, AlertEvent::PriceBelowSma200 { .. })));
    }

    #[test]
    fn weekly_rsi_reclaim_of_40_and_50() {
        let mut prev = settled_snapshot();
        prev.rsi_weekly = 35.0;
        let events = detect_transitions("AAPL", &row(), &map_with(prev));
        assert!(events.contains(&AlertEvent::WeeklyRsiAbove40 { rsi: 55.0 }));
        assert!(events.contains(&AlertEvent::WeeklyRsiAbove50 { rsi: 55.0 }));
    }

    #[test]
    fn weekly_rsi_breakdown_below_40() {
        let mut r = row();
        r.rsi_weekly = Some(38.0);
        let events = detect_transitions("AAPL", &r, &map_with(settled_snapshot()));
        assert!(events.contains(&AlertEvent::WeeklyRsiBelow40 { rsi: 38.0 }));
        assert!(events.contains(&AlertEvent::WeeklyRsiBelow50 { rsi: 38.0 }));
    }

    #[test]
    fn stage2_flip_both_directions() {
        let mut prev = settled_snapshot();
        prev.is_stage2 = false;
        // close(100) > sma50(95) > sma200(90) => stage 2 now.
        let events = detect_transitions("AAPL", &row(), &map_with(prev));
        assert!(events.contains(&AlertEvent::Stage2Entered));

        let mut r = row();
        r.sma50 = Some(105.0); // close below sma50 => stage 2 lost
        let events = detect_transitions("AAPL", &r, &map_with(settled_snapshot()));
        assert!(events.contains(&AlertEvent::Stage2Lost));
    }

    #[test]
    fn mrs_zero_crosses() {
        let mut prev = settled_snapshot();
        prev.mrs = -1.0;
        let events = detect_transitions("AAPL", &row(), &map_with(prev));
        assert!(events.contains(&AlertEvent::RsBreakout { mrs: 2.5 }));

        let mut r = row();
        r.mrs = Some(-0.5);
        let events = detect_transitions("AAPL", &r, &map_with(settled_snapshot()));
        assert!(events.contains(&AlertEvent::RsBreakdown { mrs: -0.5 }));
    }

    #[test]
    fn volume_spike_fires_only_on_upward_cross() {
        let mut r = row();
        r.rel_volume = Some(2.4);
        let events = detect_transitions("AAPL", &r, &map_with(settled_snapshot()));
        assert!(events.contains(&AlertEvent::VolumeSpike { rel_volume: 2.4 }));

        // Already spiking last run: no re-fire.
        let mut prev = settled_snapshot();
        prev.rel_volume = 2.2;
        let events = detect_transitions("AAPL", &r, &map_with(prev));
        assert!(!events.iter().any(|e| matches!(e, AlertEvent::VolumeSpike { .. })));
    }

    #[test]
    fn new_52_week_high_requires_rising_close() {
        let mut r = row();
        r.close = 110.0;
        r.high_52w = Some(110.0);
        let events = detect_transitions("AAPL", &r, &map_with(settled_snapshot()));
        assert!(events.contains(&AlertEvent::New52WeekHigh { close: 110.0 }));

        // Flat plateau at the high: prior close already 110, no re-fire.
        let mut prev = settled_snapshot();
        prev.close = 110.0;
        prev.sma50 = 95.0;
        let events = detect_transitions("AAPL", &r, &map_with(prev));
        assert!(!events.iter().any(|e| matches!(e, AlertEvent::New52WeekHigh { .. })));
    }

    #[test]
    fn undefined_current_fields_skip_their_comparisons() {
        let mut r = row();
        r.sma200 = None;
        r.sma50 = None;
        r.rsi_weekly = None;
        r.mrs = None;
        r.rel_volume = None;
        r.high_52w = None;
        let mut prev = settled_snapshot();
        prev.close = 0.0; // would otherwise look like a massive cross
        let events = detect_transitions("AAPL", &r, &map_with(prev));
        // Only the stage-2 flip can still fire (is_stage2 is now false).
        assert!(events.iter().all(|e| matches!(e, AlertEvent::Stage2Lost)), "got {events:?}");
    }

    #[test]
    fn display_is_human_readable() {
        let e = AlertEvent::PriceAboveSma200 { sma200: 187.251 };
        assert_eq!(e.to_string(), "Price crossed ABOVE SMA200 (187.25)");
        assert!(AlertEvent::Baseline.is_baseline());
    }
}
