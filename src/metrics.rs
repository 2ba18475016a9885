// =============================================================================
// Metric Engine — per-date indicator enrichment
// =============================================================================
//
// Pure transform: (price series, benchmark series) -> one `EnrichedRow` per
// overlapping date.  Everything is computed column-wise over the full history
// and zipped into rows at the end; only the final row feeds scoring and
// transition detection, but the rolling windows and edge comparisons need the
// preceding rows.
//
// Numerical contract: an indicator is `None` until its lookback window is
// satisfied, and a degenerate denominator (zero ATR, zero benchmark close,
// zero volume average) yields `None` for that field rather than an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScanError};
use crate::indicators::{atr_series, rolling_max, rolling_mean, rolling_min, rsi_series};
use crate::market_data::resample::{forward_fill, resample_monthly, resample_weekly};
use crate::market_data::{align, PriceSeries};

/// Trading days in one year; window for the 52-week extrema.
pub const BARS_PER_YEAR: usize = 252;

/// Default minimum history before an instrument is scored at all.
pub const DEFAULT_MIN_BARS: usize = 60;

/// One date of raw OHLCV plus every derived indicator.
///
/// Built fresh each run and discarded after scoring/diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,

    // Trend
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,

    // Momentum
    pub rsi: Option<f64>,
    pub rsi_weekly: Option<f64>,
    pub rsi_monthly: Option<f64>,

    // Volatility
    pub atr14: Option<f64>,
    /// (close - SMA20) in ATR(14) units; `None` when ATR is zero/undefined.
    pub dist_sma20: Option<f64>,

    // Relative strength vs benchmark
    pub rs_line: Option<f64>,
    pub rs_sma20: Option<f64>,
    pub rs_sma50: Option<f64>,
    /// Mansfield RS oscillator: (rs_line / SMA(rs_line, 50) - 1) * 100.
    pub mrs: Option<f64>,

    // Volume
    pub rel_volume: Option<f64>,

    // 52-week extrema (min_periods = 1: defined from the first bar, a true
    // one-year window only once 252 bars exist).
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,

    // Edge-triggered flags: true only on the bar where the cross happens.
    pub golden_cross: bool,
    pub rs_breakout: bool,
}

impl EnrichedRow {
    /// Stage-2 regime: price above both moving averages, averages in
    /// ascending order.  False whenever either average is undefined.
    pub fn is_stage2(&self) -> bool {
        match (self.sma50, self.sma200) {
            (Some(sma50), Some(sma200)) => self.close > sma50 && sma50 > sma200,
            _ => false,
        }
    }
}

/// Computes enriched indicator rows for one instrument against the benchmark.
#[derive(Debug, Clone, Copy)]
pub struct MetricEngine {
    min_bars: usize,
}

impl Default for MetricEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BARS)
    }
}

impl MetricEngine {
    pub fn new(min_bars: usize) -> Self {
        Self { min_bars }
    }

    /// Compute the full enriched history.
    ///
    /// Fails with `InsufficientData` when the instrument has fewer bars than
    /// the configured minimum (before or after alignment), and with
    /// `NoOverlap` when instrument and benchmark share no dates.
    pub fn compute(
        &self,
        price: &PriceSeries,
        benchmark: &PriceSeries,
    ) -> Result<Vec<EnrichedRow>> {
        if price.len() < self.min_bars {
            return Err(ScanError::InsufficientData {
                got: price.len(),
                need: self.min_bars,
            });
        }

        // 1. Inner-join on date; ratios only ever see the overlap.
        let (bars, bench_closes) = align(price, benchmark)?;
        if bars.len() < self.min_bars {
            return Err(ScanError::InsufficientData {
                got: bars.len(),
                need: self.min_bars,
            });
        }

        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        // 2. Trend.
        let sma20 = rolling_mean(&closes, 20);
        let sma50 = rolling_mean(&closes, 50);
        let sma200 = rolling_mean(&closes, 200);

        // 3. Volatility.
        let atr14 = atr_series(&bars, 14);

        // 4. Momentum: daily RSI plus completed-bucket weekly/monthly RSI.
        let rsi = rsi_series(&closes, 14);
        let rsi_weekly = bucket_rsi(&resample_weekly(&bars), &dates);
        let rsi_monthly = bucket_rsi(&resample_monthly(&bars), &dates);

        // 5. Relative strength.  The ratio is carried as NaN where undefined
        // so the rolling mean poisons exactly the affected windows.
        let rs_raw: Vec<f64> = closes
            .iter()
            .zip(&bench_closes)
            .map(|(&c, &b)| if b != 0.0 { c / b } else { f64::NAN })
            .collect();
        let rs_line: Vec<Option<f64>> = rs_raw
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect();
        let rs_sma20 = rolling_mean(&rs_raw, 20);
        let rs_sma50 = rolling_mean(&rs_raw, 50);
        let mrs: Vec<Option<f64>> = rs_line
            .iter()
            .zip(&rs_sma50)
            .map(|(rs, sma)| match (rs, sma) {
                (Some(rs), Some(sma)) if *sma != 0.0 => Some((rs / sma - 1.0) * 100.0),
                _ => None,
            })
            .collect();

        // 6. Relative volume; zero/absent volume degrades to None.
        let vol_sma20 = rolling_mean(&volumes, 20);
        let rel_volume: Vec<Option<f64>> = volumes
            .iter()
            .zip(&vol_sma20)
            .map(|(&v, avg)| match avg {
                Some(avg) if *avg > 0.0 => Some(v / avg),
                _ => None,
            })
            .collect();

        // 52-week extrema, defined from the first bar.
        let high_52w = rolling_max(&closes, BARS_PER_YEAR, 1);
        let low_52w = rolling_min(&closes, BARS_PER_YEAR, 1);

        // 7. Edge-triggered flags compare the current bar against the
        // previous one; the level alone is never enough to fire.
        let mut rows = Vec::with_capacity(bars.len());
        for i in 0..bars.len() {
            let golden_cross = i > 0
                && matches!(
                    (sma50[i], sma200[i], sma50[i - 1], sma200[i - 1]),
                    (Some(f), Some(s), Some(pf), Some(ps)) if f > s && pf <= ps
                );
            let rs_breakout = i > 0
                && matches!(
                    (mrs[i], mrs[i - 1]),
                    (Some(m), Some(pm)) if m > 0.0 && pm <= 0.0
                );

            let dist = match (sma20[i], atr14[i]) {
                (Some(sma), Some(atr)) if atr > 0.0 => Some((closes[i] - sma) / atr),
                _ => None,
            };

            rows.push(EnrichedRow {
                date: bars[i].date,
                open: bars[i].open,
                high: bars[i].high,
                low: bars[i].low,
                close: bars[i].close,
                volume: bars[i].volume,
                sma20: sma20[i],
                sma50: sma50[i],
                sma200: sma200[i],
                rsi: rsi[i],
                rsi_weekly: rsi_weekly[i],
                rsi_monthly: rsi_monthly[i],
                atr14: atr14[i],
                dist_sma20: dist,
                rs_line: rs_line[i],
                rs_sma20: rs_sma20[i],
                rs_sma50: rs_sma50[i],
                mrs: mrs[i],
                rel_volume: rel_volume[i],
                high_52w: high_52w[i],
                low_52w: low_52w[i],
                golden_cross,
                rs_breakout,
            });
        }

        if let Some(last) = rows.last() {
            debug!(
                date = %last.date,
                close = last.close,
                sma200 = ?last.sma200,
                mrs = ?last.mrs,
                rsi_weekly = ?last.rsi_weekly,
                "metric computation complete"
            );
        }

        Ok(rows)
    }
}

/// RSI(14) over a bucket series, forward-filled onto the daily dates so each
/// row only reflects a completed bucket.
fn bucket_rsi(
    buckets: &[crate::market_data::resample::Bucket],
    dates: &[NaiveDate],
) -> Vec<Option<f64>> {
    let closes: Vec<f64> = buckets.iter().map(|b| b.close).collect();
    let rsi = rsi_series(&closes, 14);
    let labeled: Vec<(NaiveDate, Option<f64>)> = buckets
        .iter()
        .zip(rsi)
        .map(|(b, v)| (b.label, v))
        .collect();
    forward_fill(&labeled, dates)
}
