// =============================================================================
// Market Data — date-keyed OHLCV series
// =============================================================================
//
// `PriceSeries` is the validated container the whole engine reads from: bars
// are date-keyed, strictly increasing and unique, with finite OHLC.  Business
// day cadence is assumed but gaps are tolerated — nothing here requires
// consecutive dates.

pub mod resample;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// A single daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// May be zero when the venue reports no volume; never negative.
    pub volume: f64,
}

/// Ordered, date-unique OHLCV history for one instrument (or the benchmark).
///
/// Owned by the caller and read-only to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a validated series.
    ///
    /// Rejects out-of-order or duplicate dates and non-finite OHLC.  A
    /// non-finite or negative volume is coerced to 0.0 rather than rejected —
    /// missing volume degrades the relative-volume indicator, it is not an
    /// input error.
    pub fn new(mut bars: Vec<Bar>) -> Result<Self> {
        for w in bars.windows(2) {
            if w[1].date <= w[0].date {
                return Err(ScanError::BadSeries(format!(
                    "dates must be strictly increasing: {} then {}",
                    w[0].date, w[1].date
                )));
            }
        }
        for bar in &bars {
            let ohlc = [bar.open, bar.high, bar.low, bar.close];
            if ohlc.iter().any(|v| !v.is_finite()) {
                return Err(ScanError::BadSeries(format!(
                    "non-finite OHLC at {}",
                    bar.date
                )));
            }
        }
        for bar in &mut bars {
            if !bar.volume.is_finite() || bar.volume < 0.0 {
                bar.volume = 0.0;
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Inner-join `price` against `benchmark` on date.
///
/// Returns the instrument bars restricted to overlapping dates together with
/// the benchmark close for each of those dates.  All downstream ratios use
/// only this overlap.  Fails with `NoOverlap` when the two series share no
/// dates at all.
pub fn align(price: &PriceSeries, benchmark: &PriceSeries) -> Result<(Vec<Bar>, Vec<f64>)> {
    if price.is_empty() || benchmark.is_empty() {
        return Err(ScanError::NoOverlap);
    }

    let mut bars = Vec::with_capacity(price.len());
    let mut bench_closes = Vec::with_capacity(price.len());

    // Both series are date-sorted, so a two-pointer merge keeps this linear.
    let (a, b) = (price.bars(), benchmark.bars());
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].date.cmp(&b[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                bars.push(a[i]);
                bench_closes.push(b[j].close);
                i += 1;
                j += 1;
            }
        }
    }

    if bars.is_empty() {
        return Err(ScanError::NoOverlap);
    }
    Ok((bars, bench_closes))
}
