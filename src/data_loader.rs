// =============================================================================
// Data loader — per-symbol OHLCV CSV files
// =============================================================================
//
// Price acquisition is an external collaborator's job; the scanner only reads
// what it is given.  The on-disk layout is one CSV per symbol in the data
// directory (`AAPL.csv`, `SPY.csv`, ...) with a header row:
//
//   date,open,high,low,close,volume
//
// Dates are ISO (YYYY-MM-DD).  Rows must already be in ascending date order;
// `PriceSeries::new` enforces that and the OHLC sanity rules.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::market_data::{Bar, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Load one symbol's history from `dir/<SYMBOL>.csv`.
pub fn load_symbol(dir: &Path, symbol: &str) -> Result<PriceSeries> {
    load_csv(&csv_path(dir, symbol))
}

/// Path a symbol's history is expected at.
pub fn csv_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{}.csv", symbol.to_uppercase()))
}

/// Parse a single OHLCV CSV file into a validated series.
pub fn load_csv(path: &Path) -> Result<PriceSeries> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open price file {}", path.display()))?;

    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let record: CsvBar =
            record.with_context(|| format!("bad row in {}", path.display()))?;
        bars.push(Bar {
            date: record.date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    PriceSeries::new(bars)
        .with_context(|| format!("invalid price series in {}", path.display()))
}
