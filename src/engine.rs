// =============================================================================
// Scan Engine — one scheduled run, end to end
// =============================================================================
//
// Sequences the pipeline per instrument: load history -> MetricEngine ->
// ScoringEngine -> TransitionDetector -> snapshot.  Per-instrument failures
// (short history, missing file, no benchmark overlap) are logged and the
// instrument is skipped; they never abort the batch.  The snapshot table is
// written exactly once at the end of the run, merged over the previously
// loaded table so instruments not processed this run keep their entries.
//
// The whole run is synchronous and single-writer: per-instrument computation
// is independent, but detection and the merge+save are serialized here.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::data_loader;
use crate::error::ScanError;
use crate::market_data::PriceSeries;
use crate::metrics::MetricEngine;
use crate::report::{self, ReportDedup};
use crate::scoring::{self, ScoreResult};
use crate::state_store::{merge_snapshots, Snapshot, SnapshotMap, StateStore};
use crate::transitions::{detect_transitions, AlertEvent};
use crate::watchlist::{self, Instrument};

/// Everything produced for one successfully processed instrument.
#[derive(Debug, Clone)]
pub struct InstrumentOutcome {
    pub symbol: String,
    pub sector: Option<String>,
    pub result: ScoreResult,
    pub alerts: Vec<AlertEvent>,
    pub snapshot: Snapshot,
}

/// Result of one full scan.
#[derive(Debug)]
pub struct ScanSummary {
    pub regime: &'static str,
    pub outcomes: Vec<InstrumentOutcome>,
    pub skipped: usize,
    pub report: String,
    /// False when the dedup gate suppressed an unchanged report.
    pub emitted: bool,
}

/// Run the pipeline for a single instrument against an already-loaded
/// benchmark and prior snapshot table.  Pure with respect to the filesystem.
pub fn process_instrument(
    engine: &MetricEngine,
    instrument: &Instrument,
    price: &PriceSeries,
    benchmark: &PriceSeries,
    prior: &SnapshotMap,
) -> Result<InstrumentOutcome, ScanError> {
    let rows = engine.compute(price, benchmark)?;
    let Some(latest) = rows.last() else {
        // Only reachable with a zero min_bars configuration.
        return Err(ScanError::InsufficientData { got: 0, need: 1 });
    };

    let result = scoring::score(latest);
    let alerts = detect_transitions(&instrument.symbol, latest, prior);
    let snapshot = Snapshot::from_row(latest);

    Ok(InstrumentOutcome {
        symbol: instrument.symbol.clone(),
        sector: instrument.sector.clone(),
        result,
        alerts,
        snapshot,
    })
}

/// One scheduled scan over the configured universe.
pub struct ScanEngine {
    config: ScanConfig,
    metrics: MetricEngine,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Self {
        let metrics = MetricEngine::new(config.min_bars);
        Self { config, metrics }
    }

    pub fn run(&self) -> Result<ScanSummary> {
        self.config.validate()?;
        let universe = watchlist::load(&self.config.watchlist_path)?;
        info!(instruments = universe.len(), benchmark = %self.config.benchmark, "scan starting");

        let benchmark = data_loader::load_symbol(&self.config.data_dir, &self.config.benchmark)
            .with_context(|| format!("benchmark {} unavailable", self.config.benchmark))?;

        // The benchmark enriched against itself gives the regime label
        // (trend fields only; its relative strength is trivially flat).
        let regime = match self.metrics.compute(&benchmark, &benchmark) {
            Ok(rows) => report::market_regime(&rows),
            Err(e) => {
                warn!(error = %e, "benchmark too short for regime label");
                "Unknown"
            }
        };
        info!(regime, "market regime");

        let store = StateStore::new(&self.config.state_path);
        let prior = store.load();

        let mut outcomes = Vec::with_capacity(universe.len());
        let mut skipped = 0usize;
        for instrument in &universe {
            if instrument.symbol == self.config.benchmark {
                continue;
            }
            let price = match data_loader::load_symbol(&self.config.data_dir, &instrument.symbol) {
                Ok(price) => price,
                Err(e) => {
                    warn!(symbol = %instrument.symbol, error = %e, "no usable history, skipping");
                    skipped += 1;
                    continue;
                }
            };
            match process_instrument(&self.metrics, instrument, &price, &benchmark, &prior) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_data_error() => {
                    warn!(symbol = %instrument.symbol, error = %e, "data error, skipping");
                    skipped += 1;
                }
                Err(e) => return Err(e).context("scan aborted"),
            }
        }

        // Merge-before-write: one atomic save for the whole run.
        let mut current = SnapshotMap::new();
        for outcome in &outcomes {
            current.insert(outcome.symbol.clone(), outcome.snapshot);
        }
        let merged = merge_snapshots(prior, current);
        store.save(&merged).context("failed to persist snapshot table")?;

        let report = self.build_report(regime, &outcomes);
        let emitted = ReportDedup::new(&self.config.report_hash_path).should_emit(&report)?;

        info!(
            processed = outcomes.len(),
            skipped,
            emitted,
            "scan complete"
        );

        Ok(ScanSummary {
            regime,
            outcomes,
            skipped,
            report,
            emitted,
        })
    }

    fn build_report(&self, regime: &str, outcomes: &[InstrumentOutcome]) -> String {
        let mut watchlist_lines = Vec::new();
        let mut leaders: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut laggards: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for outcome in outcomes {
            let line =
                report::format_instrument(&outcome.symbol, &outcome.result, &outcome.alerts);
            let sector = outcome.sector.clone().unwrap_or_else(|| "Other".to_string());
            watchlist_lines.push(line.clone());
            if outcome.result.score >= self.config.leader_score {
                leaders.entry(sector).or_default().push(line);
            } else if outcome.result.score <= self.config.laggard_score {
                laggards.entry(sector).or_default().push(line);
            }
        }

        report::build_report(regime, &watchlist_lines, &leaders, &laggards)
    }
}
