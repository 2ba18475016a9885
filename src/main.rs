// =============================================================================
// Leaderscan — Market Leadership Scanner entry point
// =============================================================================
//
// Thin shell around the scan engine: watchlist maintenance verbs plus a full
// `--analyze` run.  With no verb at all it behaves like `--analyze`, which is
// what a cron/scheduler invocation uses.

// ── Module declarations ──────────────────────────────────────────────────────
mod config;
mod data_loader;
mod engine;
mod error;
mod indicators;
mod market_data;
mod metrics;
mod report;
mod scoring;
mod state_store;
mod transitions;
mod watchlist;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ScanConfig;
use crate::engine::ScanEngine;

#[derive(Debug, Parser)]
#[command(name = "leaderscan", about = "Benchmark-relative market leadership scanner")]
struct Cli {
    /// Symbols to add to the watchlist.
    #[arg(long, value_name = "SYMBOL", num_args = 1..)]
    add: Vec<String>,

    /// Symbols to remove from the watchlist.
    #[arg(long, value_name = "SYMBOL", num_args = 1..)]
    remove: Vec<String>,

    /// Print the current watchlist.
    #[arg(long)]
    list: bool,

    /// Run a full scan.
    #[arg(long)]
    analyze: bool,

    /// Path to the scan configuration file.
    #[arg(long, default_value = "config/config.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ScanConfig::load_or_default(&cli.config)?;

    // ── 2. Watchlist maintenance verbs ───────────────────────────────────
    let did_maintenance = !cli.add.is_empty() || !cli.remove.is_empty() || cli.list;
    if !cli.add.is_empty() || !cli.remove.is_empty() {
        watchlist::apply_updates(&config.watchlist_path, &cli.add, &cli.remove)?;
    }
    if cli.list {
        let universe = watchlist::load(&config.watchlist_path)?;
        let symbols: Vec<&str> = universe.iter().map(|i| i.symbol.as_str()).collect();
        println!("{}", symbols.join(", "));
    }

    // ── 3. Scan (explicit, or the default when no verb was given) ────────
    if cli.analyze || !did_maintenance {
        info!("leaderscan: market leadership scan starting");
        let summary = ScanEngine::new(config).run()?;
        if summary.emitted {
            println!("{}", summary.report);
        } else {
            info!("report unchanged since last run, not re-emitting");
        }
    }

    Ok(())
}
