// =============================================================================
// Watchlist — the persisted instrument universe
// =============================================================================
//
// A JSON file of instruments (symbol plus optional sector label), kept
// sorted and de-duplicated.  Symbols are normalised to upper case on the way
// in and validated against the usual ticker shape (1-5 alphanumerics, '.' and
// '-' allowed).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One entry of the instrument universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            sector: None,
        }
    }

    pub fn with_sector(symbol: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            sector: Some(sector.into()),
            ..Self::new(symbol)
        }
    }
}

/// Validate a ticker symbol: 1-5 characters, alphanumeric plus '.' and '-'.
pub fn validate_symbol(symbol: &str) -> bool {
    let t = symbol.trim();
    (1..=5).contains(&t.len()) && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Load the universe from `path`.
///
/// A missing file yields a small default universe (and writes it out) so a
/// fresh checkout produces a meaningful first scan.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Instrument>> {
    let path = path.as_ref();
    if !path.exists() {
        let default = vec![Instrument::new("SPY"), Instrument::new("QQQ")];
        save(path, &default)?;
        return Ok(default);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read watchlist from {}", path.display()))?;
    let list: Vec<Instrument> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse watchlist from {}", path.display()))?;
    Ok(list)
}

/// Persist the universe, sorted by symbol with duplicates removed.
pub fn save(path: impl AsRef<Path>, instruments: &[Instrument]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut normalised: Vec<Instrument> = instruments
        .iter()
        .map(|i| Instrument {
            symbol: i.symbol.to_uppercase(),
            sector: i.sector.clone(),
        })
        .collect();
    normalised.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    normalised.dedup_by(|a, b| a.symbol == b.symbol);

    let content = serde_json::to_string_pretty(&normalised)?;
    std::fs::write(path, content)
        .with_context(|| format!("failed to write watchlist to {}", path.display()))?;
    Ok(())
}

/// Apply `--add` / `--remove` style updates; saves only when something
/// changed.  Invalid symbols are rejected with an error listing them.
pub fn apply_updates(
    path: impl AsRef<Path>,
    add: &[String],
    remove: &[String],
) -> Result<Vec<Instrument>> {
    let invalid: Vec<&String> = add.iter().filter(|s| !validate_symbol(s)).collect();
    if !invalid.is_empty() {
        anyhow::bail!("invalid symbols: {invalid:?}");
    }

    let mut current = load(&path)?;
    let mut changed = false;

    for symbol in add {
        let symbol = symbol.to_uppercase();
        if !current.iter().any(|i| i.symbol == symbol) {
            current.push(Instrument::new(symbol));
            changed = true;
        }
    }
    for symbol in remove {
        let symbol = symbol.to_uppercase();
        let before = current.len();
        current.retain(|i| i.symbol != symbol);
        changed |= current.len() != before;
    }

    if changed {
        save(&path, &current)?;
        info!(entries = current.len(), "watchlist updated");
    }
    load(&path)
}
