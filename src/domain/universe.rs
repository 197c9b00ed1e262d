//! Instrument universe: code list parsing and batch price import.
//!
//! An import walks every configured symbol, loads its history from a
//! [`PriceSource`] and persists it through a [`PriceSink`]. A symbol whose
//! read, parse or write fails is logged and skipped; the rest still import.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{info, warn};

use crate::domain::instrument::InstrumentHistory;
use crate::ports::import_port::{PriceSink, PriceSource};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UniverseError {
    #[error("code list is empty")]
    Empty,

    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Parses a comma-separated code list: tokens are trimmed and upper-cased,
/// empty tokens and duplicates are rejected.
pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut codes = Vec::new();
    let mut seen = HashSet::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }
    Ok(codes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSymbol {
    pub symbol: String,
    pub instrument_id: i64,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<ImportedSymbol>,
    pub skipped: Vec<SkippedSymbol>,
}

impl ImportReport {
    pub fn total_rows(&self) -> usize {
        self.imported.iter().map(|s| s.rows).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub fn import_universe(
    source: &dyn PriceSource,
    sink: &dyn PriceSink,
    symbols: &[String],
) -> ImportReport {
    let mut report = ImportReport::default();

    for symbol in symbols {
        let started = Instant::now();
        let stored = source.load(symbol).and_then(|history| {
            let id = sink.store_history(&history)?;
            Ok((id, history))
        });

        match stored {
            Ok((instrument_id, InstrumentHistory { prices, .. })) => {
                info!(
                    %symbol,
                    rows = prices.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "imported prices"
                );
                report.imported.push(ImportedSymbol {
                    symbol: symbol.clone(),
                    instrument_id,
                    rows: prices.len(),
                });
            }
            Err(e) => {
                warn!(%symbol, error = %e, "import failed, skipping symbol");
                report.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        rows = report.total_rows(),
        "import finished"
    );
    report
}
