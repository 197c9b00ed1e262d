//! Buy candidate ranking and slice selection.
//!
//! Candidates are ranked by ascending RSI(2), most oversold first. The scan
//! then takes the first candidate whose next slice fits the allocation cap,
//! with two rules:
//! - a candidate already holding FORTY is skipped
//! - a candidate whose next slice does not fit ends the scan with no buy;
//!   lower ranked candidates never get to use that headroom

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

use super::error::TraderError;
use super::indicator::Indicators;
use super::instrument::Instrument;
use super::ledger::PositionLedger;
use super::position::Position;
use super::slice::Slice;

/// Per-day indicator values and prices keyed by instrument id. Built fresh
/// for every simulated day and dropped once the day's decisions are made.
#[derive(Debug, Default)]
pub struct DayScratch {
    indicators: HashMap<i64, Indicators>,
    prices: HashMap<i64, Decimal>,
}

impl DayScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, instrument_id: i64, price: Decimal, indicators: Indicators) {
        self.prices.insert(instrument_id, price);
        self.indicators.insert(instrument_id, indicators);
    }

    pub fn indicators(&self, instrument_id: i64) -> Option<&Indicators> {
        self.indicators.get(&instrument_id)
    }

    pub fn price(&self, instrument_id: i64) -> Option<Decimal> {
        self.prices.get(&instrument_id).copied()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

/// An instrument that passed today's trend filter.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub instrument: &'a Instrument,
    pub open_positions: Vec<Position>,
}

#[derive(Debug, Clone)]
pub struct RankedCandidate<'a> {
    pub instrument: &'a Instrument,
    pub open_positions: Vec<Position>,
    pub indicators: Indicators,
    pub price: Decimal,
}

impl RankedCandidate<'_> {
    pub fn next_slice(&self) -> Slice {
        Slice::next_for(self.open_positions.iter().map(|p| p.slice))
    }

    /// Basket of the lots already held, if any.
    pub fn basket(&self) -> Option<&str> {
        self.open_positions.first().map(|p| p.basket.as_str())
    }
}

#[derive(Debug)]
pub enum Selection<'a> {
    Buy {
        candidate: RankedCandidate<'a>,
        slice: Slice,
    },
    /// The first candidate with a slice left to buy does not fit the cap.
    Blocked { symbol: String, slice: Slice },
    Nothing,
}

/// Orders candidates by ascending RSI(2).
///
/// Equal RSI values keep their input order (the sort is stable). Fails with
/// `IndicatorComparison` if any candidate has no indicators for the day.
pub fn rank_candidates<'a>(
    candidates: Vec<Candidate<'a>>,
    scratch: &DayScratch,
) -> Result<Vec<RankedCandidate<'a>>, TraderError> {
    let mut ranked = candidates
        .into_iter()
        .map(|c| {
            let id = c.instrument.id;
            match (scratch.indicators(id), scratch.price(id)) {
                (Some(indicators), Some(price)) => Ok(RankedCandidate {
                    instrument: c.instrument,
                    open_positions: c.open_positions,
                    indicators: *indicators,
                    price,
                }),
                _ => Err(TraderError::IndicatorComparison {
                    symbol: c.instrument.symbol.clone(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    ranked.sort_by(|a, b| a.indicators.rsi2.cmp(&b.indicators.rsi2));
    Ok(ranked)
}

/// Picks at most one (candidate, slice) to buy from a ranked list.
pub fn select_candidate<'a>(
    ranked: Vec<RankedCandidate<'a>>,
    ledger: &PositionLedger<'_>,
) -> Result<Selection<'a>, TraderError> {
    for candidate in ranked {
        let slice = candidate.next_slice();
        if slice == Slice::NoSlice {
            info!(
                symbol = %candidate.instrument.symbol,
                "fully invested, trying the next candidate"
            );
            continue;
        }
        let fit = ledger.can_buy(slice)?;
        if !fit.fits {
            info!(
                symbol = %candidate.instrument.symbol,
                %slice,
                amount = %fit.amount,
                allocated = %fit.allocated,
                "not enough unallocated balance for next slice"
            );
            return Ok(Selection::Blocked {
                symbol: candidate.instrument.symbol.clone(),
                slice,
            });
        }
        debug!(
            symbol = %candidate.instrument.symbol,
            rsi2 = %candidate.indicators.rsi2,
            %slice,
            "selected buy candidate"
        );
        return Ok(Selection::Buy { candidate, slice });
    }
    Ok(Selection::Nothing)
}
