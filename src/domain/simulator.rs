//! Day-by-day simulation driver.
//!
//! For every calendar day in `[start_date, end_date)`:
//! 1. Skip weekends and days without any recorded price
//! 2. For each instrument, load the price window ending today and compute
//!    indicators; instruments with too little history sit the day out
//! 3. Sell all open lots of an instrument whose price closed above SMA(5)
//! 4. Collect instruments trading above SMA(200) as buy candidates
//! 5. Rank candidates by RSI(2) and buy at most one slice

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::TraderError;
use super::indicator::{IndicatorEngine, SMA_LONG_PERIOD};
use super::instrument::Instrument;
use super::ledger::{Account, DEFAULT_INITIAL_BALANCE, PositionLedger};
use super::position::Position;
use super::selector::{Candidate, DayScratch, Selection, rank_candidates, select_candidate};
use super::slice::Slice;
use crate::ports::instrument_port::InstrumentRepository;
use crate::ports::position_port::PositionRepository;
use crate::ports::price_port::PriceRepository;

pub const DEFAULT_LOOKBACK: usize = SMA_LONG_PERIOD;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    pub lookback: usize,
    pub initial_balance: Decimal,
}

impl SimulationConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        SimulationConfig {
            start_date,
            end_date,
            lookback: DEFAULT_LOOKBACK,
            initial_balance: Decimal::from(DEFAULT_INITIAL_BALANCE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Bought {
        date: NaiveDate,
        symbol: String,
        position_id: i64,
        slice: Slice,
        shares: i64,
        price: Decimal,
    },
    Sold {
        date: NaiveDate,
        symbol: String,
        position_id: i64,
        slice: Slice,
        price: Decimal,
    },
}

impl TradeEvent {
    fn bought(position: &Position) -> Self {
        TradeEvent::Bought {
            date: position.buy_date,
            symbol: position.symbol.clone(),
            position_id: position.id,
            slice: position.slice,
            shares: position.shares,
            price: position.buy_price,
        }
    }

    fn sold(position: &Position, date: NaiveDate, price: Decimal) -> Self {
        TradeEvent::Sold {
            date,
            symbol: position.symbol.clone(),
            position_id: position.id,
            slice: position.slice,
            price,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            TradeEvent::Bought { date, .. } | TradeEvent::Sold { date, .. } => *date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    pub days_visited: usize,
    pub trading_days: usize,
    pub events: Vec<TradeEvent>,
}

impl SimulationReport {
    pub fn buy_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TradeEvent::Bought { .. }))
            .count()
    }

    pub fn sell_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TradeEvent::Sold { .. }))
            .count()
    }
}

pub struct Simulator<'a> {
    config: SimulationConfig,
    prices: &'a dyn PriceRepository,
    instruments: &'a dyn InstrumentRepository,
    ledger: PositionLedger<'a>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        config: SimulationConfig,
        prices: &'a dyn PriceRepository,
        instruments: &'a dyn InstrumentRepository,
        positions: &'a dyn PositionRepository,
    ) -> Self {
        let ledger = PositionLedger::new(Account::new(config.initial_balance), positions);
        Simulator {
            config,
            prices,
            instruments,
            ledger,
        }
    }

    /// Runs every day of the configured range.
    ///
    /// Missing data for an instrument or a day is logged and skipped. Ledger
    /// violations and failed position writes abort the run.
    pub fn run(&self) -> Result<SimulationReport, TraderError> {
        let universe = self.instruments.list_all()?;
        info!(
            instruments = universe.len(),
            from = %self.config.start_date,
            to = %self.config.end_date,
            "starting simulation"
        );

        let mut report = SimulationReport::default();
        let mut day = self.config.start_date;
        while day < self.config.end_date {
            report.days_visited += 1;
            if self.is_trading_day(day) {
                report.trading_days += 1;
                let events = self.run_session(day, &universe)?;
                report.events.extend(events);
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        info!(
            trading_days = report.trading_days,
            buys = report.buy_count(),
            sells = report.sell_count(),
            "simulation finished"
        );
        Ok(report)
    }

    /// Weekdays with at least one stored price.
    pub fn is_trading_day(&self, day: NaiveDate) -> bool {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        match self.prices.has_price_on(day) {
            Ok(found) => found,
            Err(e) => {
                warn!(%day, error = %e, "trading day lookup failed, skipping day");
                false
            }
        }
    }

    /// Simulates one trading session and returns the trades it made.
    pub fn run_session(
        &self,
        day: NaiveDate,
        universe: &[Instrument],
    ) -> Result<Vec<TradeEvent>, TraderError> {
        info!(%day, "simulating trading session");

        let mut open_by_instrument = match self.instruments.open_positions_by_instrument() {
            Ok(map) => map,
            Err(e) => {
                warn!(%day, error = %e, "cannot load open positions, skipping day");
                return Ok(Vec::new());
            }
        };

        let mut events = Vec::new();
        let mut scratch = DayScratch::new();
        let mut candidates = Vec::new();

        for instrument in universe {
            let series = match self
                .prices
                .get_window(instrument.id, self.config.lookback, day)
            {
                Ok(series) => series,
                Err(e) => {
                    warn!(symbol = %instrument.symbol, %day, error = %e, "price window unavailable");
                    continue;
                }
            };
            if series.len() < self.config.lookback {
                debug!(
                    symbol = %instrument.symbol,
                    available = series.len(),
                    requested = self.config.lookback,
                    "not enough prices"
                );
                continue;
            }
            let Some(actual_price) = series.latest().map(|p| p.adjusted_close) else {
                continue;
            };
            if actual_price <= Decimal::ZERO {
                warn!(
                    symbol = %instrument.symbol,
                    %day,
                    price = %actual_price,
                    "non-positive price, skipping"
                );
                continue;
            }
            let indicators = match IndicatorEngine::new(&series).indicators() {
                Ok(ind) => ind,
                Err(e) => {
                    debug!(symbol = %instrument.symbol, error = %e, "indicators unavailable");
                    continue;
                }
            };

            let mut held = open_by_instrument.remove(&instrument.id).unwrap_or_default();
            if !held.is_empty() && actual_price > indicators.sma5 {
                let sold = self.ledger.sell_all(held, actual_price, day)?;
                events.extend(sold.iter().map(|p| TradeEvent::sold(p, day, actual_price)));
                held = Vec::new();
            }

            scratch.record(instrument.id, actual_price, indicators);
            if actual_price > indicators.sma200 {
                candidates.push(Candidate {
                    instrument,
                    open_positions: held,
                });
            }
        }

        debug!(%day, scanned = scratch.len(), candidates = candidates.len(), "session scanned");

        let ranked = match rank_candidates(candidates, &scratch) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(%day, error = %e, "cannot rank candidates, no buy today");
                return Ok(events);
            }
        };

        let selection = match select_candidate(ranked, &self.ledger) {
            Ok(selection) => selection,
            Err(e) if e.is_recoverable_data_error() => {
                warn!(%day, error = %e, "cannot read allocation, no buy today");
                return Ok(events);
            }
            Err(e) => return Err(e),
        };

        match selection {
            Selection::Buy { candidate, slice } => {
                info!(
                    %day,
                    symbol = %candidate.instrument.symbol,
                    price = %candidate.price,
                    sma200 = %candidate.indicators.sma200,
                    rsi2 = %candidate.indicators.rsi2,
                    "buy candidate for {}",
                    candidate.instrument.label()
                );
                let basket = candidate
                    .basket()
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                match self
                    .ledger
                    .buy(candidate.instrument, slice, candidate.price, day, &basket)
                {
                    Ok(position) => events.push(TradeEvent::bought(&position)),
                    Err(e @ TraderError::InvalidPrice { .. }) => {
                        warn!(%day, error = %e, "cannot size the buy, no buy today");
                    }
                    Err(e) => return Err(e),
                }
            }
            Selection::Blocked { .. } | Selection::Nothing => {
                info!(%day, "not buying anything");
            }
        }

        Ok(events)
    }
}
