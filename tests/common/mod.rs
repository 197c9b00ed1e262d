#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use slicetrader::domain::error::TraderError;
use slicetrader::domain::instrument::Instrument;
use slicetrader::domain::position::{Position, PositionStatus};
use slicetrader::domain::price::{DailyPrice, PriceSeries};
use slicetrader::domain::slice::Slice;
use slicetrader::ports::instrument_port::InstrumentRepository;
use slicetrader::ports::position_port::PositionRepository;
use slicetrader::ports::price_port::PriceRepository;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// In-memory implementation of every repository the simulation reads and
/// writes. Prices are kept in ascending date order per instrument.
///
/// The `with_failing_*` switches make single operations fail the way a
/// locked or broken database would.
#[derive(Default)]
pub struct InMemoryStore {
    pub instruments: Vec<Instrument>,
    pub prices: HashMap<i64, Vec<DailyPrice>>,
    pub positions: RefCell<Vec<Position>>,
    pub broken_windows: HashSet<i64>,
    pub broken_days: HashSet<NaiveDate>,
    pub open_lookup_failures: Cell<usize>,
    pub failing_insert: bool,
    pub failing_close: bool,
    pub stale_open_lots: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instrument whose adjusted closes are `closes`, oldest first,
    /// on consecutive weekdays starting at `first_day`.
    pub fn with_instrument(mut self, symbol: &str, first_day: NaiveDate, closes: &[Decimal]) -> Self {
        let id = self.instruments.len() as i64 + 1;
        let days = weekdays_from(first_day, closes.len());
        let prices = days
            .into_iter()
            .zip(closes)
            .map(|(date, close)| make_price(id, date, *close))
            .collect();
        self.instruments.push(Instrument {
            id,
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
            exchange: "NMS".to_string(),
            currency: "USD".to_string(),
            first_traded: Some(first_day),
        });
        self.prices.insert(id, prices);
        self
    }

    /// Makes every price window read for `symbol` fail.
    pub fn with_broken_window(mut self, symbol: &str) -> Self {
        let id = self.id_of(symbol);
        self.broken_windows.insert(id);
        self
    }

    /// Makes the trading-day lookup for `day` fail.
    pub fn with_failing_trading_day(mut self, day: NaiveDate) -> Self {
        self.broken_days.insert(day);
        self
    }

    /// Makes the next `times` open-position lookups fail.
    pub fn with_failing_open_positions(self, times: usize) -> Self {
        self.open_lookup_failures.set(times);
        self
    }

    pub fn with_failing_insert(mut self) -> Self {
        self.failing_insert = true;
        self
    }

    pub fn with_failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    /// Reports every stored lot as still open, like a stale read would.
    pub fn with_stale_open_lots(mut self) -> Self {
        self.stale_open_lots = true;
        self
    }

    pub fn id_of(&self, symbol: &str) -> i64 {
        self.instruments
            .iter()
            .find(|i| i.symbol == symbol)
            .map(|i| i.id)
            .unwrap_or_else(|| panic!("unknown symbol {symbol}"))
    }

    pub fn instrument(&self, symbol: &str) -> &Instrument {
        let id = self.id_of(symbol);
        self.instruments.iter().find(|i| i.id == id).unwrap()
    }

    /// Date of the `n`-th price (0-based) of `symbol`.
    pub fn day(&self, symbol: &str, n: usize) -> NaiveDate {
        self.prices[&self.id_of(symbol)][n].date
    }

    /// Stores an already-open position, as if bought on an earlier run.
    pub fn hold(&self, symbol: &str, slice: Slice, price: Decimal, basket: &str) -> Position {
        let instrument = self.instrument(symbol).clone();
        self.insert(Position {
            id: 0,
            instrument_id: instrument.id,
            symbol: instrument.symbol,
            buy_price: price,
            sell_price: None,
            status: PositionStatus::Open,
            buy_date: NaiveDate::from_ymd_opt(2000, 1, 3).unwrap(),
            sell_date: None,
            slice,
            shares: 1,
            basket: basket.to_string(),
        })
        .unwrap()
    }

    pub fn open_positions(&self) -> Vec<Position> {
        self.positions
            .borrow()
            .iter()
            .filter(|p| p.is_open())
            .cloned()
            .collect()
    }
}

impl PriceRepository for InMemoryStore {
    fn get_window(
        &self,
        instrument_id: i64,
        length: usize,
        as_of: NaiveDate,
    ) -> Result<PriceSeries, TraderError> {
        if self.broken_windows.contains(&instrument_id) {
            return Err(TraderError::DatabaseQuery {
                reason: "disk I/O error".to_string(),
            });
        }
        let window: Vec<DailyPrice> = self
            .prices
            .get(&instrument_id)
            .map(|prices| {
                prices
                    .iter()
                    .rev()
                    .filter(|p| p.date <= as_of)
                    .take(length)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        PriceSeries::new(window)
    }

    fn has_price_on(&self, date: NaiveDate) -> Result<bool, TraderError> {
        if self.broken_days.contains(&date) {
            return Err(TraderError::DatabaseQuery {
                reason: "database is locked".to_string(),
            });
        }
        Ok(self
            .prices
            .values()
            .any(|prices| prices.iter().any(|p| p.date == date)))
    }
}

impl PositionRepository for InMemoryStore {
    fn open_position_slices(&self) -> Result<Vec<Slice>, TraderError> {
        Ok(self
            .positions
            .borrow()
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.slice)
            .collect())
    }

    fn insert(&self, mut position: Position) -> Result<Position, TraderError> {
        if self.failing_insert {
            return Err(TraderError::Database {
                reason: "disk full".to_string(),
            });
        }
        let mut rows = self.positions.borrow_mut();
        position.id = rows.len() as i64 + 1;
        rows.push(position.clone());
        Ok(position)
    }

    fn close(&self, id: i64, sell_price: Decimal, sell_date: NaiveDate) -> Result<(), TraderError> {
        if self.failing_close {
            return Err(TraderError::Database {
                reason: "disk full".to_string(),
            });
        }
        let mut rows = self.positions.borrow_mut();
        let row = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| TraderError::DatabaseQuery {
                reason: format!("no position with id {id}"),
            })?;
        row.close(sell_price, sell_date)
    }

    fn all_positions(&self) -> Result<Vec<Position>, TraderError> {
        Ok(self.positions.borrow().clone())
    }
}

impl InstrumentRepository for InMemoryStore {
    fn list_all(&self) -> Result<Vec<Instrument>, TraderError> {
        Ok(self.instruments.clone())
    }

    fn open_positions_by_instrument(&self) -> Result<HashMap<i64, Vec<Position>>, TraderError> {
        let failures = self.open_lookup_failures.get();
        if failures > 0 {
            self.open_lookup_failures.set(failures - 1);
            return Err(TraderError::DatabaseQuery {
                reason: "database is locked".to_string(),
            });
        }
        let lots = if self.stale_open_lots {
            self.positions
                .borrow()
                .iter()
                .cloned()
                .map(|mut p| {
                    p.status = PositionStatus::Open;
                    p.sell_price = None;
                    p.sell_date = None;
                    p
                })
                .collect()
        } else {
            self.open_positions()
        };
        let mut grouped: HashMap<i64, Vec<Position>> = HashMap::new();
        for position in lots {
            grouped
                .entry(position.instrument_id)
                .or_default()
                .push(position);
        }
        Ok(grouped)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `count` consecutive weekdays starting at `first` (or the Monday after it).
pub fn weekdays_from(first: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = first;
    while days.len() < count {
        if !is_weekend(day) {
            days.push(day);
        }
        day = day.succ_opt().unwrap();
    }
    days
}

pub fn make_price(instrument_id: i64, date: NaiveDate, adj_close: Decimal) -> DailyPrice {
    DailyPrice {
        instrument_id,
        date,
        open: adj_close,
        high: adj_close,
        low: adj_close,
        close: adj_close,
        adjusted_close: adj_close,
        unadjusted_close: adj_close,
        volume: 1000,
    }
}

/// `flat_days` closes at `level` followed by `tail`.
pub fn closes(flat_days: usize, level: Decimal, tail: &[Decimal]) -> Vec<Decimal> {
    let mut closes = vec![level; flat_days];
    closes.extend_from_slice(tail);
    closes
}

/// CSV text in the import file format for the given weekday closes.
pub fn csv_for(first_day: NaiveDate, closes: &[Decimal]) -> String {
    let mut out = String::from("date,open,high,low,close,adj_close,volume\n");
    for (day, close) in weekdays_from(first_day, closes.len()).into_iter().zip(closes) {
        out.push_str(&format!(
            "{},{},{},{},{},{},1000\n",
            day.format("%Y-%m-%d"),
            close,
            close,
            close,
            close,
            close
        ));
    }
    out
}
