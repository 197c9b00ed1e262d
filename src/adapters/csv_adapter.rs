//! CSV price file adapter.
//!
//! Each symbol lives in `<base_path>/<SYMBOL>.csv` with the header
//! `date,open,high,low,close,adj_close,volume` and an optional
//! `unadj_close` column. Columns are looked up by header name.

use crate::domain::error::TraderError;
use crate::domain::instrument::{Instrument, InstrumentHistory};
use crate::domain::price::DailyPrice;
use crate::ports::import_port::PriceSource;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const REQUIRED_COLUMNS: [&str; 7] = ["date", "open", "high", "low", "close", "adj_close", "volume"];

pub struct CsvPriceSource {
    base_path: PathBuf,
    exchange: String,
    currency: String,
}

impl CsvPriceSource {
    pub fn new(base_path: PathBuf, exchange: &str, currency: &str) -> Self {
        Self {
            base_path,
            exchange: exchange.to_string(),
            currency: currency.to_string(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: usize,
    volume: usize,
    unadj_close: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord, symbol: &str) -> Result<Self, TraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| find(c).is_none()) {
            return Err(import_err(symbol, format!("missing {} column", missing)));
        }
        let required = |name: &str| find(name).unwrap_or_default();
        Ok(Columns {
            date: required("date"),
            open: required("open"),
            high: required("high"),
            low: required("low"),
            close: required("close"),
            adj_close: required("adj_close"),
            volume: required("volume"),
            unadj_close: find("unadj_close"),
        })
    }
}

fn import_err(symbol: &str, reason: String) -> TraderError {
    TraderError::Import {
        symbol: symbol.to_string(),
        reason,
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    symbol: &str,
    line: usize,
) -> Result<&'r str, TraderError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| import_err(symbol, format!("line {}: missing {} value", line, name)))
}

fn decimal(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    symbol: &str,
    line: usize,
) -> Result<Decimal, TraderError> {
    let raw = field(record, idx, name, symbol, line)?;
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| import_err(symbol, format!("line {}: invalid {} value: {}", line, name, e)))
}

impl PriceSource for CsvPriceSource {
    fn load(&self, symbol: &str) -> Result<InstrumentHistory, TraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| {
            import_err(symbol, format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| import_err(symbol, format!("CSV header error: {}", e)))?
            .clone();
        let cols = Columns::from_headers(&headers, symbol)?;

        let mut prices = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record =
                result.map_err(|e| import_err(symbol, format!("CSV parse error: {}", e)))?;

            let date_str = field(&record, cols.date, "date", symbol, line)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                import_err(symbol, format!("line {}: invalid date format: {}", line, e))
            })?;

            let adjusted_close = decimal(&record, cols.adj_close, "adj_close", symbol, line)?;
            if adjusted_close <= Decimal::ZERO {
                return Err(import_err(
                    symbol,
                    format!(
                        "line {}: adj_close must be positive, got {}",
                        line, adjusted_close
                    ),
                ));
            }
            let close = decimal(&record, cols.close, "close", symbol, line)?;
            let unadjusted_close = match cols.unadj_close {
                Some(idx) if !field(&record, idx, "unadj_close", symbol, line)?.is_empty() => {
                    decimal(&record, idx, "unadj_close", symbol, line)?
                }
                _ => close,
            };
            let volume: i64 = field(&record, cols.volume, "volume", symbol, line)?
                .parse()
                .map_err(|e| {
                    import_err(symbol, format!("line {}: invalid volume value: {}", line, e))
                })?;

            prices.push(DailyPrice {
                instrument_id: 0,
                date,
                open: decimal(&record, cols.open, "open", symbol, line)?,
                high: decimal(&record, cols.high, "high", symbol, line)?,
                low: decimal(&record, cols.low, "low", symbol, line)?,
                close,
                adjusted_close,
                unadjusted_close,
                volume,
            });
        }

        prices.sort_by_key(|p| p.date);
        if let Some(pair) = prices.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(import_err(symbol, format!("duplicate date {}", pair[1].date)));
        }

        Ok(InstrumentHistory {
            instrument: Instrument {
                id: 0,
                symbol: symbol.to_string(),
                name: String::new(),
                exchange: self.exchange.clone(),
                currency: self.currency.clone(),
                first_traded: prices.first().map(|p| p.date),
            },
            prices,
        })
    }
}
