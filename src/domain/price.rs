//! Daily price records and most-recent-first price windows.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::TraderError;

/// One trading day of prices for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPrice {
    pub instrument_id: i64,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adjusted_close: Decimal,
    pub unadjusted_close: Decimal,
    pub volume: i64,
}

/// A window of daily prices ordered most-recent-first.
///
/// Index 0 is the newest record. Construction rejects any sequence whose
/// dates are not strictly decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    prices: Vec<DailyPrice>,
}

impl PriceSeries {
    pub fn new(prices: Vec<DailyPrice>) -> Result<Self, TraderError> {
        for pair in prices.windows(2) {
            if pair[1].date >= pair[0].date {
                return Err(TraderError::UnorderedSeries {
                    instrument_id: pair[1].instrument_id,
                    date: pair[1].date,
                });
            }
        }
        Ok(Self { prices })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// The newest record, i.e. today's price during a session.
    pub fn latest(&self) -> Option<&DailyPrice> {
        self.prices.first()
    }

    pub fn get(&self, steps_back: usize) -> Option<&DailyPrice> {
        self.prices.get(steps_back)
    }

    pub fn adjusted_closes(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.prices.iter().map(|p| p.adjusted_close)
    }
}
