//! Position lots and their OPEN -> CLOSED lifecycle.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::TraderError;
use super::slice::Slice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    /// Single-letter storage symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            PositionStatus::Open => "O",
            PositionStatus::Closed => "C",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<PositionStatus> {
        match symbol {
            "O" => Some(PositionStatus::Open),
            "C" => Some(PositionStatus::Closed),
            _ => None,
        }
    }
}

/// One purchase lot of one instrument.
///
/// An instrument may hold several open lots at once, one per slice step,
/// grouped under a shared basket id. A closed lot is never modified again.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: i64,
    pub instrument_id: i64,
    pub symbol: String,
    pub buy_price: Decimal,
    pub sell_price: Option<Decimal>,
    pub status: PositionStatus,
    pub buy_date: NaiveDate,
    pub sell_date: Option<NaiveDate>,
    pub slice: Slice,
    pub shares: i64,
    pub basket: String,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Money actually spent on the lot: shares * buy price.
    pub fn cost(&self) -> Decimal {
        self.buy_price * Decimal::from(self.shares)
    }

    /// Realized profit of a closed lot.
    pub fn pnl(&self) -> Option<Decimal> {
        match (self.status, self.sell_price) {
            (PositionStatus::Closed, Some(sell)) => sell
                .checked_sub(self.buy_price)?
                .checked_mul(Decimal::from(self.shares)),
            _ => None,
        }
    }

    /// Stamps the sell price and date and marks the lot closed.
    pub fn close(&mut self, sell_price: Decimal, sell_date: NaiveDate) -> Result<(), TraderError> {
        if !self.is_open() {
            return Err(TraderError::PositionAlreadyClosed { id: self.id });
        }
        self.sell_price = Some(sell_price);
        self.sell_date = Some(sell_date);
        self.status = PositionStatus::Closed;
        Ok(())
    }
}
