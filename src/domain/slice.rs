//! Capital allocation slices.
//!
//! A position grows one slice step at a time: TEN, TWENTY, THIRTY, FORTY
//! percent of the account's initial balance.

use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slice {
    NoSlice,
    Ten,
    Twenty,
    Thirty,
    Forty,
}

/// Buyable slices in increasing order. `next` walks this ladder.
const LADDER: [Slice; 4] = [Slice::Ten, Slice::Twenty, Slice::Thirty, Slice::Forty];

impl Slice {
    pub fn percentage(self) -> u32 {
        match self {
            Slice::NoSlice => 0,
            Slice::Ten => 10,
            Slice::Twenty => 20,
            Slice::Thirty => 30,
            Slice::Forty => 40,
        }
    }

    pub fn from_percentage(percentage: u32) -> Option<Slice> {
        match percentage {
            0 => Some(Slice::NoSlice),
            10 => Some(Slice::Ten),
            20 => Some(Slice::Twenty),
            30 => Some(Slice::Thirty),
            40 => Some(Slice::Forty),
            _ => None,
        }
    }

    /// Currency amount of this slice, truncated to whole units. `None` when
    /// the balance is too large to take a percentage of.
    pub fn amount(self, initial_balance: Decimal) -> Option<Decimal> {
        initial_balance
            .checked_mul(Decimal::from(self.percentage()))?
            .checked_div(Decimal::from(100))
            .map(|amount| amount.trunc())
    }

    /// The next larger slice, or `NoSlice` at the top of the ladder and for
    /// `NoSlice` itself.
    pub fn next(self) -> Slice {
        LADDER
            .iter()
            .position(|&s| s == self)
            .and_then(|i| LADDER.get(i + 1).copied())
            .unwrap_or(Slice::NoSlice)
    }

    /// The slice to buy for an instrument given the slices it already holds:
    /// TEN when nothing is held, otherwise the step after the largest.
    pub fn next_for<I>(held: I) -> Slice
    where
        I: IntoIterator<Item = Slice>,
    {
        match held.into_iter().max() {
            None => Slice::Ten,
            Some(largest) => largest.next(),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slice::NoSlice => write!(f, "NO_SLICE"),
            other => write!(f, "{}%", other.percentage()),
        }
    }
}
