//! Account and position ledger.
//!
//! The ledger enforces the single capital rule of the strategy: the slice
//! amounts of all open positions never add up to more than the account's
//! initial balance. Allocation is always read fresh from the position store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::info;

use super::error::TraderError;
use super::instrument::Instrument;
use super::position::{Position, PositionStatus};
use super::slice::Slice;
use crate::ports::position_port::PositionRepository;

pub const DEFAULT_INITIAL_BALANCE: i64 = 30_000;

/// Largest accepted initial balance. Keeps slice amounts and their sums far
/// from the `Decimal` range.
pub const MAX_INITIAL_BALANCE: i64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub initial_balance: Decimal,
}

impl Account {
    pub fn new(initial_balance: Decimal) -> Self {
        Account { initial_balance }
    }

    pub fn slice_amount(&self, slice: Slice) -> Result<Decimal, TraderError> {
        slice
            .amount(self.initial_balance)
            .ok_or(TraderError::BalanceOutOfRange {
                balance: self.initial_balance,
            })
    }
}

impl Default for Account {
    fn default() -> Self {
        Account::new(Decimal::from(DEFAULT_INITIAL_BALANCE))
    }
}

/// One slice checked against the allocation cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceFit {
    pub amount: Decimal,
    pub allocated: Decimal,
    pub fits: bool,
}

pub struct PositionLedger<'a> {
    account: Account,
    positions: &'a dyn PositionRepository,
}

impl<'a> PositionLedger<'a> {
    pub fn new(account: Account, positions: &'a dyn PositionRepository) -> Self {
        PositionLedger { account, positions }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Sum of slice amounts over all currently open positions.
    pub fn total_allocation(&self) -> Result<Decimal, TraderError> {
        self.positions
            .open_position_slices()?
            .into_iter()
            .try_fold(Decimal::ZERO, |total, slice| {
                let amount = self.account.slice_amount(slice)?;
                total
                    .checked_add(amount)
                    .ok_or(TraderError::BalanceOutOfRange {
                        balance: self.account.initial_balance,
                    })
            })
    }

    /// Checks `slice` against the cap with a single allocation read.
    pub fn can_buy(&self, slice: Slice) -> Result<SliceFit, TraderError> {
        let amount = self.account.slice_amount(slice)?;
        let allocated = self.total_allocation()?;
        let fits = amount
            .checked_add(allocated)
            .is_some_and(|total| total <= self.account.initial_balance);
        Ok(SliceFit {
            amount,
            allocated,
            fits,
        })
    }

    /// Opens a new position of `slice` in `instrument` at `price`.
    ///
    /// Buys `floor(slice amount / price)` whole shares. Re-checks the
    /// allocation cap and fails with `AllocationExceeded` rather than
    /// overspending. A price so small that the share count leaves the `i64`
    /// range fails with `InvalidPrice`.
    pub fn buy(
        &self,
        instrument: &Instrument,
        slice: Slice,
        price: Decimal,
        date: NaiveDate,
        basket: &str,
    ) -> Result<Position, TraderError> {
        if slice == Slice::NoSlice {
            return Err(TraderError::EmptySlice {
                symbol: instrument.symbol.clone(),
            });
        }
        let invalid_price = || TraderError::InvalidPrice {
            symbol: instrument.symbol.clone(),
            price,
        };
        if price <= Decimal::ZERO {
            return Err(invalid_price());
        }

        let fit = self.can_buy(slice)?;
        if !fit.fits {
            return Err(TraderError::AllocationExceeded {
                requested: fit.amount,
                allocated: fit.allocated,
                balance: self.account.initial_balance,
            });
        }

        let shares = fit
            .amount
            .checked_div(price)
            .and_then(|quotient| quotient.floor().to_i64())
            .ok_or_else(invalid_price)?;

        let position = Position {
            id: 0,
            instrument_id: instrument.id,
            symbol: instrument.symbol.clone(),
            buy_price: price,
            sell_price: None,
            status: PositionStatus::Open,
            buy_date: date,
            sell_date: None,
            slice,
            shares,
            basket: basket.to_string(),
        };
        info!(
            symbol = %instrument.symbol,
            %slice,
            %price,
            shares,
            total = %position.cost(),
            "buying slice of {}",
            instrument.label()
        );

        self.positions.insert(position)
    }

    /// Closes one open position at `sell_price` on `sell_date`.
    pub fn sell(
        &self,
        position: &mut Position,
        sell_price: Decimal,
        sell_date: NaiveDate,
    ) -> Result<(), TraderError> {
        if !position.is_open() {
            return Err(TraderError::PositionAlreadyClosed { id: position.id });
        }
        self.positions.close(position.id, sell_price, sell_date)?;
        position.close(sell_price, sell_date)
    }

    /// Closes every given position at the same price and date and returns
    /// them in their closed state.
    pub fn sell_all(
        &self,
        mut positions: Vec<Position>,
        sell_price: Decimal,
        sell_date: NaiveDate,
    ) -> Result<Vec<Position>, TraderError> {
        for position in positions.iter_mut() {
            self.sell(position, sell_price, sell_date)?;
            info!(
                symbol = %position.symbol,
                id = position.id,
                slice = %position.slice,
                %sell_price,
                "sold position"
            );
        }
        Ok(positions)
    }
}
