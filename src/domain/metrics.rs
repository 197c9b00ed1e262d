//! Ledger summary statistics over stored positions.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub open_positions: usize,
    pub closed_positions: usize,
    /// Slice amounts committed to open positions.
    pub allocation: Decimal,
    /// Money actually paid for the shares of open positions.
    pub invested: Decimal,
    pub realized_pnl: Decimal,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub avg_holding_days: f64,
}

impl LedgerSummary {
    pub fn compute(positions: &[Position], initial_balance: Decimal) -> Self {
        let mut open_positions = 0usize;
        let mut allocation = Decimal::ZERO;
        let mut invested = Decimal::ZERO;
        let mut realized_pnl = Decimal::ZERO;
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut largest_win = Decimal::ZERO;
        let mut largest_loss = Decimal::ZERO;
        let mut total_holding_days = 0i64;

        for position in positions {
            if position.is_open() {
                open_positions += 1;
                if let Some(amount) = position.slice.amount(initial_balance) {
                    allocation += amount;
                }
                invested += position.cost();
                continue;
            }
            let Some(pnl) = position.pnl() else {
                continue;
            };
            realized_pnl += pnl;
            if pnl > Decimal::ZERO {
                trades_won += 1;
                largest_win = largest_win.max(pnl);
            } else if pnl < Decimal::ZERO {
                trades_lost += 1;
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            if let Some(sold) = position.sell_date {
                total_holding_days += (sold - position.buy_date).num_days();
            }
        }

        let closed_positions = trades_won + trades_lost + trades_breakeven;
        let win_rate = if closed_positions > 0 {
            trades_won as f64 / closed_positions as f64
        } else {
            0.0
        };
        let avg_holding_days = if closed_positions > 0 {
            total_holding_days as f64 / closed_positions as f64
        } else {
            0.0
        };

        LedgerSummary {
            open_positions,
            closed_positions,
            allocation,
            invested,
            realized_pnl,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            largest_win,
            largest_loss,
            avg_holding_days,
        }
    }

    /// Realized profit relative to the initial balance, as a fraction.
    pub fn realized_return(&self, initial_balance: Decimal) -> f64 {
        self.realized_pnl
            .checked_div(initial_balance)
            .and_then(|ratio| ratio.to_f64())
            .unwrap_or(0.0)
    }
}
