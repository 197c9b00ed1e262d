//! Simple moving average over the most recent `period` adjusted closes.

use rust_decimal::Decimal;

use super::div_half_up;
use crate::domain::price::PriceSeries;

/// Returns `None` when the series is shorter than `period`, `period` is 0
/// or the sum leaves the `Decimal` range.
pub fn calculate_sma(series: &PriceSeries, period: usize) -> Option<Decimal> {
    if period == 0 || period > series.len() {
        return None;
    }
    let sum = series
        .adjusted_closes()
        .take(period)
        .try_fold(Decimal::ZERO, |sum, close| sum.checked_add(close))?;
    div_half_up(sum, Decimal::from(period as u64))
}
