//! Short-window RSI (Relative Strength Index).
//!
//! Unlike Wilder's smoothed RSI this sums raw gains and losses over the last
//! `period` price changes only:
//! - walk forward from the price `period` steps back to today
//! - positive changes add to gains, zero or negative changes add to losses
//! - no gains: RSI = 0
//! - gains but no losses: RSI = 1
//! - otherwise: RSI = 100 - 100 / (1 + (gains / period) / (losses / period))
//!
//! Each division rounds half-up to the dividend's scale. The final division
//! has the integer constant 100 as dividend, so mixed windows yield whole
//! numbers.

use rust_decimal::Decimal;

use super::div_half_up;
use crate::domain::price::PriceSeries;

/// Returns `None` when the series has fewer than `period + 1` prices,
/// `period` is 0 or the price changes leave the `Decimal` range.
pub fn calculate_rsi(series: &PriceSeries, period: usize) -> Option<Decimal> {
    if period == 0 || series.len() <= period {
        return None;
    }

    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    let mut last = series.get(period)?.adjusted_close;

    for steps_back in (0..period).rev() {
        let actual = series.get(steps_back)?.adjusted_close;
        if actual > last {
            gains = gains.checked_add(actual.checked_sub(last)?)?;
        } else {
            losses = losses.checked_add(last.checked_sub(actual)?)?;
        }
        last = actual;
    }

    if gains.is_zero() {
        return Some(Decimal::ZERO);
    }
    if losses.is_zero() {
        return Some(Decimal::ONE);
    }

    let n = Decimal::from(period as u64);
    let avg_gain = div_half_up(gains, n)?;
    let avg_loss = div_half_up(losses, n)?;
    // A loss below half a unit of the price scale averages to zero.
    let Some(relative_strength) = div_half_up(avg_gain, avg_loss) else {
        return Some(Decimal::ONE);
    };
    let hundred = Decimal::from(100);
    let fraction = div_half_up(hundred, Decimal::ONE + relative_strength)?;
    Some(hundred - fraction)
}
