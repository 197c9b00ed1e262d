//! Technical indicators computed over a most-recent-first price window.
//!
//! - `sma`: simple moving average of adjusted closes
//! - `rsi`: short-window relative strength index
//!
//! Every division rounds half-up (midpoint away from zero) to the scale of
//! its dividend, so results depend on the decimal scale of the input prices.

pub mod rsi;
pub mod sma;

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

use crate::domain::error::TraderError;
use crate::domain::price::PriceSeries;

pub const SMA_LONG_PERIOD: usize = 200;
pub const SMA_SHORT_PERIOD: usize = 5;
pub const RSI_PERIOD: usize = 2;

/// The per-day indicator bundle used by the trading rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicators {
    pub sma200: Decimal,
    pub rsi2: Decimal,
    pub sma5: Decimal,
}

impl fmt::Display for Indicators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SMA(200)={} RSI(2)={} SMA(5)={}",
            self.sma200, self.rsi2, self.sma5
        )
    }
}

/// Divides and rounds half-up to the dividend's scale.
///
/// Returns `None` on division by zero.
pub fn div_half_up(dividend: Decimal, divisor: Decimal) -> Option<Decimal> {
    dividend
        .checked_div(divisor)
        .map(|q| q.round_dp_with_strategy(dividend.scale(), RoundingStrategy::MidpointAwayFromZero))
}

/// Computes indicators over one instrument's price window.
pub struct IndicatorEngine<'a> {
    series: &'a PriceSeries,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(series: &'a PriceSeries) -> Self {
        Self { series }
    }

    pub fn sma(&self, period: usize) -> Result<Decimal, TraderError> {
        sma::calculate_sma(self.series, period).ok_or_else(|| self.insufficient(period))
    }

    pub fn rsi(&self, period: usize) -> Result<Decimal, TraderError> {
        rsi::calculate_rsi(self.series, period).ok_or_else(|| self.insufficient(period + 1))
    }

    pub fn indicators(&self) -> Result<Indicators, TraderError> {
        Ok(Indicators {
            sma200: self.sma(SMA_LONG_PERIOD)?,
            rsi2: self.rsi(RSI_PERIOD)?,
            sma5: self.sma(SMA_SHORT_PERIOD)?,
        })
    }

    fn insufficient(&self, required: usize) -> TraderError {
        let subject = match self.series.latest() {
            Some(p) => format!("instrument {}", p.instrument_id),
            None => "empty series".to_string(),
        };
        TraderError::InsufficientData {
            subject,
            available: self.series.len(),
            required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::DailyPrice;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    pub(crate) fn series_of(closes_newest_first: &[Decimal]) -> PriceSeries {
        let newest = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let prices = closes_newest_first
            .iter()
            .enumerate()
            .map(|(i, &c)| DailyPrice {
                instrument_id: 9,
                date: newest - Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                adjusted_close: c,
                unadjusted_close: c,
                volume: 100,
            })
            .collect();
        PriceSeries::new(prices).unwrap()
    }

    #[test]
    fn div_half_up_rounds_to_dividend_scale() {
        assert_eq!(div_half_up(dec!(1.00), dec!(3)), Some(dec!(0.33)));
        assert_eq!(div_half_up(dec!(2.00), dec!(3)), Some(dec!(0.67)));
        assert_eq!(div_half_up(dec!(0.05), dec!(2)), Some(dec!(0.03)));
        assert_eq!(div_half_up(dec!(100), dec!(3.00)), Some(dec!(33)));
        assert_eq!(div_half_up(dec!(100), dec!(0)), None);
    }

    #[test]
    fn indicators_bundle() {
        let mut closes = vec![dec!(100.00); 200];
        closes[0] = dec!(101.00);
        let series = series_of(&closes);
        let ind = IndicatorEngine::new(&series).indicators().unwrap();
        // 20_001.00 / 200 = 100.005 -> 100.01
        assert_eq!(ind.sma200, dec!(100.01));
        assert_eq!(ind.sma5, dec!(100.20));
        assert_eq!(ind.rsi2, Decimal::ONE);
    }

    #[test]
    fn indicators_need_full_window() {
        let series = series_of(&vec![dec!(50); 199]);
        let err = IndicatorEngine::new(&series).indicators().unwrap_err();
        assert!(matches!(
            err,
            TraderError::InsufficientData {
                available: 199,
                required: 200,
                ..
            }
        ));
    }

    #[test]
    fn indicators_display() {
        let ind = Indicators {
            sma200: dec!(99.5),
            rsi2: dec!(67),
            sma5: dec!(101),
        };
        assert_eq!(ind.to_string(), "SMA(200)=99.5 RSI(2)=67 SMA(5)=101");
    }
}
