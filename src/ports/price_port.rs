//! Price store port trait.

use crate::domain::error::TraderError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

pub trait PriceRepository {
    /// Up to `length` prices for the instrument dated on or before `as_of`,
    /// most-recent-first.
    fn get_window(
        &self,
        instrument_id: i64,
        length: usize,
        as_of: NaiveDate,
    ) -> Result<PriceSeries, TraderError>;

    /// Whether any instrument has a price recorded on `date`. Used as the
    /// market-open oracle.
    fn has_price_on(&self, date: NaiveDate) -> Result<bool, TraderError>;
}
