//! Position store port trait.

use crate::domain::error::TraderError;
use crate::domain::position::Position;
use crate::domain::slice::Slice;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub trait PositionRepository {
    /// Slices of every currently OPEN position, across all instruments.
    fn open_position_slices(&self) -> Result<Vec<Slice>, TraderError>;

    /// Stores a new position and returns it with its assigned id.
    fn insert(&self, position: Position) -> Result<Position, TraderError>;

    /// Marks an OPEN position closed. Fails with `PositionAlreadyClosed`
    /// when the stored row is not OPEN.
    fn close(
        &self,
        position_id: i64,
        sell_price: Decimal,
        sell_date: NaiveDate,
    ) -> Result<(), TraderError>;

    /// Every stored position, oldest first.
    fn all_positions(&self) -> Result<Vec<Position>, TraderError>;
}
