//! Instrument store port trait.

use crate::domain::error::TraderError;
use crate::domain::instrument::Instrument;
use crate::domain::position::Position;
use std::collections::HashMap;

pub trait InstrumentRepository {
    fn list_all(&self) -> Result<Vec<Instrument>, TraderError>;

    /// Open positions grouped by instrument id. Instruments without open
    /// positions are absent from the map.
    fn open_positions_by_instrument(&self) -> Result<HashMap<i64, Vec<Position>>, TraderError>;
}
