//! Price import port traits: where histories come from and where they go.

use crate::domain::error::TraderError;
use crate::domain::instrument::InstrumentHistory;

pub trait PriceSource {
    /// Loads the full daily history of one symbol.
    fn load(&self, symbol: &str) -> Result<InstrumentHistory, TraderError>;
}

pub trait PriceSink {
    /// Stores the instrument (inserting or updating by symbol) and all of its
    /// prices. Returns the stored instrument id.
    fn store_history(&self, history: &InstrumentHistory) -> Result<i64, TraderError>;
}
