//! Tradeable instrument identity.

use chrono::NaiveDate;

use super::price::DailyPrice;

/// Read-only reference data for one listed instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub currency: String,
    pub first_traded: Option<NaiveDate>,
}

impl Instrument {
    /// Display label used in log lines: the name when known, else the symbol.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }
}

/// An instrument together with its daily prices in ascending date order, as
/// read from an import source.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentHistory {
    pub instrument: Instrument,
    pub prices: Vec<DailyPrice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_name() {
        let mut inst = Instrument {
            id: 1,
            symbol: "AAPL".into(),
            name: "Apple Inc.".into(),
            exchange: "NMS".into(),
            currency: "USD".into(),
            first_traded: None,
        };
        assert_eq!(inst.label(), "Apple Inc.");
        inst.name.clear();
        assert_eq!(inst.label(), "AAPL");
    }
}
