//! Domain error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Top-level error type for slicetrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("insufficient data for {subject}: have {available} prices, need {required}")]
    InsufficientData {
        subject: String,
        available: usize,
        required: usize,
    },

    #[error("price series for instrument {instrument_id} is not ordered most-recent-first at {date}")]
    UnorderedSeries { instrument_id: i64, date: NaiveDate },

    #[error("cannot rank instrument {symbol}: no indicators computed for today")]
    IndicatorComparison { symbol: String },

    #[error(
        "cannot buy slice of {requested}: {allocated} already allocated out of {balance}"
    )]
    AllocationExceeded {
        requested: Decimal,
        allocated: Decimal,
        balance: Decimal,
    },

    #[error("initial balance {balance} is out of range")]
    BalanceOutOfRange { balance: Decimal },

    #[error("no slice left to buy for {symbol}")]
    EmptySlice { symbol: String },

    #[error("position {id} is already closed")]
    PositionAlreadyClosed { id: i64 },

    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: Decimal },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("import of {symbol} failed: {reason}")]
    Import { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    /// Errors that only concern one instrument on one day. The simulation
    /// skips the instrument and carries on.
    pub fn is_recoverable_data_error(&self) -> bool {
        matches!(
            self,
            TraderError::InsufficientData { .. }
                | TraderError::UnorderedSeries { .. }
                | TraderError::Database { .. }
                | TraderError::DatabaseQuery { .. }
        )
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Database { .. } | TraderError::DatabaseQuery { .. } => 3,
            TraderError::AllocationExceeded { .. }
            | TraderError::BalanceOutOfRange { .. }
            | TraderError::EmptySlice { .. }
            | TraderError::PositionAlreadyClosed { .. }
            | TraderError::IndicatorComparison { .. } => 4,
            TraderError::InsufficientData { .. }
            | TraderError::UnorderedSeries { .. }
            | TraderError::InvalidPrice { .. }
            | TraderError::Import { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_is_recoverable() {
        let err = TraderError::InsufficientData {
            subject: "AAPL".into(),
            available: 150,
            required: 200,
        };
        assert!(err.is_recoverable_data_error());
        assert_eq!(
            err.to_string(),
            "insufficient data for AAPL: have 150 prices, need 200"
        );
    }

    #[test]
    fn ledger_violations_are_not_recoverable() {
        let err = TraderError::AllocationExceeded {
            requested: Decimal::from(12_000),
            allocated: Decimal::from(21_000),
            balance: Decimal::from(30_000),
        };
        assert!(!err.is_recoverable_data_error());
        assert!(!TraderError::PositionAlreadyClosed { id: 7 }.is_recoverable_data_error());
    }
}
