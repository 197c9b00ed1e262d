//! Configuration validation.
//!
//! Validates every config field before a simulation or import runs and
//! builds the typed settings those commands need.

use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::domain::error::TraderError;
use crate::domain::indicator::SMA_LONG_PERIOD;
use crate::domain::ledger::{DEFAULT_INITIAL_BALANCE, MAX_INITIAL_BALANCE};
use crate::domain::simulator::{DEFAULT_LOOKBACK, SimulationConfig};
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;

const SIMULATION: &str = "simulation";
const IMPORT: &str = "import";

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    load_simulation_config(config).map(|_| ())
}

pub fn validate_import_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    load_import_settings(config).map(|_| ())
}

/// Reads and checks the `[simulation]` section.
pub fn load_simulation_config(config: &dyn ConfigPort) -> Result<SimulationConfig, TraderError> {
    let start_date = required_date(config, "start_date")?;
    let end_date = required_date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            SIMULATION,
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let lookback = config.get_int(SIMULATION, "lookback", DEFAULT_LOOKBACK as i64);
    if lookback < SMA_LONG_PERIOD as i64 {
        return Err(invalid(
            SIMULATION,
            "lookback",
            &format!("lookback must be at least {}", SMA_LONG_PERIOD),
        ));
    }

    let initial_balance = match config.get_string(SIMULATION, "initial_balance") {
        None => Decimal::from(DEFAULT_INITIAL_BALANCE),
        Some(_) => config
            .get_decimal(SIMULATION, "initial_balance")
            .ok_or_else(|| {
                invalid(
                    SIMULATION,
                    "initial_balance",
                    "initial_balance must be a decimal number",
                )
            })?,
    };
    if initial_balance <= Decimal::ZERO {
        return Err(invalid(
            SIMULATION,
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    if initial_balance > Decimal::from(MAX_INITIAL_BALANCE) {
        return Err(invalid(
            SIMULATION,
            "initial_balance",
            &format!("initial_balance must not exceed {}", MAX_INITIAL_BALANCE),
        ));
    }

    Ok(SimulationConfig {
        start_date,
        end_date,
        lookback: lookback as usize,
        initial_balance,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub csv_dir: PathBuf,
    pub codes: Vec<String>,
    pub exchange: String,
    pub currency: String,
}

/// Reads and checks the `[import]` section.
pub fn load_import_settings(config: &dyn ConfigPort) -> Result<ImportSettings, TraderError> {
    let csv_dir = match config.get_string(IMPORT, "csv_dir") {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => {
            return Err(TraderError::ConfigMissing {
                section: IMPORT.to_string(),
                key: "csv_dir".to_string(),
            });
        }
    };

    let raw_codes = config
        .get_string(IMPORT, "codes")
        .ok_or_else(|| TraderError::ConfigMissing {
            section: IMPORT.to_string(),
            key: "codes".to_string(),
        })?;
    let codes = parse_codes(&raw_codes).map_err(|e| invalid(IMPORT, "codes", &e.to_string()))?;

    Ok(ImportSettings {
        csv_dir,
        codes,
        exchange: config.get_string(IMPORT, "exchange").unwrap_or_default(),
        currency: config.get_string(IMPORT, "currency").unwrap_or_default(),
    })
}

fn required_date(config: &dyn ConfigPort, key: &str) -> Result<chrono::NaiveDate, TraderError> {
    if config.get_string(SIMULATION, key).is_none() {
        return Err(TraderError::ConfigMissing {
            section: SIMULATION.to_string(),
            key: key.to_string(),
        });
    }
    config.get_date(SIMULATION, key).ok_or_else(|| {
        invalid(
            SIMULATION,
            key,
            &format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

fn invalid(section: &str, key: &str, reason: &str) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
