//! Port traits the domain depends on.

pub mod config_port;
pub mod import_port;
pub mod instrument_port;
pub mod position_port;
pub mod price_port;
