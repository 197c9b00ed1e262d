//! Core domain types and trading logic.

pub mod error;
pub mod price;
pub mod instrument;
pub mod indicator;
pub mod slice;
pub mod position;
pub mod ledger;
pub mod selector;
pub mod simulator;
pub mod metrics;
pub mod universe;
pub mod config_validation;
