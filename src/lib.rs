//! slicetrader: a long-only RSI(2) mean-reversion backtester that buys
//! instruments in fixed slices of an account balance.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command line in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
