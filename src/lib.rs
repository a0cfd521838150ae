//! stockchat: stock snapshots, technical indicators, a toy crossover
//! backtest, and an educational chat assistant over them.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
