//! Core domain types and logic.

pub mod backtest;
pub mod chat;
pub mod coerce;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod prompt;
pub mod settings;
pub mod snapshot;
pub mod technicals;
