//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod openrouter_adapter;
pub mod ticker_cache;
#[cfg(feature = "web")]
pub mod web;
pub mod yahoo_adapter;
