//! Technical indicator implementations.
//!
//! Every indicator takes closing prices as `&[f64]`, with NaN marking a value
//! the provider did not supply, and returns one [`IndicatorSeries`] entry per
//! input position. `None` means "not enough history", never an error.
//!
//! - [`sma`]: trailing simple moving average
//! - [`ema`]: non-adjusted exponential moving average
//! - [`rsi`]: relative strength index from trailing mean gain/loss
//! - [`macd`]: MACD line, signal line and histogram
//! - [`stddev`]: percent change and rolling sample standard deviation

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, calculate_macd_default, MacdSeries};
pub use rsi::{calculate_rsi, DEFAULT_RSI_WINDOW};
pub use sma::calculate_sma;
pub use stddev::{calculate_pct_change, calculate_rolling_std};

/// Indicator output aligned to its input.
pub type IndicatorSeries = Vec<Option<f64>>;

/// Most recent value of a series, `None` if the series is empty or the last
/// position is undefined.
pub fn last_value(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Apply a binary operation position by position; undefined on either side
/// propagates.
pub(crate) fn zip_with(
    left: &[Option<f64>],
    right: &[Option<f64>],
    op: impl Fn(f64, f64) -> f64,
) -> IndicatorSeries {
    left.iter()
        .zip(right)
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => Some(op(*l, *r)),
            _ => None,
        })
        .collect()
}
