//! Moving-average crossover backtest.
//!
//! Long when SMA(fast) > SMA(slow), flat otherwise. The position held on day i
//! is the signal from day i-1, so a crossover only earns from the next bar.
//! Illustrative only: no costs, no slippage, no sizing.

use serde::Serialize;

use crate::domain::coerce::finite;
use crate::domain::error::StockchatError;
use crate::domain::indicator::{calculate_pct_change, calculate_sma};
use crate::domain::metrics::{annualized_return_pct, max_drawdown_pct, total_return_pct};
use crate::domain::ohlcv::PriceHistory;
use crate::domain::technicals::NO_HISTORY_MESSAGE;

pub const DEFAULT_FAST: usize = 20;
pub const DEFAULT_SLOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestConfig {
    pub fast: usize,
    pub slow: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
        }
    }
}

impl BacktestConfig {
    pub fn new(fast: usize, slow: usize) -> Result<Self, StockchatError> {
        for (key, value) in [("fast", fast), ("slow", slow)] {
            if value == 0 {
                return Err(StockchatError::ConfigInvalid {
                    section: "backtest".into(),
                    key: key.into(),
                    reason: "window must be positive".into(),
                });
            }
        }
        Ok(Self { fast, slow })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestMetrics {
    pub strategy_total_return_pct: Option<f64>,
    pub strategy_annualized_return_pct: Option<f64>,
    pub strategy_max_drawdown_pct: Option<f64>,
    pub buyhold_total_return_pct: Option<f64>,
    pub buyhold_annualized_return_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BacktestReport {
    Metrics(BacktestMetrics),
    Unavailable { error: String },
}

/// Daily series produced on the way to the report; kept for inspection and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverRun {
    pub signal: Vec<u8>,
    pub asset_returns: Vec<f64>,
    pub strategy_returns: Vec<f64>,
    pub strategy_equity: Vec<f64>,
    pub buyhold_equity: Vec<f64>,
}

pub fn run_crossover(closes: &[f64], config: &BacktestConfig) -> CrossoverRun {
    let fast = calculate_sma(closes, config.fast);
    let slow = calculate_sma(closes, config.slow);

    let signal: Vec<u8> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) if f > s => 1,
            _ => 0,
        })
        .collect();

    let asset_returns: Vec<f64> = calculate_pct_change(closes)
        .into_iter()
        .map(|r| r.filter(|v| !v.is_nan()).unwrap_or(0.0))
        .collect();

    let strategy_returns: Vec<f64> = asset_returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let held = if i == 0 { 0 } else { signal[i - 1] };
            r * f64::from(held)
        })
        .collect();

    CrossoverRun {
        strategy_equity: equity_curve(&strategy_returns),
        buyhold_equity: equity_curve(&asset_returns),
        signal,
        asset_returns,
        strategy_returns,
    }
}

pub fn run_backtest(history: &PriceHistory, config: &BacktestConfig) -> BacktestReport {
    let Some(closes) = history.closes() else {
        return BacktestReport::Unavailable {
            error: NO_HISTORY_MESSAGE.to_string(),
        };
    };

    let run = run_crossover(&closes, config);
    tracing::debug!(
        bars = closes.len(),
        fast = config.fast,
        slow = config.slow,
        "crossover backtest complete"
    );

    BacktestReport::Metrics(BacktestMetrics {
        strategy_total_return_pct: total_return_pct(&run.strategy_equity).and_then(finite),
        strategy_annualized_return_pct: annualized_return_pct(&run.strategy_equity)
            .and_then(finite),
        strategy_max_drawdown_pct: max_drawdown_pct(&run.strategy_equity).and_then(finite),
        buyhold_total_return_pct: total_return_pct(&run.buyhold_equity).and_then(finite),
        buyhold_annualized_return_pct: annualized_return_pct(&run.buyhold_equity)
            .and_then(finite),
    })
}

/// Cumulative product of (1 + r), starting from one unit of capital.
fn equity_curve(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |equity, r| {
            *equity *= 1.0 + r;
            Some(*equity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn history(closes: &[f64]) -> PriceHistory {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        PriceHistory::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| OhlcvBar::flat(start + Duration::days(i as i64), c))
                .collect(),
        )
    }

    fn metrics(report: BacktestReport) -> BacktestMetrics {
        match report {
            BacktestReport::Metrics(m) => m,
            BacktestReport::Unavailable { error } => panic!("unexpected error: {error}"),
        }
    }

    #[test]
    fn config_defaults() {
        let c = BacktestConfig::default();
        assert_eq!(c.fast, 20);
        assert_eq!(c.slow, 50);
    }

    #[test]
    fn config_rejects_zero_window() {
        assert!(BacktestConfig::new(0, 50).is_err());
        assert!(BacktestConfig::new(20, 0).is_err());
        assert!(BacktestConfig::new(5, 10).is_ok());
    }

    #[test]
    fn empty_history_is_error_entry() {
        let report = run_backtest(&PriceHistory::empty(), &BacktestConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No price history available."}));
    }

    #[test]
    fn flat_prices_have_no_return_and_no_drawdown() {
        let m = metrics(run_backtest(&history(&[50.0; 80]), &BacktestConfig::default()));
        assert_relative_eq!(m.strategy_total_return_pct.unwrap(), 0.0);
        assert_relative_eq!(m.strategy_max_drawdown_pct.unwrap(), 0.0);
        assert_relative_eq!(m.buyhold_total_return_pct.unwrap(), 0.0);
        assert_relative_eq!(m.buyhold_annualized_return_pct.unwrap(), 0.0);
    }

    #[test]
    fn signal_is_lagged_one_period() {
        // fast(2) > slow(3) only on the final bar
        let closes = [10.0, 10.0, 10.0, 10.0, 12.0];
        let config = BacktestConfig::new(2, 3).unwrap();
        let run = run_crossover(&closes, &config);

        assert_eq!(run.signal, vec![0, 0, 0, 0, 1]);
        assert_relative_eq!(run.strategy_returns[4], 0.0);
        assert_relative_eq!(run.asset_returns[4], 0.2);

        let m = metrics(run_backtest(&history(&closes), &config));
        assert_relative_eq!(m.strategy_total_return_pct.unwrap(), 0.0);
        assert_relative_eq!(m.buyhold_total_return_pct.unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn held_signal_earns_next_return() {
        let closes = [10.0, 10.0, 10.0, 12.0, 15.0];
        let config = BacktestConfig::new(2, 3).unwrap();
        let run = run_crossover(&closes, &config);
        // signal turns on at index 3, so index 4's +25% is captured
        assert_eq!(run.signal[3], 1);
        assert_relative_eq!(run.strategy_returns[3], 0.0);
        assert_relative_eq!(run.strategy_returns[4], 0.25);
    }

    #[test]
    fn uptrend_strategy_tracks_market_after_warmup() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let m = metrics(run_backtest(&history(&closes), &BacktestConfig::default()));
        let strategy = m.strategy_total_return_pct.unwrap();
        let buyhold = m.buyhold_total_return_pct.unwrap();
        assert!(strategy > 0.0);
        assert!(strategy < buyhold);
        assert_relative_eq!(m.strategy_max_drawdown_pct.unwrap(), 0.0);
    }

    #[test]
    fn drawdown_never_positive() {
        let closes: Vec<f64> = (0..150)
            .map(|i| 100.0 + (i as f64 / 6.0).sin() * 15.0 + i as f64 * 0.2)
            .collect();
        let m = metrics(run_backtest(&history(&closes), &BacktestConfig::new(5, 15).unwrap()));
        assert!(m.strategy_max_drawdown_pct.unwrap() <= 0.0);
    }

    #[test]
    fn single_bar_has_no_annualized_return() {
        let m = metrics(run_backtest(&history(&[10.0]), &BacktestConfig::default()));
        assert_eq!(m.strategy_annualized_return_pct, None);
        assert_eq!(m.buyhold_annualized_return_pct, None);
        assert_relative_eq!(m.buyhold_total_return_pct.unwrap(), 0.0);
    }

    #[test]
    fn gaps_count_as_zero_return() {
        let mut h = history(&[10.0, 11.0, 12.0]);
        h.bars[1].close = None;
        let run = run_crossover(&h.closes().unwrap(), &BacktestConfig::default());
        assert_eq!(run.asset_returns, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_over_zero_return_counts_as_zero() {
        let closes = [10.0, 0.0, 0.0];
        let run = run_crossover(&closes, &BacktestConfig::default());
        assert_eq!(run.asset_returns, vec![0.0, -1.0, 0.0]);
        assert_eq!(run.buyhold_equity, vec![1.0, 0.0, 0.0]);

        let m = metrics(run_backtest(&history(&closes), &BacktestConfig::default()));
        assert_relative_eq!(m.buyhold_total_return_pct.unwrap(), -100.0);
        assert_relative_eq!(m.strategy_total_return_pct.unwrap(), 0.0);
    }
}
