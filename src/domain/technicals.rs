//! Technical summary: the latest value of each indicator for UI and model context.

use serde::Serialize;

use crate::domain::coerce::finite;
use crate::domain::indicator::{
    calculate_macd_default, calculate_pct_change, calculate_rolling_std, calculate_rsi,
    calculate_sma, last_value, DEFAULT_RSI_WINDOW,
};
use crate::domain::ohlcv::PriceHistory;

pub const NO_HISTORY_MESSAGE: &str = "No price history available.";

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const VOLATILITY_WINDOW: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalIndicators {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub volatility_30d_pct: Option<f64>,
}

/// Either the full indicator set or a single `error` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TechnicalSummary {
    Indicators(TechnicalIndicators),
    Unavailable { error: String },
}

impl TechnicalSummary {
    pub fn no_history() -> Self {
        Self::Unavailable {
            error: NO_HISTORY_MESSAGE.to_string(),
        }
    }
}

pub fn technical_summary(history: &PriceHistory) -> TechnicalSummary {
    let Some(closes) = history.closes() else {
        return TechnicalSummary::no_history();
    };

    let macd = calculate_macd_default(&closes);
    let returns = calculate_pct_change(&closes);
    let volatility = last_value(&calculate_rolling_std(&returns, VOLATILITY_WINDOW))
        .map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt() * 100.0);

    TechnicalSummary::Indicators(TechnicalIndicators {
        sma_20: last_finite(&calculate_sma(&closes, 20)),
        sma_50: last_finite(&calculate_sma(&closes, 50)),
        rsi_14: last_finite(&calculate_rsi(&closes, DEFAULT_RSI_WINDOW)),
        macd: last_finite(&macd.line),
        macd_signal: last_finite(&macd.signal),
        macd_hist: last_finite(&macd.histogram),
        volatility_30d_pct: volatility.and_then(finite),
    })
}

fn last_finite(series: &[Option<f64>]) -> Option<f64> {
    last_value(series).and_then(finite)
}
