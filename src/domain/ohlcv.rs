//! OHLCV bar representation and price history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single bar. Providers leave holes, so every price field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
}

impl OhlcvBar {
    /// Bar with every price set to `close`.
    pub fn flat(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume: None,
        }
    }
}

/// Bars in ascending timestamp order. Spacing is not required to be uniform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub bars: Vec<OhlcvBar>,
}

impl PriceHistory {
    pub fn new(mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self { bars }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True when at least one bar carries a close.
    pub fn has_close(&self) -> bool {
        self.bars.iter().any(|b| b.close.is_some())
    }

    /// Closing prices with NaN standing in for gaps, or `None` when the
    /// history is empty or has no close column at all.
    pub fn closes(&self) -> Option<Vec<f64>> {
        if self.is_empty() || !self.has_close() {
            return None;
        }
        Some(
            self.bars
                .iter()
                .map(|b| b.close.unwrap_or(f64::NAN))
                .collect(),
        )
    }
}
