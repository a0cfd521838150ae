//! RSI (Relative Strength Index).
//!
//! Per-step change d[i] = C[i] - C[i-1]; gain = max(d, 0), loss = max(-d, 0).
//! The first step and any step touching a gap contribute 0 to both.
//! avg_gain / avg_loss are trailing simple means over `window` steps.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 the ratio is undefined and so is RSI; it does not
//! saturate at 100.
//!
//! Warmup: first (window-1) positions are undefined.

use super::IndicatorSeries;

pub const DEFAULT_RSI_WINDOW: usize = 14;

pub fn calculate_rsi(closes: &[f64], window: usize) -> IndicatorSeries {
    if window == 0 {
        return vec![None; closes.len()];
    }

    let mut gains: Vec<f64> = Vec::with_capacity(closes.len());
    let mut losses: Vec<f64> = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        let change = if i == 0 {
            f64::NAN
        } else {
            closes[i] - closes[i - 1]
        };
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let start = i + 1 - window;
            let avg_gain = gains[start..=i].iter().sum::<f64>() / window as f64;
            let avg_loss = losses[start..=i].iter().sum::<f64>() / window as f64;
            if avg_loss == 0.0 {
                return None;
            }
            let rs = avg_gain / avg_loss;
            Some(100.0 - (100.0 / (1.0 + rs)))
        })
        .collect()
}
