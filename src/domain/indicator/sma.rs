//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). A window containing a gap is undefined, as
//! is every position before the first full window.

use super::IndicatorSeries;

pub fn calculate_sma(closes: &[f64], window: usize) -> IndicatorSeries {
    if window == 0 {
        return vec![None; closes.len()];
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &closes[i + 1 - window..=i];
            if slice.iter().any(|c| !c.is_finite()) {
                return None;
            }
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}
