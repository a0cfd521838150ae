//! Percent change and rolling standard deviation.
//!
//! PCT[i] = C[i] / C[i-1] - 1, undefined at i = 0 and wherever either side is a gap.
//! STDDEV(n)[i] = sqrt(sum((x - mean)^2) / (n - 1)) over the trailing n values
//! (sample deviation). A window with any undefined value is undefined.
//! Warmup: first (n-1) positions are undefined.

use super::IndicatorSeries;

pub fn calculate_pct_change(closes: &[f64]) -> IndicatorSeries {
    (0..closes.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            let (prev, curr) = (closes[i - 1], closes[i]);
            if prev.is_nan() || curr.is_nan() {
                None
            } else {
                Some(curr / prev - 1.0)
            }
        })
        .collect()
}

pub fn calculate_rolling_std(values: &[Option<f64>], window: usize) -> IndicatorSeries {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice: Option<Vec<f64>> = values[i + 1 - window..=i]
                .iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            let slice = slice?;

            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance = slice
                .iter()
                .map(|x| {
                    let diff = x - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (window - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}
