//! Exponential Moving Average, non-adjusted form.
//!
//! alpha = 2/(span+1). The first observed value seeds the average, after which
//! EMA[i] = (1-alpha)*EMA[i-1] + alpha*C[i]. There is no bias-correction term.
//!
//! Gaps hold the previous average. The weight of that average keeps decaying
//! across the gap, so the next observation counts for more than alpha:
//! EMA = (w*EMA + alpha*C) / (w + alpha) where w = (1-alpha)^(gap+1).
//! Positions before the first observation are undefined.

use super::IndicatorSeries;

pub fn calculate_ema(closes: &[f64], span: usize) -> IndicatorSeries {
    if span == 0 {
        return vec![None; closes.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut values = Vec::with_capacity(closes.len());
    let mut average: Option<f64> = None;
    let mut old_weight = 1.0;

    for &close in closes {
        let observed = !close.is_nan();
        match average {
            Some(prev) => {
                old_weight *= decay;
                if observed {
                    if prev != close {
                        average = Some((old_weight * prev + alpha * close) / (old_weight + alpha));
                    }
                    old_weight = 1.0;
                }
            }
            None if observed => average = Some(close),
            None => {}
        }
        values.push(average);
    }

    values
}
