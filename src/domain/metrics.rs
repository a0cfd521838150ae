//! Performance metrics over an equity curve.
//!
//! Curves are growth-of-one-unit series (first point is the equity after the
//! first period). All results are percentages.

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// (final - 1) * 100
pub fn total_return_pct(equity_curve: &[f64]) -> Option<f64> {
    equity_curve.last().map(|e| (e - 1.0) * 100.0)
}

/// final^(252/N) - 1, in percent. Undefined for fewer than two points.
pub fn annualized_return_pct(equity_curve: &[f64]) -> Option<f64> {
    let days = equity_curve.len();
    if days < 2 {
        return None;
    }
    let total = *equity_curve.last()?;
    let years = days as f64 / TRADING_DAYS_PER_YEAR;
    Some((total.powf(1.0 / years) - 1.0) * 100.0)
}

/// min(equity / running_peak - 1) * 100; zero or negative.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> Option<f64> {
    let first = *equity_curve.first()?;

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        let dd = equity / peak - 1.0;
        if dd < max_dd {
            max_dd = dd;
        }
    }

    Some(max_dd * 100.0)
}
