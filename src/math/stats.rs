//! Summary statistics with degenerate-case guards.
//!
//! Every ratio computed by the analytics layer goes through [`safe_ratio`], so
//! a zero denominator or an overflow yields `None` instead of an infinity or a
//! NaN. Callers decide whether `None` means "absent" or a guarded zero.

/// `num / den`, or `None` when the denominator is zero or the result is not finite.
pub fn safe_ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    r.is_finite().then_some(r)
}

/// Percent change from `lagged` to `current`.
pub fn pct_change(current: f64, lagged: f64) -> Option<f64> {
    safe_ratio(current - lagged, lagged).map(|r| r * 100.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    m.is_finite().then_some(m)
}

/// Population standard deviation (`n` denominator).
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Sample standard deviation (`n - 1` denominator). Needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
