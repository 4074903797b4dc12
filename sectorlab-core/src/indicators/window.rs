//! Trailing-window statistics shared by the rolling indicators.
//!
//! A window whose values are all identical short-circuits to
//! `(value, 0.0)`: summing and dividing would otherwise leave rounding
//! residue in the mean and a tiny non-zero deviation for constant prices.

/// Mean and sample standard deviation (divide by n - 1) of a window.
///
/// Empty windows yield NaN. A single-element window has deviation 0.
pub fn mean_and_std(window: &[f64]) -> (f64, f64) {
    let Some(&first) = window.first() else {
        return (f64::NAN, f64::NAN);
    };
    if window.iter().any(|v| v.is_nan()) {
        return (f64::NAN, f64::NAN);
    }
    if window.iter().all(|&v| v == first) {
        return (first, 0.0);
    }

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    if window.len() < 2 {
        return (mean, 0.0);
    }
    let variance = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Arithmetic mean of a window (NaN if empty or any value is NaN).
pub fn mean(window: &[f64]) -> f64 {
    mean_and_std(window).0
}

/// Apply `f` to every full trailing window of length `period`.
///
/// Positions before the first full window are NaN.
pub fn rolling<F>(values: &[f64], period: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        result[i] = f(&values[(i + 1 - period)..=i]);
    }
    result
}
