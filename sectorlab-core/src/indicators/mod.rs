//! Indicator panel: one type per derived column.
//!
//! Every indicator is a pure function from an observation series to a numeric
//! series of the same length. The first `lookback()` values are `f64::NAN`
//! (warm-up). The engine (`crate::engine`) turns those NaNs into `None`.

pub mod bollinger;
pub mod change;
pub mod deviation;
pub mod rsi;
pub mod sma;
pub mod volume;
pub mod window;

pub use bollinger::BollingerPercentB;
pub use change::ChangePct;
pub use deviation::MaDeviation;
pub use rsi::Rsi;
pub use sma::Sma;
pub use volume::VolumeRatio;

use crate::domain::Observation;

/// A per-day derived series.
///
/// Windows are trailing and include the current day, so the value at index
/// `t` never depends on observations after `t`.
pub trait Indicator: Send + Sync {
    /// Column-style identifier such as `sma_25` or `rsi_14`.
    fn name(&self) -> &str;

    /// Leading positions that are always `NaN`.
    fn lookback(&self) -> usize;

    /// One value per observation, `NaN` while warming up.
    fn compute(&self, series: &[Observation]) -> Vec<f64>;
}

pub(crate) fn closes(series: &[Observation]) -> Vec<f64> {
    series.iter().map(|o| o.close).collect()
}

pub(crate) fn volumes(series: &[Observation]) -> Vec<f64> {
    series.iter().map(|o| o.volume as f64).collect()
}

/// Daily series with the given closes, one calendar day apart, volume 1000.
#[cfg(test)]
pub fn series_from_closes(closes: &[f64]) -> Vec<Observation> {
    let first = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    first
        .iter_days()
        .zip(closes)
        .map(|(date, &close)| Observation::new(date, close, 1000))
        .collect()
}

#[cfg(test)]
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff < tolerance,
        "{actual} differs from {expected} by {diff} (tolerance {tolerance})"
    );
}

#[cfg(test)]
pub const EPS: f64 = 1e-10;
