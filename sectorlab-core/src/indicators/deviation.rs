//! Moving-average deviation: how far the close sits from its SMA, in percent.
//!
//! deviation = (close - SMA) / SMA * 100
//! Lookback: period - 1.

use super::sma::Sma;
use super::Indicator;
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct MaDeviation {
    sma: Sma,
    name: String,
}

impl MaDeviation {
    pub fn new(period: usize) -> Self {
        Self {
            sma: Sma::new(period),
            name: format!("deviation_{period}"),
        }
    }
}

/// Percent deviation of `close` from `ma`. NaN while `ma` is undefined.
pub fn deviation_pct(close: f64, ma: f64) -> f64 {
    if ma.is_nan() {
        return f64::NAN;
    }
    (close - ma) / ma * 100.0
}

impl Indicator for MaDeviation {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.sma.lookback()
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        self.sma
            .compute(series)
            .into_iter()
            .zip(series)
            .map(|(ma, obs)| deviation_pct(obs.close, ma))
            .collect()
    }
}
