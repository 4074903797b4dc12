//! Bollinger %B: position of the close inside its volatility band.
//!
//! - Middle: SMA(close, period)
//! - Upper/Lower: middle +/- mult * sample stddev(close, period)
//! - %B = (close - lower) / (upper - lower)
//!
//! %B > 1 means the close broke above the upper band, < 0 below the lower.
//! A zero-width band (constant price) yields 0.
//! Lookback: period - 1.

use super::window::mean_and_std;
use super::{closes, Indicator};
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct BollingerPercentB {
    period: usize,
    multiplier: f64,
    name: String,
}

impl BollingerPercentB {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period > 0, "Bollinger window must be positive");
        Self {
            period,
            multiplier,
            name: format!("bollinger_pct_b_{period}_{multiplier}"),
        }
    }
}

impl Indicator for BollingerPercentB {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let closes = closes(series);
        let n = closes.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &closes[(i + 1 - self.period)..=i];
            let (middle, stddev) = mean_and_std(window);
            if middle.is_nan() {
                continue;
            }
            let upper = middle + self.multiplier * stddev;
            let lower = middle - self.multiplier * stddev;
            let width = upper - lower;
            result[i] = if width == 0.0 {
                0.0
            } else {
                (closes[i] - lower) / width
            };
        }

        result
    }
}
