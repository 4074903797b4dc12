//! Trailing simple moving average of the close.
//!
//! The value at index `t` is the mean of closes `t - period + 1 ..= t`.

use super::window::{mean, rolling};
use super::{closes, Indicator};
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Panics if `period` is zero.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "moving average window must be positive");
        Self {
            name: format!("sma_{period}"),
            period,
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        rolling(&closes(series), self.period, mean)
    }
}
