//! Day-over-day percentage change of the close.
//!
//! change = (close[t] - close[t-1]) / close[t-1] * 100
//! Lookback: 1 (undefined for the first observation).

use super::{closes, Indicator};
use crate::domain::Observation;

#[derive(Debug, Clone, Default)]
pub struct ChangePct;

impl ChangePct {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for ChangePct {
    fn name(&self) -> &str {
        "change_pct"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let closes = closes(series);
        let mut result = vec![f64::NAN; closes.len()];
        for i in 1..closes.len() {
            let prev = closes[i - 1];
            result[i] = (closes[i] - prev) / prev * 100.0;
        }
        result
    }
}
