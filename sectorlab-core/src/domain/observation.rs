//! Observation: one trading day of raw market data for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily close and volume for a single instrument on a single trading day.
///
/// Observations are immutable once a provider hands them out. A series of
/// observations is expected in ascending date order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

impl Observation {
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }

    /// True when the close is a finite, strictly positive price.
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
