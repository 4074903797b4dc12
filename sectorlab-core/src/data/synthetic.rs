//! Synthetic data provider for offline runs and tests.
//!
//! Produces a deterministic random walk per symbol: the RNG is seeded from
//! the BLAKE3 hash of the symbol, so the same symbol and date range always
//! yield the same series. Weekends are skipped; no holiday calendar.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataProvider, DataSource, PriceHistory};
use crate::domain::Observation;

/// Deterministic random-walk provider.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    start_price: f64,
    max_daily_move: f64,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self {
            start_price: 1000.0,
            max_daily_move: 0.03,
        }
    }

    fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Observation> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut observations = Vec::new();
        let mut price = self.start_price;
        let mut current = start;

        while current <= end {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-self.max_daily_move..self.max_daily_move);
            price *= 1.0 + daily_return;
            let volume = rng.gen_range(50_000..2_000_000u64);

            observations.push(Observation {
                date: current,
                close: price,
                volume,
            });
            current += chrono::Duration::days(1);
        }

        observations
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        Ok(PriceHistory {
            symbol: symbol.to_string(),
            observations: self.generate(symbol, start, end),
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
