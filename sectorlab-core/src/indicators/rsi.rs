//! Relative strength index over trailing simple means.
//!
//! Gains and losses are the positive and negative parts of day-over-day
//! close changes. Their plain `period`-day means (no Wilder smoothing) give
//! `100 - 100 / (1 + gain / loss)`. The first value sits at index `period`,
//! once `period` changes exist.
//!
//! Rolling-mean implementations that fill the missing day-0 change with zero
//! emit their first value one day earlier, at `period - 1`. Here the day-0
//! slot stays undefined, so the first window holds `period` real changes.
//! The two agree from index `period` on, and the longest moving average
//! normally decides the first complete row anyway.

use super::window::{mean, rolling};
use super::{closes, Indicator};
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    /// Panics if `period` is zero.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI window must be positive");
        Self {
            name: format!("rsi_{period}"),
            period,
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let closes = closes(series);
        // Day 0 has no change; the NaN keeps the first window from saturating early.
        let changes: Vec<f64> = std::iter::once(f64::NAN)
            .chain(closes.windows(2).map(|w| w[1] - w[0]))
            .take(closes.len())
            .collect();
        let gains: Vec<f64> = changes.iter().map(|&c| if c < 0.0 { 0.0 } else { c }).collect();
        let losses: Vec<f64> = changes.iter().map(|&c| if c > 0.0 { 0.0 } else { -c }).collect();

        let avg_gain = rolling(&gains, self.period, mean);
        let avg_loss = rolling(&losses, self.period, mean);
        avg_gain
            .into_iter()
            .zip(avg_loss)
            .map(|(gain, loss)| compute_rsi(gain, loss))
            .collect()
    }
}

/// RSI from mean gain and mean loss.
///
/// No losses gives 100, no gains gives 0, and a window with no movement at
/// all is neutral at 50.
pub fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain, avg_loss) {
        (g, l) if g.is_nan() || l.is_nan() => f64::NAN,
        (g, l) if g == 0.0 && l == 0.0 => 50.0,
        (_, l) if l == 0.0 => 100.0,
        (g, _) if g == 0.0 => 0.0,
        (g, l) => 100.0 - 100.0 / (1.0 + g / l),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_close, series_from_closes};

    #[test]
    fn steady_climb_saturates() {
        let out = Rsi::new(3).compute(&series_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0]));
        assert!(out[..3].iter().all(|v| v.is_nan()));
        assert_eq!(&out[3..], &[100.0, 100.0]);
    }

    #[test]
    fn steady_decline_bottoms_out() {
        let out = Rsi::new(3).compute(&series_from_closes(&[14.0, 13.0, 12.0, 11.0]));
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn first_value_waits_for_full_window_of_changes() {
        let out = Rsi::new(3).compute(&series_from_closes(&[10.0, 12.0, 11.0, 13.0]));
        assert!(out[2].is_nan());
        // Gain sum 4.0, loss sum 1.0
        assert_close(out[3], 80.0, 1e-9);
    }

    #[test]
    fn no_movement_is_neutral() {
        let out = Rsi::new(14).compute(&series_from_closes(&[250.0; 16]));
        assert!(out[13].is_nan());
        assert_eq!(out[14], 50.0);
        assert_eq!(out[15], 50.0);
    }

    #[test]
    fn simple_means_of_gains_and_losses() {
        // Changes: +2.0, -1.0, -0.5, +1.5
        let out = Rsi::new(3).compute(&series_from_closes(&[20.0, 22.0, 21.0, 20.5, 22.0]));
        // Index 3: gain sum 2.0, loss sum 1.5
        assert_close(out[3], 100.0 - 100.0 / (1.0 + 2.0 / 1.5), 1e-9);
        // Index 4: gain sum 1.5, loss sum 1.5
        assert_close(out[4], 50.0, 1e-9);
    }

    #[test]
    fn stays_in_range_on_whipsaw() {
        let out = Rsi::new(3).compute(&series_from_closes(&[
            80.0, 92.0, 71.0, 99.0, 64.0, 101.0, 60.0, 104.0,
        ]));
        assert!(out
            .iter()
            .filter(|v| !v.is_nan())
            .all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn zero_branches() {
        assert_eq!(compute_rsi(0.0, 0.0), 50.0);
        assert_eq!(compute_rsi(1.2, 0.0), 100.0);
        assert_eq!(compute_rsi(0.0, 0.8), 0.0);
        assert!(compute_rsi(f64::NAN, 1.0).is_nan());
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
