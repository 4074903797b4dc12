//! Volume ratio: today's volume against its trailing mean.
//!
//! ratio = volume / SMA(volume, period); 0 when that mean is exactly 0.
//! Lookback: period - 1.

use super::window::{mean, rolling};
use super::{volumes, Indicator};
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
    name: String,
}

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "volume window must be positive");
        Self {
            period,
            name: format!("volume_ratio_{period}"),
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let volumes = volumes(series);
        rolling(&volumes, self.period, mean)
            .into_iter()
            .zip(&volumes)
            .map(|(avg, &vol)| {
                if avg.is_nan() {
                    f64::NAN
                } else if avg == 0.0 {
                    0.0
                } else {
                    vol / avg
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_close, series_from_closes, EPS};

    #[test]
    fn constant_volume_ratio_is_one() {
        let series = series_from_closes(&[100.0; 8]);
        let result = VolumeRatio::new(5).compute(&series);
        assert!(result[3].is_nan());
        assert_eq!(result[4], 1.0);
    }

    #[test]
    fn spike_volume() {
        let mut series = series_from_closes(&[100.0; 5]);
        series[4].volume = 5000;
        // mean = (4 * 1000 + 5000) / 5 = 1800
        let result = VolumeRatio::new(5).compute(&series);
        assert_close(result[4], 5000.0 / 1800.0, EPS);
    }

    #[test]
    fn zero_volume_mean_is_zero() {
        let mut series = series_from_closes(&[100.0; 5]);
        for obs in &mut series {
            obs.volume = 0;
        }
        assert_eq!(VolumeRatio::new(5).compute(&series)[4], 0.0);
    }
}
