//! Indicator engine: raw daily series in, enriched panel out.
//!
//! The engine is a pure function: no I/O, no clock, no shared state. It runs
//! every configured indicator over the whole series, then `trim` drops the
//! warm-up rows and keeps the output window the caller asked for.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Observation;
use crate::indicators::{
    BollingerPercentB, ChangePct, Indicator, MaDeviation, Rsi, Sma, VolumeRatio,
};

/// Default number of complete rows kept in full-history mode (~1 trading year).
pub const DEFAULT_RETAIN_ROWS: usize = 250;

/// Window lengths and multipliers for the indicator panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ma_short: usize,
    pub ma_mid: usize,
    pub ma_long: usize,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub volume_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_mid: 25,
            ma_long: 75,
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            volume_period: 5,
        }
    }
}

impl IndicatorConfig {
    /// Window lengths that must all be at least 1.
    pub fn periods(&self) -> [(&'static str, usize); 6] {
        [
            ("ma_short", self.ma_short),
            ("ma_mid", self.ma_mid),
            ("ma_long", self.ma_long),
            ("rsi_period", self.rsi_period),
            ("bollinger_period", self.bollinger_period),
            ("volume_period", self.volume_period),
        ]
    }

    /// Minimum series length that can produce one complete row.
    pub fn required_history(&self) -> usize {
        let longest_window = [
            self.ma_short,
            self.ma_mid,
            self.ma_long,
            self.bollinger_period,
            self.volume_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(1);
        longest_window.max(self.rsi_period + 1).max(2)
    }
}

/// One trading day of the indicator panel.
///
/// Derived fields are `None` while their window is not yet saturated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    pub ma_short: Option<f64>,
    pub ma_mid: Option<f64>,
    pub ma_long: Option<f64>,
    pub deviation_short: Option<f64>,
    pub deviation_mid: Option<f64>,
    pub deviation_long: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_percent_b: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub change_pct: Option<f64>,
}

impl IndicatorRow {
    /// True when every derived field is defined (the row is past warm-up).
    pub fn is_complete(&self) -> bool {
        self.ma_short.is_some()
            && self.ma_mid.is_some()
            && self.ma_long.is_some()
            && self.deviation_short.is_some()
            && self.deviation_mid.is_some()
            && self.deviation_long.is_some()
            && self.rsi.is_some()
            && self.bb_percent_b.is_some()
            && self.volume_ratio.is_some()
            && self.change_pct.is_some()
    }
}

/// Which part of the complete rows a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputWindow {
    /// The most recent `max_rows` complete rows, oldest first.
    FullHistory { max_rows: usize },
    /// Only the single most recent complete row.
    LatestOnly,
}

/// Runs the full indicator panel over an observation series.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn required_history(&self) -> usize {
        self.config.required_history()
    }

    /// Compute every derived field for every observation.
    ///
    /// Output has the same length and chronological order as the input.
    pub fn compute(&self, series: &[Observation]) -> Vec<IndicatorRow> {
        let c = &self.config;
        let ma_short = Sma::new(c.ma_short).compute(series);
        let ma_mid = Sma::new(c.ma_mid).compute(series);
        let ma_long = Sma::new(c.ma_long).compute(series);
        let dev_short = MaDeviation::new(c.ma_short).compute(series);
        let dev_mid = MaDeviation::new(c.ma_mid).compute(series);
        let dev_long = MaDeviation::new(c.ma_long).compute(series);
        let rsi = Rsi::new(c.rsi_period).compute(series);
        let pct_b = BollingerPercentB::new(c.bollinger_period, c.bollinger_multiplier)
            .compute(series);
        let vol_ratio = VolumeRatio::new(c.volume_period).compute(series);
        let change = ChangePct::new().compute(series);

        series
            .iter()
            .enumerate()
            .map(|(i, obs)| IndicatorRow {
                date: obs.date,
                close: obs.close,
                volume: obs.volume,
                ma_short: defined(ma_short[i]),
                ma_mid: defined(ma_mid[i]),
                ma_long: defined(ma_long[i]),
                deviation_short: defined(dev_short[i]),
                deviation_mid: defined(dev_mid[i]),
                deviation_long: defined(dev_long[i]),
                rsi: defined(rsi[i]),
                bb_percent_b: defined(pct_b[i]),
                volume_ratio: defined(vol_ratio[i]),
                change_pct: defined(change[i]),
            })
            .collect()
    }

    /// `compute` followed by `trim`.
    pub fn run(&self, series: &[Observation], window: OutputWindow) -> Vec<IndicatorRow> {
        trim(self.compute(series), window)
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

fn defined(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Drop incomplete rows, then keep the requested tail of what remains.
pub fn trim(rows: Vec<IndicatorRow>, window: OutputWindow) -> Vec<IndicatorRow> {
    let mut complete: Vec<IndicatorRow> = rows.into_iter().filter(|r| r.is_complete()).collect();
    let keep = match window {
        OutputWindow::FullHistory { max_rows } => max_rows,
        OutputWindow::LatestOnly => 1,
    };
    if complete.len() > keep {
        complete.drain(..complete.len() - keep);
    }
    complete
}
