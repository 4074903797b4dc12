//! Per-instrument fetch-and-derive task.
//!
//! One task turns one instrument into zero or more table rows: fetch the
//! daily series, drop unusable observations, run the engine, trim to the
//! mode's output window and stamp the run timestamp. Failures stay inside
//! the task; `run_task` never propagates them.

use chrono::{Days, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, warn};

use sectorlab_core::data::{DataError, DataProvider, Universe};
use sectorlab_core::{IndicatorConfig, IndicatorEngine, Instrument, Observation, TableRow};

use crate::merge::UpdateMode;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] DataError),

    #[error("provider returned no usable observations")]
    Empty,

    #[error("insufficient history: have {have} observations, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("no complete indicator rows")]
    NoCompleteRows,

    #[error("lookback of {lookback_days} days reaches before the earliest representable date")]
    WindowOutOfRange { lookback_days: u32 },
}

/// Immutable inputs shared by every task of one run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub mode: UpdateMode,
    pub lookback_days: u32,
    pub retain_rows: usize,
    pub indicators: IndicatorConfig,
    /// Stamped on every row of the run.
    pub computed_at: NaiveDateTime,
    /// Last day of the requested window.
    pub today: NaiveDate,
    pub ticker_suffix: String,
}

impl TaskContext {
    /// First day of the requested window.
    pub fn start_date(&self) -> Result<NaiveDate, TaskError> {
        self.today
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .ok_or(TaskError::WindowOutOfRange {
                lookback_days: self.lookback_days,
            })
    }

    pub fn ticker(&self, instrument: &Instrument) -> String {
        instrument.ticker(&self.ticker_suffix)
    }

    /// Context for a universe, stamped with `computed_at`.
    pub fn for_universe(
        universe: &Universe,
        mode: UpdateMode,
        indicators: IndicatorConfig,
        lookback_days: u32,
        retain_rows: usize,
        computed_at: NaiveDateTime,
    ) -> Self {
        Self {
            mode,
            lookback_days,
            retain_rows,
            indicators,
            computed_at,
            today: computed_at.date(),
            ticker_suffix: universe.ticker_suffix.clone(),
        }
    }
}

/// Result of one task. `error` is set when the instrument produced nothing.
#[derive(Debug)]
pub struct TaskOutcome {
    pub instrument: Instrument,
    pub rows: Vec<TableRow>,
    pub error: Option<TaskError>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetch one instrument's history and derive its table rows.
pub fn fetch_and_derive(
    provider: &dyn DataProvider,
    instrument: &Instrument,
    ctx: &TaskContext,
) -> Result<Vec<TableRow>, TaskError> {
    let symbol = ctx.ticker(instrument);
    let fetched = provider.fetch(&symbol, ctx.start_date()?, ctx.today)?;
    let raw = fetched.observations.len();

    let series: Vec<Observation> = fetched
        .observations
        .into_iter()
        .filter(Observation::is_sane)
        .collect();
    if series.is_empty() {
        return Err(TaskError::Empty);
    }
    if series.len() < raw {
        debug!(instrument = %instrument.code, dropped = raw - series.len(), "dropped unusable observations");
    }

    let engine = IndicatorEngine::new(ctx.indicators.clone());
    let need = engine.required_history();
    if series.len() < need {
        return Err(TaskError::InsufficientHistory {
            have: series.len(),
            need,
        });
    }

    let rows: Vec<TableRow> = engine
        .run(&series, ctx.mode.output_window(ctx.retain_rows))
        .iter()
        .filter_map(|row| TableRow::from_indicator_row(instrument, row, ctx.computed_at))
        .collect();
    if rows.is_empty() {
        return Err(TaskError::NoCompleteRows);
    }

    debug!(instrument = %instrument.code, rows = rows.len(), "derived");
    Ok(rows)
}

/// `fetch_and_derive` with every failure absorbed into the outcome.
pub fn run_task(
    provider: &dyn DataProvider,
    instrument: &Instrument,
    ctx: &TaskContext,
) -> TaskOutcome {
    match fetch_and_derive(provider, instrument, ctx) {
        Ok(rows) => TaskOutcome {
            instrument: instrument.clone(),
            rows,
            error: None,
        },
        Err(error) => {
            warn!(instrument = %instrument.code, %error, "instrument skipped");
            TaskOutcome {
                instrument: instrument.clone(),
                rows: Vec::new(),
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectorlab_core::data::{DataSource, PriceHistory, SyntheticProvider};
    use chrono::Duration;

    struct FixedProvider(Vec<Observation>);

    impl DataProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceHistory, DataError> {
            Ok(PriceHistory {
                symbol: symbol.to_string(),
                observations: self.0.clone(),
                source: DataSource::Synthetic,
            })
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    struct DownProvider;

    impl DataProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }
        fn fetch(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<PriceHistory, DataError> {
            Err(DataError::Unreachable("connection refused".into()))
        }
        fn is_available(&self) -> bool {
            false
        }
    }

    fn ctx(mode: UpdateMode) -> TaskContext {
        let computed_at = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        TaskContext::for_universe(
            &Universe::topix17(),
            mode,
            IndicatorConfig::default(),
            730,
            250,
            computed_at,
        )
    }

    fn series(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                Observation::new(
                    start + Duration::days(i as i64),
                    1000.0 + (i as f64 * 0.7).sin() * 20.0,
                    10_000 + i as u64,
                )
            })
            .collect()
    }

    fn foods() -> Instrument {
        Instrument::new("1617", "Foods")
    }

    #[test]
    fn window_spans_lookback() {
        let c = ctx(UpdateMode::Bootstrap);
        assert_eq!(c.start_date().unwrap(), NaiveDate::from_ymd_opt(2022, 6, 4).unwrap());
        assert_eq!(c.ticker(&foods()), "1617.T");
    }

    #[test]
    fn oversized_lookback_is_a_task_error() {
        let mut c = ctx(UpdateMode::Bootstrap);
        c.lookback_days = u32::MAX;
        let err = fetch_and_derive(&FixedProvider(series(100)), &foods(), &c).unwrap_err();
        assert!(matches!(err, TaskError::WindowOutOfRange { lookback_days } if lookback_days == u32::MAX));

        let outcome = run_task(&FixedProvider(series(100)), &foods(), &c);
        assert!(outcome.rows.is_empty());
        assert!(!outcome.is_success());
    }

    #[test]
    fn bootstrap_returns_history() {
        let rows = fetch_and_derive(&FixedProvider(series(100)), &foods(), &ctx(UpdateMode::Bootstrap))
            .unwrap();
        assert_eq!(rows.len(), 26);
        assert!(rows.iter().all(|r| r.instrument_id == "1617" && r.sector_label == "Foods"));
    }

    #[test]
    fn incremental_returns_latest_only() {
        let obs = series(100);
        let last = obs[99].date;
        let rows = fetch_and_derive(&FixedProvider(obs), &foods(), &ctx(UpdateMode::Incremental))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, last);
    }

    #[test]
    fn every_row_shares_run_timestamp() {
        let c = ctx(UpdateMode::Bootstrap);
        let rows = fetch_and_derive(&FixedProvider(series(120)), &foods(), &c).unwrap();
        assert!(rows.iter().all(|r| r.computed_at == c.computed_at));
    }

    #[test]
    fn retain_rows_caps_bootstrap() {
        let mut c = ctx(UpdateMode::Bootstrap);
        c.retain_rows = 10;
        let rows = fetch_and_derive(&FixedProvider(series(200)), &foods(), &c).unwrap();
        assert_eq!(rows.len(), 10);
    }

    #[test]
    fn short_history_is_reported() {
        let err = fetch_and_derive(&FixedProvider(series(40)), &foods(), &ctx(UpdateMode::Bootstrap))
            .unwrap_err();
        assert!(matches!(err, TaskError::InsufficientHistory { have: 40, need: 75 }));
    }

    #[test]
    fn empty_fetch_is_reported() {
        let err = fetch_and_derive(&FixedProvider(Vec::new()), &foods(), &ctx(UpdateMode::Bootstrap))
            .unwrap_err();
        assert!(matches!(err, TaskError::Empty));
    }

    #[test]
    fn unusable_closes_are_dropped() {
        let mut obs = series(80);
        obs[10].close = f64::NAN;
        obs[20].close = 0.0;
        obs[30].close = -5.0;
        // 77 usable observations remain, enough for three complete rows.
        let rows = fetch_and_derive(&FixedProvider(obs), &foods(), &ctx(UpdateMode::Bootstrap))
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn run_task_absorbs_errors() {
        let outcome = run_task(&DownProvider, &foods(), &ctx(UpdateMode::Bootstrap));
        assert!(!outcome.is_success());
        assert!(outcome.rows.is_empty());
        assert!(matches!(outcome.error, Some(TaskError::Fetch(_))));
        assert_eq!(outcome.instrument, foods());
    }

    #[test]
    fn synthetic_provider_end_to_end() {
        let outcome = run_task(&SyntheticProvider::new(), &foods(), &ctx(UpdateMode::Bootstrap));
        assert!(outcome.is_success());
        assert_eq!(outcome.rows.len(), 250);
    }
}
