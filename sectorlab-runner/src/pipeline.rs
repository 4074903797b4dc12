//! One update run, end to end.
//!
//! Resolve the mode from the store, fetch and derive every instrument,
//! merge, then write once. The store is read before any fetch so an
//! unreachable table fails the run before anything is written.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{info, warn};

use sectorlab_core::data::DataProvider;
use sectorlab_core::schema::DATE_FORMAT;

use crate::config::SectorLabConfig;
use crate::merge::{apply_plan, plan_write, resolve_mode, MergePolicy, UpdateMode};
use crate::orchestrator::{run_batch, OrchestratorError};
use crate::store::{StoreError, TableStore};
use crate::task::TaskContext;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("table store: {0}")]
    Store(#[from] StoreError),

    #[error("orchestrator: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

/// What an update run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub mode: UpdateMode,
    pub computed_at: NaiveDateTime,
    pub rows_written: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Run one update against `store` using `provider`.
///
/// `computed_at` is stamped on every row written by this run.
pub fn run_update(
    config: &SectorLabConfig,
    provider: &dyn DataProvider,
    store: &dyn TableStore,
    computed_at: NaiveDateTime,
) -> Result<RunSummary, RunError> {
    let first_cell = store.read_first_cell()?;
    let mode = resolve_mode(first_cell.as_deref());
    info!(%mode, %computed_at, "update run started");

    let ctx = TaskContext::for_universe(
        &config.universe,
        mode,
        config.indicators.clone(),
        config.fetch.lookback_days,
        config.fetch.retain_rows,
        computed_at,
    );
    let batch = run_batch(provider, &config.universe.instruments, &ctx, config.fetch.workers)?;
    for (code, error) in &batch.failed {
        warn!(instrument = %code, %error, "no rows for instrument");
    }

    let policy = MergePolicy {
        skip_existing: config.store.skip_existing,
    };
    let existing = if mode == UpdateMode::Incremental && policy.skip_existing {
        existing_keys(store)?
    } else {
        HashSet::new()
    };

    let plan = plan_write(mode, batch.rows, &policy, &existing);
    let written = apply_plan(store, plan)?;

    info!(
        %mode,
        rows = written.rows_written,
        failed = batch.failed.len(),
        "update run finished"
    );
    Ok(RunSummary {
        mode,
        computed_at,
        rows_written: written.rows_written,
        succeeded: batch.succeeded,
        failed: batch.failed,
    })
}

/// (instrument, date) keys already stored. Rows whose key does not parse are ignored.
fn existing_keys(store: &dyn TableStore) -> Result<HashSet<(String, NaiveDate)>, StoreError> {
    Ok(store
        .read_all_rows()?
        .into_iter()
        .filter_map(|cells| {
            let code = cells.first()?.trim().to_string();
            let date = NaiveDate::parse_from_str(cells.get(2)?.trim(), DATE_FORMAT).ok()?;
            Some((code, date))
        })
        .collect())
}
