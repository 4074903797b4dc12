//! Fetch orchestrator: runs one task per instrument on a bounded pool.
//!
//! The pool is private to the batch so its size is exactly `workers`,
//! independent of rayon's global pool. Tasks share only the provider and
//! the run context; results are collected once every task has finished.

use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use sectorlab_core::data::DataProvider;
use sectorlab_core::{Instrument, TableRow};

use crate::task::{run_task, TaskContext, TaskOutcome};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Everything a batch produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Rows from every successful task, in no particular order.
    pub rows: Vec<TableRow>,
    /// Codes of instruments that produced rows.
    pub succeeded: Vec<String>,
    /// Codes and error messages of instruments that produced nothing.
    pub failed: Vec<(String, String)>,
}

impl BatchOutcome {
    fn from_outcomes(outcomes: Vec<TaskOutcome>) -> Self {
        let mut batch = BatchOutcome::default();
        for outcome in outcomes {
            match outcome.error {
                None => {
                    batch.succeeded.push(outcome.instrument.code);
                    batch.rows.extend(outcome.rows);
                }
                Some(error) => batch.failed.push((outcome.instrument.code, error.to_string())),
            }
        }
        batch
    }
}

/// Run every instrument through `run_task` on a pool of `workers` threads.
///
/// Individual task failures are reported in the outcome, never as an error.
pub fn run_batch(
    provider: &dyn DataProvider,
    instruments: &[Instrument],
    ctx: &TaskContext,
    workers: usize,
) -> Result<BatchOutcome, OrchestratorError> {
    if workers == 0 {
        return Err(OrchestratorError::NoWorkers);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("sectorlab-fetch-{i}"))
        .build()?;

    info!(
        instruments = instruments.len(),
        workers,
        mode = %ctx.mode,
        provider = provider.name(),
        "batch started"
    );

    let outcomes: Vec<TaskOutcome> = pool.install(|| {
        instruments
            .par_iter()
            .map(|instrument| run_task(provider, instrument, ctx))
            .collect()
    });

    let batch = BatchOutcome::from_outcomes(outcomes);
    info!(
        rows = batch.rows.len(),
        succeeded = batch.succeeded.len(),
        failed = batch.failed.len(),
        "batch finished"
    );
    Ok(batch)
}
