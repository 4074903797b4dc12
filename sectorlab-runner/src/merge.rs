//! Update-mode resolution and the merge/sort stage.
//!
//! Everything here is pure except `apply_plan`, which turns a `WritePlan`
//! into exactly one store call.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use sectorlab_core::schema::{header_row, TableRow, DATA_START_ROW};
use sectorlab_core::OutputWindow;

use crate::store::{StoreError, TableStore};

/// Whether a run rebuilds the table or prepends to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Empty table: write header plus full history.
    Bootstrap,
    /// Populated table: insert the latest row per instrument below the header.
    Incremental,
}

impl UpdateMode {
    /// Output window the engine is asked for in this mode.
    pub fn output_window(self, retain_rows: usize) -> OutputWindow {
        match self {
            UpdateMode::Bootstrap => OutputWindow::FullHistory {
                max_rows: retain_rows,
            },
            UpdateMode::Incremental => OutputWindow::LatestOnly,
        }
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateMode::Bootstrap => write!(f, "bootstrap"),
            UpdateMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// Decide the mode from the table's top-left cell.
pub fn resolve_mode(first_cell: Option<&str>) -> UpdateMode {
    match first_cell {
        Some(cell) if !cell.trim().is_empty() => UpdateMode::Incremental,
        _ => UpdateMode::Bootstrap,
    }
}

fn newest_first(a: &TableRow, b: &TableRow) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.instrument_id.cmp(&a.instrument_id))
}

/// Date descending, then instrument code descending.
pub fn sort_rows(mut rows: Vec<TableRow>) -> Vec<TableRow> {
    rows.sort_by(newest_first);
    rows
}

/// Drop repeated (instrument, date) pairs, keeping the first occurrence.
pub fn dedupe_rows(rows: Vec<TableRow>) -> Vec<TableRow> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| {
            let (code, date) = row.key();
            seen.insert((code.to_string(), date))
        })
        .collect()
}

/// Knobs for the incremental write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Drop incremental rows whose key is already in the table.
    pub skip_existing: bool,
}

/// The single store operation a run will perform.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePlan {
    Overwrite {
        header: Vec<String>,
        rows: Vec<TableRow>,
    },
    Insert {
        rows: Vec<TableRow>,
        at: usize,
    },
    Skip,
}

impl WritePlan {
    pub fn row_count(&self) -> usize {
        match self {
            WritePlan::Overwrite { rows, .. } | WritePlan::Insert { rows, .. } => rows.len(),
            WritePlan::Skip => 0,
        }
    }
}

/// Sort, dedupe and shape a batch into a write plan.
///
/// `existing` holds the keys already stored; it is only consulted on
/// incremental runs with `skip_existing` set.
pub fn plan_write(
    mode: UpdateMode,
    rows: Vec<TableRow>,
    policy: &MergePolicy,
    existing: &HashSet<(String, NaiveDate)>,
) -> WritePlan {
    let mut rows = dedupe_rows(sort_rows(rows));
    match mode {
        UpdateMode::Bootstrap => WritePlan::Overwrite {
            header: header_row(),
            rows,
        },
        UpdateMode::Incremental => {
            if policy.skip_existing {
                rows.retain(|row| {
                    let (code, date) = row.key();
                    !existing.contains(&(code.to_string(), date))
                });
            }
            if rows.is_empty() {
                WritePlan::Skip
            } else {
                WritePlan::Insert {
                    rows,
                    at: DATA_START_ROW,
                }
            }
        }
    }
}

/// What `apply_plan` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows_written: usize,
    pub overwritten: bool,
}

/// Execute a plan against the store: one call, or none for `Skip`.
pub fn apply_plan(store: &dyn TableStore, plan: WritePlan) -> Result<WriteSummary, StoreError> {
    match plan {
        WritePlan::Overwrite { header, rows } => {
            let header: Vec<&str> = header.iter().map(String::as_str).collect();
            let cells: Vec<Vec<String>> = rows.iter().map(TableRow::to_cells).collect();
            store.overwrite(&header, &cells)?;
            info!(rows = cells.len(), "table rebuilt");
            Ok(WriteSummary {
                rows_written: cells.len(),
                overwritten: true,
            })
        }
        WritePlan::Insert { rows, at } => {
            let cells: Vec<Vec<String>> = rows.iter().map(TableRow::to_cells).collect();
            store.insert_rows(&cells, at)?;
            info!(rows = cells.len(), at, "rows inserted");
            Ok(WriteSummary {
                rows_written: cells.len(),
                overwritten: false,
            })
        }
        WritePlan::Skip => {
            info!("nothing to write");
            Ok(WriteSummary {
                rows_written: 0,
                overwritten: false,
            })
        }
    }
}
