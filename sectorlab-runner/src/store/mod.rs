//! Tabular store: where the derived table is persisted.
//!
//! Positions are 1-based spreadsheet rows. Row 1 holds the header, data
//! starts at `DATA_START_ROW`.

mod csv_file;
mod memory;

pub use csv_file::CsvTableStore;
pub use memory::MemoryTableStore;

use std::path::PathBuf;
use thiserror::Error;

use sectorlab_core::schema::{SchemaError, TableRow, DATA_START_ROW};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed table row {row}: {source}")]
    Malformed { row: usize, source: SchemaError },

    #[error("cannot insert at row {at}: table has {rows} rows")]
    InvalidPosition { at: usize, rows: usize },

    #[error("table has no header row")]
    MissingHeader,
}

/// A persisted two-dimensional table of text cells.
pub trait TableStore: Send + Sync {
    /// Top-left cell, `None` when the table is empty.
    fn read_first_cell(&self) -> Result<Option<String>, StoreError>;

    /// Replace the whole table with `header` followed by `rows`.
    fn overwrite(&self, header: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError>;

    /// Insert `rows` so the first of them lands at row `at_position`.
    /// Existing rows from that position on shift down.
    fn insert_rows(&self, rows: &[Vec<String>], at_position: usize) -> Result<(), StoreError>;

    /// Every data row, header excluded, in stored order.
    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;
}

/// Read and parse every data row.
pub fn load_table(store: &dyn TableStore) -> Result<Vec<TableRow>, StoreError> {
    store
        .read_all_rows()?
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            TableRow::from_cells(cells).map_err(|source| StoreError::Malformed {
                row: i + DATA_START_ROW,
                source,
            })
        })
        .collect()
}

/// Splice `rows` into a full table (header included) at a 1-based position.
pub(crate) fn splice_rows(
    table: &mut Vec<Vec<String>>,
    rows: &[Vec<String>],
    at_position: usize,
) -> Result<(), StoreError> {
    if table.is_empty() {
        return Err(StoreError::MissingHeader);
    }
    if at_position < DATA_START_ROW || at_position > table.len() + 1 {
        return Err(StoreError::InvalidPosition {
            at: at_position,
            rows: table.len(),
        });
    }
    let index = at_position - 1;
    table.splice(index..index, rows.iter().cloned());
    Ok(())
}
