//! Table schema contract: the boundary between the update run and the report.
//!
//! Defines the exact column order and cell formatting of the persisted table.
//! The same `COLUMNS` constant is written as the header row on bootstrap and
//! used by the publisher to parse rows back.
//!
//! - Sort order: newest date first, then instrument code descending
//! - Prices: 1 decimal; RSI: 1 decimal; percentages and ratios: 2 decimals
//! - Timestamps: market-local wall clock, minute precision

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Instrument;
use crate::engine::IndicatorRow;

/// Column names in table order.
pub const COLUMNS: [&str; 12] = [
    "instrument_id",
    "sector_label",
    "date",
    "close",
    "change_pct",
    "deviation_short",
    "deviation_mid",
    "deviation_long",
    "rsi",
    "bollinger_pct_b",
    "volume_ratio",
    "computed_at",
];

/// 1-based table row where data starts (row 1 is the header).
pub const DATA_START_ROW: usize = 2;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors raised when a stored row does not match the schema.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("column '{column}': cannot parse '{value}'")]
    InvalidCell { column: &'static str, value: String },
}

/// One persisted row: a complete indicator row for one instrument and day.
///
/// Numeric fields are stored already rounded to their display precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub instrument_id: String,
    pub sector_label: String,
    pub date: NaiveDate,
    pub close: f64,
    pub change_pct: f64,
    pub deviation_short: f64,
    pub deviation_mid: f64,
    pub deviation_long: f64,
    pub rsi: f64,
    pub bollinger_pct_b: f64,
    pub volume_ratio: f64,
    pub computed_at: NaiveDateTime,
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Normalize -0.0 so a flat day renders as "0.00", not "-0.00".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

impl TableRow {
    /// Build a table row from a complete indicator row.
    ///
    /// Returns `None` if any derived field is still undefined.
    pub fn from_indicator_row(
        instrument: &Instrument,
        row: &IndicatorRow,
        computed_at: NaiveDateTime,
    ) -> Option<Self> {
        Some(Self {
            instrument_id: instrument.code.clone(),
            sector_label: instrument.label.clone(),
            date: row.date,
            close: round_to(row.close, 1),
            change_pct: round_to(row.change_pct?, 2),
            deviation_short: round_to(row.deviation_short?, 2),
            deviation_mid: round_to(row.deviation_mid?, 2),
            deviation_long: round_to(row.deviation_long?, 2),
            rsi: round_to(row.rsi?, 1),
            bollinger_pct_b: round_to(row.bb_percent_b?, 2),
            volume_ratio: round_to(row.volume_ratio?, 2),
            computed_at,
        })
    }

    /// Render the row as cells in `COLUMNS` order.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.instrument_id.clone(),
            self.sector_label.clone(),
            self.date.format(DATE_FORMAT).to_string(),
            format!("{:.1}", self.close),
            format!("{:.2}", self.change_pct),
            format!("{:.2}", self.deviation_short),
            format!("{:.2}", self.deviation_mid),
            format!("{:.2}", self.deviation_long),
            format!("{:.1}", self.rsi),
            format!("{:.2}", self.bollinger_pct_b),
            format!("{:.2}", self.volume_ratio),
            self.computed_at.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }

    /// Parse a row previously written by `to_cells`.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Result<Self, SchemaError> {
        if cells.len() != COLUMNS.len() {
            return Err(SchemaError::ColumnCount {
                expected: COLUMNS.len(),
                found: cells.len(),
            });
        }
        let cell = |i: usize| cells[i].as_ref().trim();

        let date = NaiveDate::parse_from_str(cell(2), DATE_FORMAT)
            .map_err(|_| invalid(2, cell(2)))?;
        let computed_at = NaiveDateTime::parse_from_str(cell(11), TIMESTAMP_FORMAT)
            .map_err(|_| invalid(11, cell(11)))?;

        Ok(Self {
            instrument_id: cell(0).to_string(),
            sector_label: cell(1).to_string(),
            date,
            close: parse_number(cells, 3)?,
            change_pct: parse_number(cells, 4)?,
            deviation_short: parse_number(cells, 5)?,
            deviation_mid: parse_number(cells, 6)?,
            deviation_long: parse_number(cells, 7)?,
            rsi: parse_number(cells, 8)?,
            bollinger_pct_b: parse_number(cells, 9)?,
            volume_ratio: parse_number(cells, 10)?,
            computed_at,
        })
    }

    /// Conceptual key of a persisted row.
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.instrument_id.as_str(), self.date)
    }
}

fn invalid(index: usize, value: &str) -> SchemaError {
    SchemaError::InvalidCell {
        column: COLUMNS[index],
        value: value.to_string(),
    }
}

fn parse_number<S: AsRef<str>>(cells: &[S], index: usize) -> Result<f64, SchemaError> {
    let raw = cells[index].as_ref().trim();
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(index, raw))
}

/// Header row as owned strings.
pub fn header_row() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}
