//! SectorLab Core: observation types, indicator engine, row schema, data providers.
//!
//! This crate contains everything that does not depend on how a run is
//! scheduled or where its output is stored:
//! - Domain types (observations, instruments)
//! - Indicators (SMA, MA deviation, RSI, Bollinger %B, volume ratio, change %)
//! - The indicator engine with warm-up trimming and output windows
//! - The persisted row schema shared by writers and the report
//! - Market data providers (Yahoo Finance, synthetic) and the instrument universe

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod schema;

pub use domain::{Instrument, Observation};
pub use engine::{IndicatorConfig, IndicatorEngine, IndicatorRow, OutputWindow};
pub use schema::{TableRow, COLUMNS};
