//! Market data provider seam.
//!
//! The update run only sees `DataProvider`; Yahoo Finance and the synthetic
//! random walk sit behind it, and tests substitute their own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Observation;

/// Why a provider could not return a series.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("market data feed unreachable: {0}")]
    Unreachable(String),

    #[error("throttled by market data feed, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("unexpected chart payload: {0}")]
    Payload(String),

    #[error("feed rejected the request as unauthorized: {0}")]
    Unauthorized(String),

    #[error("unknown symbol {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("feed access suspended after a ban or repeated failures")]
    Suspended,

    #[error("HTTP {status} fetching {symbol}")]
    Status { status: u16, symbol: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Daily history for one symbol as returned by a provider.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub symbol: String,
    /// Ascending by date. May be empty.
    pub observations: Vec<Observation>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Synthetic,
}

/// A source of daily closes and volumes.
///
/// One instance serves every worker of a run, hence `Send + Sync`.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Daily observations for `symbol` between `start` and `end`, both inclusive.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceHistory, DataError>;

    /// False while the provider is refusing requests (for example after a ban).
    fn is_available(&self) -> bool;
}
