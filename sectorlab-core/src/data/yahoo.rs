//! Yahoo Finance chart API provider.
//!
//! One daily chart request per symbol. The close kept is the dividend and
//! split adjusted close when Yahoo supplies one, otherwise the raw close.
//! Sessions without any close are skipped. Dates are taken in the
//! exchange's local time using the `gmtoffset` Yahoo reports.
//!
//! Transient failures (timeouts, 429, 5xx) are retried with exponential
//! backoff and counted by the shared circuit breaker; a 403 opens it at once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, DataSource, PriceHistory};
use crate::domain::Observation;

const CHART_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";
/// Used when a 429 carries no usable Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartSeries>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Panels,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Panels {
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

impl ChartEnvelope {
    fn into_observations(self, symbol: &str) -> Result<Vec<Observation>, DataError> {
        let series = match (self.chart.result, self.chart.error) {
            (Some(results), _) => results
                .into_iter()
                .next()
                .ok_or_else(|| DataError::Payload("empty result array".into()))?,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(DataError::UnknownSymbol {
                    symbol: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(DataError::Payload(format!("{}: {}", err.code, err.description)))
            }
            (None, None) => return Err(DataError::Payload("neither result nor error".into())),
        };

        // A listed symbol with no sessions in range has no timestamp array.
        let Some(timestamps) = series.timestamp else {
            return Ok(Vec::new());
        };
        let offset = series.meta.map_or(0, |m| m.gmtoffset);
        let quote = series
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Payload("no quote panel".into()))?;
        let adjusted: Vec<Option<f64>> = series
            .indicators
            .adjclose
            .and_then(|panels| panels.into_iter().next())
            .map(|panel| panel.adjclose)
            .unwrap_or_default();

        timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let close = adjusted
                    .get(i)
                    .copied()
                    .flatten()
                    .or_else(|| quote.close.get(i).copied().flatten())?;
                let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
                Some((ts, close, volume))
            })
            .map(|(ts, close, volume)| {
                let date = session_date(ts, offset)
                    .ok_or_else(|| DataError::Payload(format!("timestamp out of range: {ts}")))?;
                Ok(Observation::new(date, close, volume))
            })
            .collect()
    }
}

/// Exchange-local calendar date of a session timestamp.
fn session_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp.checked_add(gmtoffset)?, 0).map(|dt| dt.date_naive())
}

fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    let period1 = start.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp());
    let period2 = end
        .and_hms_opt(23, 59, 59)
        .map_or(0, |t| t.and_utc().timestamp());
    format!(
        "{CHART_ENDPOINT}/{symbol}?period1={period1}&period2={period2}\
         &interval=1d&events=div%2Csplit&includeAdjustedClose=true"
    )
}

/// How many times to ask, and how long to wait in between.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before attempt `n` (1-based for retries): base, 2x base, 4x base, ...
    fn delay(&self, n: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(n.saturating_sub(1))
    }
}

/// Outcome of one HTTP round trip that did not end the fetch.
enum Attempt {
    Done(Vec<Observation>),
    Retry(DataError),
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl YahooProvider {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;

        Ok(Self {
            client,
            breaker,
            retry: RetryPolicy {
                attempts: 4,
                base_delay: Duration::from_millis(500),
            },
        })
    }

    fn attempt(&self, url: &str, symbol: &str) -> Result<Attempt, DataError> {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Ok(Attempt::Retry(DataError::Unreachable(e.to_string())))
            }
            Err(e) => return Err(DataError::Unreachable(e.to_string())),
        };

        match resp.status() {
            StatusCode::FORBIDDEN => {
                self.breaker.trip();
                Err(DataError::Suspended)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                self.breaker.record_failure();
                Ok(Attempt::Retry(DataError::Throttled {
                    retry_after_secs: retry_after_secs(resp.headers()),
                }))
            }
            StatusCode::UNAUTHORIZED => Err(DataError::Unauthorized(format!(
                "chart request for {symbol}"
            ))),
            StatusCode::NOT_FOUND => Err(DataError::UnknownSymbol {
                symbol: symbol.to_string(),
            }),
            status if !status.is_success() => {
                self.breaker.record_failure();
                Ok(Attempt::Retry(DataError::Status {
                    status: status.as_u16(),
                    symbol: symbol.to_string(),
                }))
            }
            _ => {
                let body = resp
                    .text()
                    .map_err(|e| DataError::Unreachable(e.to_string()))?;
                let envelope: ChartEnvelope = serde_json::from_str(&body)
                    .map_err(|e| DataError::Payload(format!("{symbol}: {e}")))?;
                let observations = envelope.into_observations(symbol)?;
                self.breaker.record_success();
                Ok(Attempt::Done(observations))
            }
        }
    }

    fn fetch_observations(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, DataError> {
        let url = chart_url(symbol, start, end);
        let mut last_error = None;

        for n in 0..self.retry.attempts {
            if n > 0 {
                let delay = self.retry.delay(n);
                debug!(symbol, attempt = n, ?delay, "backing off");
                std::thread::sleep(delay);
            }
            if !self.breaker.is_allowed() {
                return Err(DataError::Suspended);
            }
            match self.attempt(&url, symbol)? {
                Attempt::Done(observations) => return Ok(observations),
                Attempt::Retry(error) => {
                    debug!(symbol, attempt = n, %error, "chart request failed");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or(DataError::Suspended))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        Ok(PriceHistory {
            symbol: symbol.to_string(),
            observations: self.fetch_observations(symbol, start, end)?,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.breaker.is_allowed()
    }
}
