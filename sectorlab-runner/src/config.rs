//! Serializable run configuration.
//!
//! Loaded from TOML; every section carries `#[serde(default)]` so a partial
//! file (or none at all) still yields a complete configuration. A few values
//! can be overridden from the environment, see `apply_env`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use sectorlab_core::data::{Universe, UniverseError};
use sectorlab_core::engine::DEFAULT_RETAIN_ROWS;
use sectorlab_core::IndicatorConfig;

/// Environment variable overriding `store.path`.
pub const ENV_STORE_PATH: &str = "SECTORLAB_STORE_PATH";

/// Bundled secret of `KEY=VALUE` lines overriding the individual `WP_*` variables.
pub const ENV_WORDPRESS_BUNDLE: &str = "SECTORLAB_WORDPRESS";

/// Upper bound on `fetch.lookback_days` (roughly a century).
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

const WP_KEYS: [&str; 4] = ["WP_URL", "WP_USER", "WP_PASSWORD", "WP_PAGE_ID"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid universe: {0}")]
    Universe(#[from] UniverseError),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("missing required setting: {0}")]
    MissingEnv(String),
}

/// Top-level configuration for update and publish runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SectorLabConfig {
    pub universe: Universe,
    pub fetch: FetchConfig,
    pub indicators: IndicatorConfig,
    pub store: StoreConfig,
    pub report: ReportConfig,
}

/// Market data acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Calendar days of history requested per instrument.
    pub lookback_days: u32,
    /// Size of the worker pool running per-instrument tasks.
    pub workers: usize,
    /// Complete rows kept per instrument on a bootstrap run.
    pub retain_rows: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookback_days: 730,
            workers: 5,
            retain_rows: DEFAULT_RETAIN_ROWS,
        }
    }
}

/// Persisted table settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// On incremental runs, drop rows whose (instrument, date) is already stored.
    pub skip_existing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/sector_analysis.csv"),
            skip_existing: false,
        }
    }
}

/// HTML report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output: PathBuf,
    pub title: String,
    /// Most recent trading dates shown in the normalized chart.
    pub chart_days: usize,
    pub footer: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("public/sector_report.html"),
            title: "Sector Technical Dashboard".into(),
            chart_days: 60,
            footer: "Computed from TOPIX-17 sector ETF data.".into(),
        }
    }
}

impl SectorLabConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (testable without touching the process env).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STORE_PATH).filter(|p| !p.trim().is_empty()) {
            self.store.path = PathBuf::from(path.trim());
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.universe.validate()?;

        if self.fetch.workers == 0 {
            return Err(ConfigError::Invalid("fetch.workers must be >= 1".into()));
        }
        if self.fetch.retain_rows == 0 {
            return Err(ConfigError::Invalid("fetch.retain_rows must be >= 1".into()));
        }
        for (name, period) in self.indicators.periods() {
            if period == 0 {
                return Err(ConfigError::Invalid(format!("indicators.{name} must be >= 1")));
            }
        }
        if !(self.indicators.bollinger_multiplier.is_finite()
            && self.indicators.bollinger_multiplier > 0.0)
        {
            return Err(ConfigError::Invalid(
                "indicators.bollinger_multiplier must be a positive number".into(),
            ));
        }
        if self.fetch.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid(format!(
                "fetch.lookback_days ({}) exceeds {MAX_LOOKBACK_DAYS}",
                self.fetch.lookback_days
            )));
        }
        // Five trading sessions per seven calendar days, rounded up.
        let need = self.indicators.required_history();
        let calendar_need = (need * 7).div_ceil(5);
        if (self.fetch.lookback_days as usize) < calendar_need {
            return Err(ConfigError::Invalid(format!(
                "fetch.lookback_days ({}) cannot cover {need} trading days (needs at least {calendar_need})",
                self.fetch.lookback_days
            )));
        }
        if self.report.chart_days < 2 {
            return Err(ConfigError::Invalid("report.chart_days must be >= 2".into()));
        }
        Ok(())
    }
}

/// Credentials and target page for WordPress publishing.
#[derive(Clone, PartialEq)]
pub struct WordPressConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub page_id: u64,
}

impl std::fmt::Debug for WordPressConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPressConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***")
            .field("page_id", &self.page_id)
            .finish()
    }
}

impl WordPressConfig {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`.
    ///
    /// Individual `WP_*` values are read first; any `KEY=VALUE` line in the
    /// bundled secret replaces the matching value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values: Vec<Option<String>> = WP_KEYS
            .iter()
            .map(|key| lookup(key).map(|v| v.trim().to_string()))
            .collect();

        if let Some(bundle) = lookup(ENV_WORDPRESS_BUNDLE) {
            for line in bundle.lines() {
                let Some((key, value)) = line.split_once('=') else {
                    continue;
                };
                if let Some(slot) = WP_KEYS.iter().position(|k| *k == key.trim()) {
                    values[slot] = Some(value.trim().to_string());
                }
            }
        }

        let mut take = |slot: usize| {
            values[slot]
                .take()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(WP_KEYS[slot].to_string()))
        };
        let url = take(0)?;
        let user = take(1)?;
        let password = take(2)?;
        let page_id = take(3)?;
        let page_id = page_id
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(format!("WP_PAGE_ID is not a page number: {page_id}")))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            user,
            password,
            page_id,
        })
    }
}
