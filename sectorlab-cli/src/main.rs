//! SectorLab CLI: update the sector table and publish the report.
//!
//! Commands:
//! - `update`: fetch every instrument, derive indicators, write the table
//! - `publish`: render the stored table as HTML to a file and/or WordPress
//! - `universe`: list the configured instruments and their tickers

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Timelike};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sectorlab_core::data::{CircuitBreaker, DataProvider, SyntheticProvider, YahooProvider};
use sectorlab_runner::{
    render_from_store, run_update, CsvTableStore, FilePublisher, ReportPublisher,
    SectorLabConfig, WordPressConfig, WordPressPublisher,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "sectorlab.toml";

#[derive(Parser)]
#[command(
    name = "sectorlab",
    about = "SectorLab: sector ETF technical indicators, updated daily"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch market data, compute indicators and write the table.
    Update {
        /// Path to a TOML config file. Defaults to ./sectorlab.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Table file, overriding the config and SECTORLAB_STORE_PATH.
        #[arg(long)]
        store: Option<PathBuf>,

        /// Use the deterministic synthetic provider instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Render the stored table as an HTML report.
    Publish {
        /// Path to a TOML config file. Defaults to ./sectorlab.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Table file, overriding the config and SECTORLAB_STORE_PATH.
        #[arg(long)]
        store: Option<PathBuf>,

        /// HTML output file, overriding `report.output`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also update the WordPress page configured through WP_* variables.
        #[arg(long, default_value_t = false)]
        wordpress: bool,
    },
    /// List the configured instruments.
    Universe {
        /// Path to a TOML config file. Defaults to ./sectorlab.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Update {
            config,
            store,
            synthetic,
        } => run_update_cmd(config.as_deref(), store, synthetic),
        Commands::Publish {
            config,
            store,
            output,
            wordpress,
        } => run_publish_cmd(config.as_deref(), store, output, wordpress),
        Commands::Universe { config } => run_universe_cmd(config.as_deref()),
    }
}

/// Load the config file (explicit, default, or built-in), then apply env and CLI overrides.
fn load_config(path: Option<&Path>, store: Option<PathBuf>) -> Result<SectorLabConfig> {
    let mut config = match path {
        Some(path) => SectorLabConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            SectorLabConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("loading config {DEFAULT_CONFIG}"))?
        }
        None => SectorLabConfig::default(),
    };
    config.apply_env();
    if let Some(store) = store {
        config.store.path = store;
    }
    Ok(config)
}

/// Local wall clock truncated to the minute, shared by every row of the run.
fn run_timestamp() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

fn run_update_cmd(config_path: Option<&Path>, store: Option<PathBuf>, synthetic: bool) -> Result<()> {
    let config = load_config(config_path, store)?;
    let store = CsvTableStore::new(&config.store.path);

    let provider: Box<dyn DataProvider> = if synthetic {
        Box::new(SyntheticProvider::new())
    } else {
        let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
        Box::new(YahooProvider::new(circuit_breaker)?)
    };

    let computed_at = run_timestamp();
    info!(
        store = %config.store.path.display(),
        provider = provider.name(),
        instruments = config.universe.len(),
        "starting update"
    );
    let summary = run_update(&config, provider.as_ref(), &store, computed_at)?;

    println!("Mode:          {}", summary.mode);
    println!("Computed at:   {}", summary.computed_at.format("%Y-%m-%d %H:%M"));
    println!("Rows written:  {}", summary.rows_written);
    println!(
        "Instruments:   {} succeeded, {} failed",
        summary.succeeded.len(),
        summary.failed.len()
    );
    for (code, error) in &summary.failed {
        println!("  {code}: {error}");
    }
    Ok(())
}

fn run_publish_cmd(
    config_path: Option<&Path>,
    store: Option<PathBuf>,
    output: Option<PathBuf>,
    wordpress: bool,
) -> Result<()> {
    let mut config = load_config(config_path, store)?;
    if let Some(output) = output {
        config.report.output = output;
    }

    // Credentials are checked before anything is rendered or written.
    let wordpress = if wordpress {
        Some(WordPressPublisher::new(WordPressConfig::from_env()?)?)
    } else {
        None
    };

    let store = CsvTableStore::new(&config.store.path);
    let html = render_from_store(&store, &config.report)
        .with_context(|| format!("reading table {}", config.store.path.display()))?;

    let file = FilePublisher::new(&config.report.output);
    let mut publishers: Vec<&dyn ReportPublisher> = Vec::new();
    publishers.push(&file);
    if let Some(wp) = &wordpress {
        publishers.push(wp);
    }
    for publisher in publishers {
        publisher
            .publish(&html)
            .with_context(|| format!("publishing via {}", publisher.name()))?;
        println!("Published via {}", publisher.name());
    }
    Ok(())
}

fn run_universe_cmd(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, None)?;
    let universe = &config.universe;
    println!("{:<8} {:<12} Label", "Code", "Ticker");
    for instrument in &universe.instruments {
        println!(
            "{:<8} {:<12} {}",
            instrument.code,
            universe.ticker(instrument),
            instrument.label
        );
    }
    println!("{} instruments", universe.len());
    Ok(())
}
