//! Integration tests for the update pipeline.
//!
//! Runs complete bootstrap and incremental updates against in-memory and
//! CSV stores using the synthetic provider, plus providers and stores that
//! fail on purpose.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use sectorlab_core::data::{DataError, DataProvider, PriceHistory, SyntheticProvider};
use sectorlab_core::schema::{COLUMNS, DATA_START_ROW};
use sectorlab_runner::{
    load_table, run_update, CsvTableStore, MemoryTableStore, RunError, SectorLabConfig,
    StoreError, TableStore, UpdateMode,
};

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(18, 0, 0)
        .unwrap()
}

fn config() -> SectorLabConfig {
    let mut config = SectorLabConfig::default();
    config.fetch.workers = 4;
    config
}

/// Counts calls and fails for the listed symbols.
struct ScriptedProvider {
    inner: SyntheticProvider,
    failing: Vec<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn failing(symbols: &[&'static str]) -> Self {
        Self {
            inner: SyntheticProvider::new(),
            failing: symbols.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceHistory, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| *s == symbol || *s == "*") {
            return Err(DataError::Unreachable(format!("{symbol}: timed out")));
        }
        self.inner.fetch(symbol, start, end)
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// A store whose every call fails.
struct BrokenStore;

impl BrokenStore {
    fn error() -> StoreError {
        StoreError::Io {
            path: "unreachable.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
    }
}

impl TableStore for BrokenStore {
    fn read_first_cell(&self) -> Result<Option<String>, StoreError> {
        Err(Self::error())
    }
    fn overwrite(&self, _: &[&str], _: &[Vec<String>]) -> Result<(), StoreError> {
        Err(Self::error())
    }
    fn insert_rows(&self, _: &[Vec<String>], _: usize) -> Result<(), StoreError> {
        Err(Self::error())
    }
    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Err(Self::error())
    }
}

#[test]
fn bootstrap_writes_header_and_full_history() {
    let store = MemoryTableStore::new();
    let summary = run_update(&config(), &SyntheticProvider::new(), &store, at(3)).unwrap();

    assert_eq!(summary.mode, UpdateMode::Bootstrap);
    assert_eq!(summary.succeeded.len(), 17);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.rows_written, 17 * 250);
    assert_eq!(store.write_count(), 1);

    let table = store.snapshot();
    assert_eq!(table[0], COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    assert_eq!(table.len(), 1 + 17 * 250);

    let rows = load_table(&store).unwrap();
    assert!(rows.iter().all(|r| r.computed_at == at(3)));
}

#[test]
fn bootstrap_rows_are_sorted_newest_first() {
    let store = MemoryTableStore::new();
    run_update(&config(), &SyntheticProvider::new(), &store, at(3)).unwrap();
    let rows = load_table(&store).unwrap();

    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.date > b.date || (a.date == b.date && a.instrument_id > b.instrument_id),
            "{} {} before {} {}",
            a.instrument_id,
            a.date,
            b.instrument_id,
            b.date
        );
    }
    assert_eq!(rows[0].instrument_id, "1633");
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
}

#[test]
fn incremental_inserts_latest_rows_below_header() {
    let store = MemoryTableStore::new();
    let provider = SyntheticProvider::new();
    run_update(&config(), &provider, &store, at(3)).unwrap();

    let summary = run_update(&config(), &provider, &store, at(4)).unwrap();
    assert_eq!(summary.mode, UpdateMode::Incremental);
    assert_eq!(summary.rows_written, 17);
    assert_eq!(store.write_count(), 2);

    let rows = load_table(&store).unwrap();
    assert_eq!(rows.len(), 17 * 250 + 17);
    let new_day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
    assert!(rows[..17].iter().all(|r| r.date == new_day && r.computed_at == at(4)));
    assert_eq!(rows[0].instrument_id, "1633");
    assert_eq!(rows[16].instrument_id, "1617");
    // Previously stored rows are untouched and follow the new block.
    assert!(rows[17..].iter().all(|r| r.computed_at == at(3)));
}

#[test]
fn same_day_rerun_duplicates_by_default() {
    let store = MemoryTableStore::new();
    let provider = SyntheticProvider::new();
    run_update(&config(), &provider, &store, at(3)).unwrap();

    let summary = run_update(&config(), &provider, &store, at(3)).unwrap();
    assert_eq!(summary.mode, UpdateMode::Incremental);
    assert_eq!(summary.rows_written, 17);
    assert_eq!(load_table(&store).unwrap().len(), 17 * 250 + 17);
}

#[test]
fn same_day_rerun_with_skip_existing_writes_nothing() {
    let store = MemoryTableStore::new();
    let provider = SyntheticProvider::new();
    let mut config = config();
    config.store.skip_existing = true;
    run_update(&config, &provider, &store, at(3)).unwrap();

    let summary = run_update(&config, &provider, &store, at(3)).unwrap();
    assert_eq!(summary.rows_written, 0);
    assert_eq!(store.write_count(), 1);
}

#[test]
fn failing_instrument_is_isolated() {
    let store = MemoryTableStore::new();
    let provider = ScriptedProvider::failing(&["1625.T"]);
    let summary = run_update(&config(), &provider, &store, at(3)).unwrap();

    assert_eq!(provider.calls(), 17);
    assert_eq!(summary.succeeded.len(), 16);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "1625");
    assert_eq!(summary.rows_written, 16 * 250);

    let rows = load_table(&store).unwrap();
    assert!(rows.iter().all(|r| r.instrument_id != "1625"));
}

#[test]
fn store_failure_stops_before_any_fetch() {
    let provider = ScriptedProvider::failing(&[]);
    let err = run_update(&config(), &provider, &BrokenStore, at(3)).unwrap_err();
    assert!(matches!(err, RunError::Store(StoreError::Io { .. })));
    assert_eq!(provider.calls(), 0);
}

#[test]
fn empty_bootstrap_writes_header_only() {
    let store = MemoryTableStore::new();
    let provider = ScriptedProvider::failing(&["*"]);
    let summary = run_update(&config(), &provider, &store, at(3)).unwrap();

    assert_eq!(summary.failed.len(), 17);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.snapshot().len(), 1);
    assert_eq!(store.read_first_cell().unwrap().as_deref(), Some("instrument_id"));
}

#[test]
fn empty_incremental_writes_nothing() {
    let store = MemoryTableStore::with_rows(&COLUMNS, Vec::new());
    let provider = ScriptedProvider::failing(&["*"]);
    let summary = run_update(&config(), &provider, &store, at(4)).unwrap();

    assert_eq!(summary.mode, UpdateMode::Incremental);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn csv_store_round_trip() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = CsvTableStore::new(tmp.path().join("data/sector_analysis.csv"));
    let provider = SyntheticProvider::new();

    let first = run_update(&config(), &provider, &store, at(3)).unwrap();
    assert_eq!(first.mode, UpdateMode::Bootstrap);
    let second = run_update(&config(), &provider, &store, at(4)).unwrap();
    assert_eq!(second.mode, UpdateMode::Incremental);

    let rows = load_table(&store).unwrap();
    assert_eq!(rows.len(), 17 * 250 + 17);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());

    let raw = store.read_all_rows().unwrap();
    assert_eq!(raw[DATA_START_ROW - 2], rows[0].to_cells());
}
