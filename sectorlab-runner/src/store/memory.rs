//! In-memory store for tests and dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{splice_rows, StoreError, TableStore};

/// Keeps the whole table, header included, under a mutex.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    table: Mutex<Vec<Vec<String>>>,
    writes: AtomicUsize,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a header and data rows.
    pub fn with_rows(header: &[&str], rows: Vec<Vec<String>>) -> Self {
        let mut table = vec![header.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        table.extend(rows);
        Self {
            table: Mutex::new(table),
            writes: AtomicUsize::new(0),
        }
    }

    /// Copy of the full table, header included.
    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    /// Number of successful `overwrite` and `insert_rows` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<String>>> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TableStore for MemoryTableStore {
    fn read_first_cell(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock().first().and_then(|row| row.first()).cloned())
    }

    fn overwrite(&self, header: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError> {
        let mut table = self.lock();
        table.clear();
        table.push(header.iter().map(|h| h.to_string()).collect());
        table.extend(rows.iter().cloned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn insert_rows(&self, rows: &[Vec<String>], at_position: usize) -> Result<(), StoreError> {
        splice_rows(&mut self.lock(), rows, at_position)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.lock().iter().skip(1).cloned().collect())
    }
}
