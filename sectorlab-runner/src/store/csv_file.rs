//! CSV file store.
//!
//! The whole table is rewritten on every write: serialized to a sibling
//! `.tmp` file, then renamed over the original, so a reader never observes a
//! half-written table. A missing file reads as an empty table.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{splice_rows, StoreError, TableStore};

#[derive(Debug, Clone)]
pub struct CsvTableStore {
    path: PathBuf,
}

impl CsvTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Every record in the file, header included.
    fn read_table(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut table = Vec::new();
        for record in reader.records() {
            let record = record?;
            table.push(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    fn write_table<'a, I>(&self, records: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
        let mut count = 0usize;
        for record in records {
            wtr.write_record(record)?;
            count += 1;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp_path = self.path.with_extension("csv.tmp");
        std::fs::write(&tmp_path, bytes).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), records = count, "table written");
        Ok(())
    }
}

impl TableStore for CsvTableStore {
    fn read_first_cell(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .read_table()?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }

    fn overwrite(&self, header: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError> {
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        self.write_table(std::iter::once(header.as_slice()).chain(rows.iter().map(Vec::as_slice)))
    }

    fn insert_rows(&self, rows: &[Vec<String>], at_position: usize) -> Result<(), StoreError> {
        let mut table = self.read_table()?;
        splice_rows(&mut table, rows, at_position)?;
        self.write_table(table.iter().map(Vec::as_slice))
    }

    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.read_table()?.into_iter().skip(1).collect())
    }
}
