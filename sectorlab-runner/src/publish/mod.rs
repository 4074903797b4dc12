//! Report publishing: render the stored table as HTML and ship it.

mod chart;
mod report;
mod wordpress;

pub use report::{escape_html, render_report, snapshot_id};
pub use wordpress::WordPressPublisher;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ReportConfig};
use crate::store::{load_table, StoreError, TableStore};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("publish rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("write report to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A destination for a rendered report.
pub trait ReportPublisher {
    fn name(&self) -> &str;
    fn publish(&self, html: &str) -> Result<(), PublishError>;
}

/// Writes the report to a local file, creating parent directories.
#[derive(Debug, Clone)]
pub struct FilePublisher {
    path: PathBuf,
}

impl FilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportPublisher for FilePublisher {
    fn name(&self) -> &str {
        "file"
    }

    fn publish(&self, html: &str) -> Result<(), PublishError> {
        let io = |source| PublishError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(&self.path, html).map_err(io)?;
        info!(path = %self.path.display(), bytes = html.len(), "report written");
        Ok(())
    }
}

/// Load every stored row and render the report.
pub fn render_from_store(
    store: &dyn TableStore,
    config: &ReportConfig,
) -> Result<String, StoreError> {
    let rows = load_table(store)?;
    info!(rows = rows.len(), "rendering report");
    Ok(render_report(&rows, config))
}
