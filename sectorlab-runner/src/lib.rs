//! SectorLab Runner: update orchestration, table stores, report publishing.
//!
//! This crate builds on `sectorlab-core` to provide:
//! - Run configuration (TOML plus environment overrides)
//! - The per-instrument fetch-and-derive task and the bounded worker pool
//! - Update-mode resolution and the merge/sort stage
//! - CSV and in-memory table stores
//! - The update pipeline (one store read, one store write per run)
//! - HTML report rendering with file and WordPress publishers

pub mod config;
pub mod merge;
pub mod orchestrator;
pub mod pipeline;
pub mod publish;
pub mod store;
pub mod task;

pub use config::{ConfigError, ReportConfig, SectorLabConfig, WordPressConfig};
pub use merge::{
    apply_plan, dedupe_rows, plan_write, resolve_mode, sort_rows, MergePolicy, UpdateMode,
    WritePlan, WriteSummary,
};
pub use orchestrator::{run_batch, BatchOutcome, OrchestratorError};
pub use pipeline::{run_update, RunError, RunSummary};
pub use publish::{
    render_from_store, render_report, FilePublisher, PublishError, ReportPublisher,
    WordPressPublisher,
};
pub use store::{load_table, CsvTableStore, MemoryTableStore, StoreError, TableStore};
pub use task::{fetch_and_derive, run_task, TaskContext, TaskError, TaskOutcome};
