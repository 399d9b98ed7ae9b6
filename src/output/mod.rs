//! Output module for exporting crawl results and reporting statistics
//!
//! This module handles:
//! - Exporting collected results as CSV or JSON
//! - Exporting author profiles
//! - Printing end-of-run crawl statistics

mod export;
pub mod stats;

pub use export::{export_csv, export_json, export_profile, export_results};
pub use stats::{print_statistics, RunSummary};

use thiserror::Error;

/// Errors raised while writing output files
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
