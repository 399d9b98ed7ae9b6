//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and the
//! associated error types.

use crate::parser::ScrapeResult;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable, deduplicating store of search results
///
/// Results are keyed by their canonical URL. Inserting a result whose URL is
/// already stored is not an error; it is ignored and reported as `false`.
pub trait ResultStore {
    // ===== Deduplication =====

    /// Whether a result with this canonical URL is already stored
    fn exists(&self, url: &str) -> StorageResult<bool>;

    /// Stores a result
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A new row was written
    /// * `Ok(false)` - A result with the same canonical URL already existed
    fn insert(&mut self, result: &ScrapeResult) -> StorageResult<bool>;

    /// Number of stored results
    fn count(&self) -> StorageResult<u64>;

    /// Every stored result, oldest first
    fn load_results(&self) -> StorageResult<Vec<ScrapeResult>>;

    // ===== Run Management =====

    /// Records the start of a crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration the run was started with
    /// * `query` - Human-readable description of what the run searches for
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn start_run(&mut self, config_hash: &str, query: &str) -> StorageResult<i64>;

    /// Marks a run as finished with the number of results it returned
    fn finish_run(&mut self, run_id: i64, status: RunStatus, collected: usize)
        -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;
}
