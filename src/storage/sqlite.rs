//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.

use crate::parser::ScrapeResult;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<(ScrapeResult, String)> {
    let authors: String = row.get(1)?;
    Ok((
        ScrapeResult {
            title: row.get(0)?,
            authors: Vec::new(),
            publication: row.get(2)?,
            year: row.get(3)?,
            snippet: row.get(4)?,
            cited_by_count: row.get(5)?,
            cited_by_url: row.get(6)?,
            related_articles_url: row.get(7)?,
            article_url: row.get(8)?,
            doi: row.get(9)?,
            pdf_url: row.get(10)?,
            pdf_path: row.get(11)?,
        },
        authors,
    ))
}

impl ResultStore for SqliteStorage {
    // ===== Deduplication =====

    fn exists(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM results WHERE url = ?1 LIMIT 1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&mut self, result: &ScrapeResult) -> StorageResult<bool> {
        let authors = serde_json::to_string(&result.authors)?;
        let now = Utc::now().to_rfc3339();

        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO results (
                url, title, authors, publication, year, snippet, cited_by_count,
                cited_by_url, related_articles_url, article_url, doi, pdf_url, pdf_path,
                inserted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                result.canonical_url(),
                result.title,
                authors,
                result.publication,
                result.year,
                result.snippet,
                result.cited_by_count,
                result.cited_by_url,
                result.related_articles_url,
                result.article_url,
                result.doi,
                result.pdf_url,
                result.pdf_path,
                now,
            ],
        )?;

        Ok(changed > 0)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn load_results(&self) -> StorageResult<Vec<ScrapeResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, authors, publication, year, snippet, cited_by_count, cited_by_url,
                    related_articles_url, article_url, doi, pdf_url, pdf_path
             FROM results ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], result_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut result, authors)| -> StorageResult<ScrapeResult> {
                result.authors = serde_json::from_str(&authors)?;
                Ok(result)
            })
            .collect()
    }

    // ===== Run Management =====

    fn start_run(&mut self, config_hash: &str, query: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, query, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, query, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        collected: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, results_collected = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, collected as i64, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, query, status, results_collected
                 FROM runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        query: row.get(4)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                            .unwrap_or(RunStatus::Running),
                        results_collected: row.get::<_, i64>(6)? as u64,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn result(url: &str) -> ScrapeResult {
        ScrapeResult {
            title: Some("A paper".to_string()),
            authors: vec!["A One".to_string(), "B Two".to_string()],
            year: Some(2020),
            cited_by_count: 3,
            article_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_exists() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(!storage.exists("https://a.example/1").unwrap());

        assert!(storage.insert(&result("https://a.example/1")).unwrap());
        assert!(storage.exists("https://a.example/1").unwrap());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_ignored() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.insert(&result("https://a.example/1")).unwrap());
        assert!(!storage.insert(&result("https://a.example/1")).unwrap());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_results_round_trip_through_storage() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let original = result("https://a.example/1");
        storage.insert(&original).unwrap();

        let loaded = storage.load_results().unwrap();
        assert_eq!(loaded, vec![original]);
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.start_run("abc123", "deep learning").unwrap();

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.query, "deep learning");
        assert!(run.finished_at.is_none());

        storage
            .finish_run(run_id, RunStatus::Completed, 7)
            .unwrap();
        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.results_collected, 7);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(99),
            Err(StorageError::RunNotFound(99))
        ));
        assert!(storage.finish_run(99, RunStatus::Failed, 0).is_err());
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.insert(&result("https://a.example/1")).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert!(storage.exists("https://a.example/1").unwrap());
    }
}
