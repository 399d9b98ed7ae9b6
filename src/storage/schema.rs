//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Scholar-Sweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    query TEXT NOT NULL,
    status TEXT NOT NULL,
    results_collected INTEGER DEFAULT 0
);

-- Search results, one row per canonical URL
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT UNIQUE,
    title TEXT,
    authors TEXT NOT NULL,
    publication TEXT,
    year INTEGER,
    snippet TEXT,
    cited_by_count INTEGER NOT NULL DEFAULT 0,
    cited_by_url TEXT,
    related_articles_url TEXT,
    article_url TEXT,
    doi TEXT,
    pdf_url TEXT,
    pdf_path TEXT,
    inserted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_doi ON results(doi);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
