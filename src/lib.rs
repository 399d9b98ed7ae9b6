//! Scholar-Sweep: a proxy-routed citation crawler
//!
//! This crate crawls a paginated scholarly search service, follows "cited by"
//! links to a bounded depth, and downloads open-access PDFs, routing every
//! request through a rotating pool of short-lived relay proxies.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod graph;
pub mod output;
pub mod parser;
pub mod proxy;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Main error type for Scholar-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    NoProxies(#[from] NoProxiesAvailable),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Export error: {0}")]
    Export(#[from] output::ExportError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid usage: {0}")]
    Usage(String),

    #[error("Crawl cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Raised when the proxy pool cannot supply a working relay
///
/// This is the only failure that crosses component boundaries: the pool
/// raises it, the fetch orchestrator propagates it from its initial
/// acquisition, and the crawl controller decides whether the run can go on.
#[derive(Debug, Clone, Error)]
#[error("No proxies available: {reason}")]
pub struct NoProxiesAvailable {
    pub reason: String,
}

impl NoProxiesAvailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// HTML parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Result type alias for Scholar-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlController, CrawlOutcome, CrawlRequest, SearchQuery};
pub use fetch::FetchOrchestrator;
pub use graph::{CitationGraph, GraphSink, PaperRef};
pub use parser::{ResultParser, ScholarParser, ScrapeResult};
pub use proxy::{FailureKind, ProxyBinding, ProxyPool};
pub use state::{CrawlMetrics, MetricsSnapshot};
pub use storage::{ResultStore, SqliteStorage};
