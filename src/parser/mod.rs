//! Parser module - turns search and profile pages into structured records
//!
//! The crawl controller only depends on the [`ResultParser`] trait; the
//! scraper-based implementations live in the submodules.

mod profile;
mod results;

pub use profile::{AuthorProfile, CoAuthor, ProfileMetrics, ProfileParser, ProfilePublication};
pub use results::ScholarParser;

use crate::ParseError;
use serde::{Deserialize, Serialize};

/// One search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publication: Option<String>,
    pub year: Option<i32>,
    pub snippet: Option<String>,
    pub cited_by_count: u32,
    pub cited_by_url: Option<String>,
    pub related_articles_url: Option<String>,
    pub article_url: Option<String>,
    pub doi: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_path: Option<String>,
}

impl ScrapeResult {
    /// URL identifying this result for deduplication
    ///
    /// The article link when present, otherwise the cited-by link.
    pub fn canonical_url(&self) -> Option<&str> {
        self.article_url
            .as_deref()
            .or(self.cited_by_url.as_deref())
    }
}

/// Extracts results and pagination from a search page
pub trait ResultParser: Send + Sync {
    /// Parses every result on the page
    fn parse(&self, body: &str) -> Result<Vec<ScrapeResult>, ParseError>;

    /// Absolute URL of the next results page, if the page links one
    fn next_page_link(&self, body: &str) -> Option<String>;
}

/// Collapses runs of whitespace (including non-breaking spaces) to one space
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
