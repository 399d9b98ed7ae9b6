//! Graph module - accumulates papers and citation edges discovered by a crawl
//!
//! The crawl controller only talks to the [`GraphSink`] trait.
//! [`CitationGraph`] is the in-memory implementation, written out as GraphML.

mod citation;
mod graphml;

pub use citation::CitationGraph;
pub use graphml::write_graphml;

use crate::parser::ScrapeResult;

/// Identity of a paper as a graph node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRef {
    /// Stable node key: DOI, else URL, else title
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub doi: Option<String>,
}

impl PaperRef {
    /// Builds the node identity of a parsed result
    ///
    /// Returns `None` when the result has neither DOI, URL nor title.
    pub fn from_result(result: &ScrapeResult) -> Option<Self> {
        let url = result.canonical_url().map(str::to_string);
        let id = result
            .doi
            .clone()
            .or_else(|| url.clone())
            .or_else(|| result.title.clone())?;

        Some(Self {
            id,
            title: result.title.clone(),
            url,
            doi: result.doi.clone(),
        })
    }
}

/// Receives papers and citation edges as the crawl discovers them
pub trait GraphSink: Send {
    fn add_paper(&mut self, paper: &PaperRef);

    /// Records that `citing` cites `cited`
    fn add_citation(&mut self, citing: &PaperRef, cited: &PaperRef);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_precedence() {
        let mut result = ScrapeResult {
            title: Some("T".to_string()),
            article_url: Some("https://a.example/p".to_string()),
            doi: Some("10.1/x".to_string()),
            ..Default::default()
        };
        assert_eq!(PaperRef::from_result(&result).unwrap().id, "10.1/x");

        result.doi = None;
        assert_eq!(
            PaperRef::from_result(&result).unwrap().id,
            "https://a.example/p"
        );

        result.article_url = None;
        assert_eq!(PaperRef::from_result(&result).unwrap().id, "T");

        result.title = None;
        assert!(PaperRef::from_result(&result).is_none());
    }
}
