//! Search query model and URL construction

use url::Url;

/// A search with its optional refinements
///
/// `query` is the free-text part. The remaining fields map onto the search
/// service's operators and advanced-search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    /// Restrict to papers by these authors (`as_sauthors`)
    pub authors: Option<String>,
    /// Restrict to this venue (`as_publication`)
    pub publication: Option<String>,
    pub year_low: Option<i32>,
    pub year_high: Option<i32>,
    /// Exact phrase that must appear
    pub phrase: Option<String>,
    /// Terms that must not appear
    pub exclude: Vec<String>,
    /// Words that must appear in the title
    pub title: Option<String>,
    /// Single author operator (`author:"..."`)
    pub author: Option<String>,
    /// Venue operator (`source:"..."`)
    pub source: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// The `q` parameter: free text followed by operators
    pub fn terms(&self) -> String {
        let mut parts = Vec::new();

        let query = self.query.trim();
        if !query.is_empty() {
            parts.push(query.to_string());
        }
        if let Some(phrase) = present(&self.phrase) {
            parts.push(format!("\"{}\"", phrase));
        }
        for term in self.exclude.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            parts.push(format!("-{}", term));
        }
        if let Some(title) = present(&self.title) {
            parts.push(format!("intitle:\"{}\"", title));
        }
        if let Some(author) = present(&self.author) {
            parts.push(format!("author:\"{}\"", author));
        }
        if let Some(source) = present(&self.source) {
            parts.push(format!("source:\"{}\"", source));
        }

        parts.join(" ")
    }

    /// URL of the results page starting at `offset`
    pub fn search_url(&self, base: &Url, offset: u32) -> Url {
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.append_pair("q", &self.terms());
            if let Some(authors) = present(&self.authors) {
                pairs.append_pair("as_sauthors", authors);
            }
            if let Some(publication) = present(&self.publication) {
                pairs.append_pair("as_publication", publication);
            }
            if let Some(year) = self.year_low {
                pairs.append_pair("as_ylo", &year.to_string());
            }
            if let Some(year) = self.year_high {
                pairs.append_pair("as_yhi", &year.to_string());
            }
            pairs.append_pair("start", &offset.to_string());
            pairs.append_pair("hl", "en");
        }
        url
    }
}

/// URL of an author's profile page
pub fn profile_url(base: &Url, author_id: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("user", author_id)
        .append_pair("hl", "en");
    url
}
