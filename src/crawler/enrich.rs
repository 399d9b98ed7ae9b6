//! PDF enrichment: resolving open-access copies by DOI

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::REFERER;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Finds a downloadable PDF for a DOI
#[async_trait]
pub trait PdfResolver: Send + Sync {
    /// Returns the PDF URL, or `None` when no copy is known
    async fn resolve(&self, doi: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url_for_pdf: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnpaywallRecord {
    doi_url: Option<String>,
    best_oa_location: Option<OaLocation>,
    #[serde(default)]
    oa_locations: Vec<OaLocation>,
}

impl UnpaywallRecord {
    fn pdf_url(self) -> Option<String> {
        self.best_oa_location
            .and_then(|l| l.url_for_pdf)
            .or_else(|| self.oa_locations.into_iter().find_map(|l| l.url_for_pdf))
            .filter(|url| !url.is_empty())
    }
}

/// Resolver backed by the Unpaywall REST API
pub struct UnpaywallResolver {
    client: Client,
    base_url: String,
    email: String,
}

impl UnpaywallResolver {
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            email: email.into(),
        })
    }

    async fn lookup(&self, doi: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), doi);
        let response = self
            .client
            .get(&url)
            .query(&[("email", self.email.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(doi = %doi, status = %response.status(), "Unpaywall has no record");
            return Ok(None);
        }

        let mut record: UnpaywallRecord = response.json().await?;
        let landing = record.doi_url.take().filter(|u| !u.is_empty());
        if let Some(pdf) = record.pdf_url() {
            return Ok(Some(pdf));
        }
        match landing {
            Some(landing) => self.scan_landing_page(&landing, doi).await,
            None => Ok(None),
        }
    }

    /// Follows the DOI to the publisher page and looks for a PDF link there
    async fn scan_landing_page(
        &self,
        landing: &str,
        doi: &str,
    ) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .get(landing)
            .header(REFERER, "https://scholar.google.com")
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(doi = %doi, status = %response.status(), "Landing page unavailable");
            return Ok(None);
        }

        let final_url = response.url().clone();
        let body = response.text().await?;
        let found = find_pdf_link(&final_url, &body, doi);
        if let Some(url) = &found {
            tracing::debug!(doi = %doi, "Found PDF link on landing page: {}", url);
        }
        Ok(found)
    }
}

const PDF_HREF_MARKERS: &[&str] = &[
    ".pdf",
    "/pdf/",
    "content/pdf",
    "/doi/pdf/",
    "download",
    "fulltext",
];

/// Extracts a PDF link from a publisher landing page
///
/// Tried in order: the `citation_pdf_url` meta tag, publisher link
/// attributes (`pdfurl`, `data-download-content="Article"`), an embedded
/// `"pdfPath"` value, then any link that looks like a PDF. Among those,
/// links mentioning the DOI suffix win.
pub fn find_pdf_link(page_url: &Url, body: &str, doi: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let join = |href: &str| page_url.join(href.trim()).ok().map(String::from);

    let meta = Selector::parse(r#"meta[name="citation_pdf_url"]"#).ok()?;
    if let Some(content) = document
        .select(&meta)
        .find_map(|m| m.value().attr("content"))
        .filter(|c| !c.trim().is_empty())
    {
        return join(content);
    }

    let anchors = Selector::parse("a").ok()?;
    for a in document.select(&anchors) {
        let element = a.value();
        if let Some(pdfurl) = element.attr("pdfurl") {
            return join(pdfurl);
        }
        if element.attr("data-download-content") == Some("Article") {
            if let Some(href) = element.attr("href") {
                return join(href);
            }
        }
    }

    let pdf_path = Regex::new(r#""pdfPath":"([^"]+?\.pdf)""#).ok()?;
    if let Some(path) = pdf_path.captures(body).and_then(|c| c.get(1)) {
        return join(path.as_str());
    }

    let suffix = doi
        .get(doi.len().saturating_sub(3)..)
        .unwrap_or(doi)
        .to_lowercase();
    let candidates: Vec<&str> = document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            let href = href.to_lowercase();
            PDF_HREF_MARKERS.iter().any(|m| href.contains(m))
        })
        .collect();

    candidates
        .iter()
        .find(|href| href.to_lowercase().contains(&suffix))
        .or_else(|| candidates.first())
        .and_then(|href| join(href))
}

#[async_trait]
impl PdfResolver for UnpaywallResolver {
    async fn resolve(&self, doi: &str) -> Option<String> {
        match self.lookup(doi).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(doi = %doi, "Unpaywall lookup failed: {}", e);
                None
            }
        }
    }
}

const MAX_FILENAME_CHARS: usize = 100;

/// File name for a downloaded PDF: `{title}_{year}.pdf`
///
/// Characters other than alphanumerics, `-` and `_` become underscores.
pub fn pdf_filename(title: Option<&str>, year: Option<i32>) -> String {
    let mut stem = String::new();
    let mut last_was_sep = false;
    for c in title.unwrap_or("").trim().chars() {
        if c.is_alphanumeric() || c == '-' {
            stem.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !stem.is_empty() {
            stem.push('_');
            last_was_sep = true;
        }
    }

    let mut stem: String = stem.trim_end_matches('_').chars().take(MAX_FILENAME_CHARS).collect();
    if stem.is_empty() {
        stem.push_str("untitled");
    }

    let year = year.map_or_else(|| "unknown".to_string(), |y| y.to_string());
    format!("{}_{}.pdf", stem.trim_end_matches('_'), year)
}
