//! Search results page parser
//!
//! # Extraction Rules
//!
//! Each `div.gs_ri` block is one result:
//! - Title: link text of `h3.gs_rt a`, or the bare text of `h3.gs_rt`
//! - Authors: the part of `div.gs_a` before the first " - ", comma separated;
//!   a trailing ellipsis becomes "et al."
//! - Publication and year: the part after " - ", split at the rightmost
//!   four-digit year
//! - Cited-by: the `scholar?cites` link and the count in its text
//! - DOI: any doi.org link in the surrounding result block
//!
//! Blocks that only say "no results found" are skipped.

use crate::parser::{normalize_whitespace, ResultParser, ScrapeResult};
use crate::ParseError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub struct ScholarParser {
    base: Url,
    item: Selector,
    title: Selector,
    title_link: Selector,
    byline: Selector,
    snippet: Selector,
    cited_by: Selector,
    related: Selector,
    any_link: Selector,
    next_td: Selector,
    next_aria: Selector,
    next_div: Selector,
    year: Regex,
    digits: Regex,
    doi: Regex,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {}", css, e)))
}

fn pattern(re: &str) -> Result<Regex, ParseError> {
    Regex::new(re).map_err(|e| ParseError::Selector(e.to_string()))
}

impl ScholarParser {
    /// Creates a parser resolving relative links against `base`
    ///
    /// # Arguments
    ///
    /// * `base` - The search endpoint the pages were fetched from
    pub fn new(base: Url) -> Result<Self, ParseError> {
        Ok(Self {
            base,
            item: selector("div.gs_ri")?,
            title: selector("h3.gs_rt")?,
            title_link: selector("h3.gs_rt a")?,
            byline: selector("div.gs_a")?,
            snippet: selector("div.gs_rs")?,
            cited_by: selector("a[href*='scholar?cites']")?,
            related: selector("div.gs_fl a[href*='related:'], div.gs_fl a[href*='?related=']")?,
            any_link: selector("a[href]")?,
            next_td: selector("td.gs_n a[href*='start=']")?,
            next_aria: selector("a[aria-label='Next']")?,
            next_div: selector("div#gs_n td a[href*='start=']")?,
            year: pattern(r"\b(\d{4})\b")?,
            digits: pattern(r"\d+")?,
            doi: pattern(r"https?://(?:dx\.)?doi\.org/(10\.[^/\s]+/[^?#\s]+)")?,
        })
    }

    fn absolute(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.base.join(href).ok().map(String::from)
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Option<ScrapeResult> {
        let title = self.extract_title(item);
        let article_url = item
            .select(&self.title_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| self.absolute(href));

        let byline = item
            .select(&self.byline)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default();
        let authors = extract_authors(&byline);
        let (publication, year) = self.extract_publication(&byline);

        if title.is_none() && article_url.is_none() && authors.is_empty() && publication.is_none()
        {
            let text = item.text().collect::<String>().to_lowercase();
            if text.contains("no results found") || text.contains("did not match any articles") {
                return None;
            }
        }

        let snippet = item
            .select(&self.snippet)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|s| !s.is_empty());

        let (cited_by_count, cited_by_url) = match item.select(&self.cited_by).next() {
            Some(link) => {
                let text = link.text().collect::<String>();
                let count = self
                    .digits
                    .find(&text)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                let url = link.value().attr("href").and_then(|h| self.absolute(h));
                (count, url)
            }
            None => (0, None),
        };

        let related_articles_url = item
            .select(&self.related)
            .find(|a| {
                a.text()
                    .collect::<String>()
                    .to_lowercase()
                    .contains("related articles")
            })
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| self.absolute(h));

        Some(ScrapeResult {
            title,
            authors,
            publication,
            year,
            snippet,
            cited_by_count,
            cited_by_url,
            related_articles_url,
            article_url,
            doi: self.extract_doi(item),
            pdf_url: None,
            pdf_path: None,
        })
    }

    fn extract_title(&self, item: ElementRef<'_>) -> Option<String> {
        let heading = item.select(&self.title).next()?;

        let text = match heading.select(&self.title_link).next() {
            Some(link) => link.text().collect::<String>(),
            // Bare titles carry [CITATION]/[BOOK] markers in child spans
            None => heading
                .children()
                .filter_map(|node| node.value().as_text().map(|t| String::from(&**t)))
                .collect::<String>(),
        };

        let text = normalize_whitespace(&text);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn extract_publication(&self, byline: &str) -> (Option<String>, Option<i32>) {
        let Some((_, segment)) = byline.split_once(" - ") else {
            return (None, None);
        };
        let segment = segment.trim();

        let Some(found) = self.year.find_iter(segment).last() else {
            return (non_empty(segment), None);
        };

        let year_text = found.as_str();
        let year = year_text.parse().ok();

        let before = segment[..found.start()].trim();
        let before = before.strip_suffix(',').unwrap_or(before).trim();
        let after = segment[found.end()..].trim();

        let publication = if !before.is_empty() {
            before.to_string()
        } else if let Some(rest) = after.strip_prefix('-') {
            let rest = rest.trim();
            rest.strip_prefix('-').unwrap_or(rest).trim().to_string()
        } else {
            String::new()
        };

        if publication == year_text {
            return (None, year);
        }

        (non_empty(&publication), year)
    }

    fn extract_doi(&self, item: ElementRef<'_>) -> Option<String> {
        // The DOI badge sits next to `div.gs_ri`, inside the enclosing result block
        let scope = item
            .parent()
            .and_then(ElementRef::wrap)
            .filter(|block| block.value().classes().any(|c| c == "gs_r"))
            .unwrap_or(item);

        scope
            .select(&self.any_link)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| self.doi.captures(href))
            .map(|caps| caps[1].to_string())
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn extract_authors(byline: &str) -> Vec<String> {
    if byline.is_empty() {
        return Vec::new();
    }

    let segment = byline.split(" - ").next().unwrap_or_default();
    let mut authors: Vec<String> = segment
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    let is_ellipsis = |s: &str| s.contains('\u{2026}') || s.contains("...");
    let mut truncated = is_ellipsis(segment);

    if let Some(last) = authors.last_mut() {
        if is_ellipsis(last) {
            *last = last.replace('\u{2026}', "").replace("...", "").trim().to_string();
            truncated = true;
        }
    }
    authors.retain(|a| !a.is_empty());

    if truncated && authors.last().map(String::as_str) != Some("et al.") {
        authors.push("et al.".to_string());
    }

    authors
}

impl ResultParser for ScholarParser {
    fn parse(&self, body: &str) -> Result<Vec<ScrapeResult>, ParseError> {
        if body.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }

        let document = Html::parse_document(body);
        let results: Vec<ScrapeResult> = document
            .select(&self.item)
            .filter_map(|item| self.parse_item(item))
            .collect();

        tracing::debug!("Parsed {} results", results.len());
        Ok(results)
    }

    fn next_page_link(&self, body: &str) -> Option<String> {
        let document = Html::parse_document(body);
        let says_next = |a: &ElementRef<'_>| a.text().collect::<String>().contains("Next");

        if let Some(link) = document.select(&self.next_td).find(says_next) {
            return link.value().attr("href").and_then(|h| self.absolute(h));
        }

        if let Some(link) = document.select(&self.next_aria).next() {
            return link.value().attr("href").and_then(|h| self.absolute(h));
        }

        document
            .select(&self.next_div)
            .find(says_next)
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| self.absolute(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ScholarParser {
        ScholarParser::new(Url::parse("https://scholar.google.com/scholar").unwrap()).unwrap()
    }

    const PAGE: &str = r#"
<html><body>
<div class="gs_r gs_or gs_scl">
  <div class="gs_ggs gs_fl"><div class="gs_or_ggsm"><a href="https://doi.org/10.1000/xyz123">[PDF] doi.org</a></div></div>
  <div class="gs_ri">
    <h3 class="gs_rt"><a href="https://example.org/paper1">Attention Is <b>All</b> You Need</a></h3>
    <div class="gs_a"><a href="/citations?user=1">A Vaswani</a>, N Shazeer, N Parmar&hellip; - Advances in neural information processing systems, 2017 - proceedings.neurips.cc</div>
    <div class="gs_rs">The dominant sequence transduction models<br>are based on recurrent networks.</div>
    <div class="gs_fl">
      <a href="/scholar?cites=2960712678066186980&as_sdt=5,33&sciodt=0,33&hl=en">Cited by 120000</a>
      <a href="/scholar?q=related:abc:scholar.google.com/&hl=en">Related articles</a>
    </div>
  </div>
</div>
<div class="gs_r gs_or gs_scl">
  <div class="gs_ri">
    <h3 class="gs_rt"><span class="gs_ctu">[CITATION]</span> A bare citation</h3>
    <div class="gs_a">J Doe - 2019</div>
  </div>
</div>
<div id="gs_n"><table><tr>
  <td class="gs_n"><a href="/scholar?start=10&q=attention&hl=en"><b>Next</b></a></td>
</tr></table></div>
</body></html>
"#;

    #[test]
    fn test_parse_full_result() {
        let results = parser().parse(PAGE).unwrap();
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(first.article_url.as_deref(), Some("https://example.org/paper1"));
        assert_eq!(
            first.authors,
            vec!["A Vaswani", "N Shazeer", "N Parmar", "et al."]
        );
        assert_eq!(
            first.publication.as_deref(),
            Some("Advances in neural information processing systems")
        );
        assert_eq!(first.year, Some(2017));
        assert_eq!(
            first.snippet.as_deref(),
            Some("The dominant sequence transduction models are based on recurrent networks.")
        );
        assert_eq!(first.cited_by_count, 120000);
        assert!(first
            .cited_by_url
            .as_deref()
            .unwrap()
            .starts_with("https://scholar.google.com/scholar?cites=2960712678066186980"));
        assert!(first
            .related_articles_url
            .as_deref()
            .unwrap()
            .starts_with("https://scholar.google.com/scholar?q=related:"));
        assert_eq!(first.doi.as_deref(), Some("10.1000/xyz123"));
        assert_eq!(first.canonical_url(), Some("https://example.org/paper1"));
    }

    #[test]
    fn test_parse_bare_citation() {
        let results = parser().parse(PAGE).unwrap();
        let second = &results[1];

        assert_eq!(second.title.as_deref(), Some("A bare citation"));
        assert!(second.article_url.is_none());
        assert_eq!(second.authors, vec!["J Doe"]);
        assert_eq!(second.year, Some(2019));
        assert!(second.publication.is_none());
        assert_eq!(second.cited_by_count, 0);
        assert!(second.canonical_url().is_none());
    }

    #[test]
    fn test_next_page_link() {
        assert_eq!(
            parser().next_page_link(PAGE).as_deref(),
            Some("https://scholar.google.com/scholar?start=10&q=attention&hl=en")
        );
    }

    #[test]
    fn test_next_page_aria_label() {
        let html = r#"<a aria-label="Next" href="/scholar?start=20">›</a>"#;
        assert_eq!(
            parser().next_page_link(html).as_deref(),
            Some("https://scholar.google.com/scholar?start=20")
        );
    }

    #[test]
    fn test_no_next_page() {
        let html = r#"<div id="gs_n"><td><a href="/scholar?start=0">Previous</a></td></div>"#;
        assert!(parser().next_page_link(html).is_none());
    }

    #[test]
    fn test_no_results_pseudo_item_skipped() {
        let html = r#"<div class="gs_ri">Your search did not match any articles.</div>"#;
        assert!(parser().parse(html).unwrap().is_empty());
    }

    #[test]
    fn test_empty_body_is_error() {
        assert!(matches!(
            parser().parse("   "),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn test_publication_after_year() {
        let p = parser();
        assert_eq!(
            p.extract_publication("X Author - 2020 - example.com"),
            (Some("example.com".to_string()), Some(2020))
        );
        assert_eq!(
            p.extract_publication("X Author - Nature, 1998, 2004 - nature.com"),
            (Some("Nature, 1998".to_string()), Some(2004))
        );
        assert_eq!(
            p.extract_publication("X Author - Some Book"),
            (Some("Some Book".to_string()), None)
        );
        assert_eq!(p.extract_publication("X Author"), (None, None));
    }

    #[test]
    fn test_authors_with_ascii_ellipsis() {
        assert_eq!(
            extract_authors("A One, B Two... - Venue, 2001"),
            vec!["A One", "B Two", "et al."]
        );
        assert!(extract_authors("").is_empty());
    }
}
