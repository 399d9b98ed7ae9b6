//! Author profile page parser

use crate::parser::normalize_whitespace;
use crate::ParseError;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

/// Headline citation metrics of an author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileMetrics {
    pub citations: u64,
    pub h_index: u64,
    pub i10_index: u64,
}

/// One row of the profile's publication table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilePublication {
    pub title: String,
    pub authors: Option<String>,
    pub source: Option<String>,
    pub citation_count: u64,
    pub article_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoAuthor {
    pub name: String,
    pub affiliation: Option<String>,
    pub profile_url: Option<String>,
}

/// Parsed author profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorProfile {
    pub name: Option<String>,
    pub affiliation: Option<String>,
    pub email: Option<String>,
    pub interests: Vec<String>,
    pub metrics: ProfileMetrics,
    pub publications: Vec<ProfilePublication>,
    pub co_authors: Vec<CoAuthor>,
}

pub struct ProfileParser {
    base: Url,
    name: Selector,
    info_line: Selector,
    interest: Selector,
    stats_row: Selector,
    cell: Selector,
    value_cell: Selector,
    publication_row: Selector,
    publication_link: Selector,
    gray: Selector,
    citation_count: Selector,
    co_author: Selector,
    co_author_link: Selector,
    co_author_affiliation: Selector,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {}", css, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn parse_count(text: &str) -> u64 {
    text.trim().replace(',', "").parse().unwrap_or(0)
}

impl ProfileParser {
    pub fn new(base: Url) -> Result<Self, ParseError> {
        Ok(Self {
            base,
            name: selector("#gsc_prf_in")?,
            info_line: selector(".gsc_prf_il")?,
            interest: selector("#gsc_prf_int a")?,
            stats_row: selector("#gsc_rsb_st tr")?,
            cell: selector("td")?,
            value_cell: selector("td.gsc_rsb_std")?,
            publication_row: selector(".gsc_a_tr")?,
            publication_link: selector(".gsc_a_t a")?,
            gray: selector(".gs_gray")?,
            citation_count: selector(".gsc_a_c a")?,
            co_author: selector(".gsc_oci")?,
            co_author_link: selector(".gsc_oci_name a")?,
            co_author_affiliation: selector(".gsc_oci_aff")?,
        })
    }

    fn absolute(&self, href: &str) -> Option<String> {
        self.base.join(href.trim()).ok().map(String::from)
    }

    /// Parses an author profile page
    ///
    /// # Returns
    ///
    /// * `Ok(AuthorProfile)` - Parsed profile; missing sections are left empty
    /// * `Err(ParseError::EmptyDocument)` - The body was empty
    pub fn parse_profile(&self, body: &str) -> Result<AuthorProfile, ParseError> {
        if body.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }

        let document = Html::parse_document(body);

        let name = document
            .select(&self.name)
            .next()
            .map(text_of)
            .filter(|s| !s.is_empty());

        let info: Vec<String> = document
            .select(&self.info_line)
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect();
        let affiliation = info.first().cloned();
        let email = info.iter().find_map(|line| {
            line.strip_prefix("Verified email at")
                .map(|rest| rest.trim().to_string())
                .or_else(|| line.contains('@').then(|| line.clone()))
        });

        let interests = document
            .select(&self.interest)
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect();

        Ok(AuthorProfile {
            name,
            affiliation,
            email,
            interests,
            metrics: self.extract_metrics(&document),
            publications: self.extract_publications(&document),
            co_authors: self.extract_co_authors(&document),
        })
    }

    fn extract_metrics(&self, document: &Html) -> ProfileMetrics {
        let mut metrics = ProfileMetrics::default();

        for row in document.select(&self.stats_row) {
            let Some(label) = row.select(&self.cell).next().map(text_of) else {
                continue;
            };
            let value = row
                .select(&self.value_cell)
                .next()
                .map(|cell| parse_count(&text_of(cell)))
                .unwrap_or(0);

            match label.to_lowercase().as_str() {
                "citations" => metrics.citations = value,
                "h-index" => metrics.h_index = value,
                "i10-index" => metrics.i10_index = value,
                _ => {}
            }
        }

        metrics
    }

    fn extract_publications(&self, document: &Html) -> Vec<ProfilePublication> {
        document
            .select(&self.publication_row)
            .filter_map(|row| {
                let link = row.select(&self.publication_link).next()?;
                let title = text_of(link);
                if title.is_empty() {
                    return None;
                }

                let mut gray = row.select(&self.gray).map(text_of);
                let authors = gray.next().filter(|s| !s.is_empty());
                let source = gray.next().filter(|s| !s.is_empty());

                let citation_count = row
                    .select(&self.citation_count)
                    .next()
                    .map(|a| parse_count(&text_of(a)))
                    .unwrap_or(0);

                Some(ProfilePublication {
                    title,
                    authors,
                    source,
                    citation_count,
                    article_url: link.value().attr("href").and_then(|h| self.absolute(h)),
                })
            })
            .collect()
    }

    fn extract_co_authors(&self, document: &Html) -> Vec<CoAuthor> {
        document
            .select(&self.co_author)
            .filter_map(|entry| {
                let link = entry.select(&self.co_author_link).next()?;
                let name = text_of(link);
                if name.is_empty() {
                    return None;
                }

                Some(CoAuthor {
                    name,
                    affiliation: entry
                        .select(&self.co_author_affiliation)
                        .next()
                        .map(text_of)
                        .filter(|s| !s.is_empty()),
                    profile_url: link.value().attr("href").and_then(|h| self.absolute(h)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
<html><body>
<div id="gsc_prf_in">Ada Lovelace</div>
<div class="gsc_prf_il">Analytical Engine Society</div>
<div class="gsc_prf_il" id="gsc_prf_ivh">Verified email at engine.org</div>
<div id="gsc_prf_int"><a class="gsc_prf_inta">Computing</a><a class="gsc_prf_inta">Mathematics</a></div>
<table id="gsc_rsb_st">
  <thead><tr><th></th><th>All</th><th>Since 2019</th></tr></thead>
  <tbody>
    <tr><td class="gsc_rsb_sc1"><a>Citations</a></td><td class="gsc_rsb_std">1,234</td><td class="gsc_rsb_std">567</td></tr>
    <tr><td class="gsc_rsb_sc1"><a>h-index</a></td><td class="gsc_rsb_std">15</td><td class="gsc_rsb_std">10</td></tr>
    <tr><td class="gsc_rsb_sc1"><a>i10-index</a></td><td class="gsc_rsb_std">20</td><td class="gsc_rsb_std">12</td></tr>
  </tbody>
</table>
<table><tbody id="gsc_a_b">
  <tr class="gsc_a_tr">
    <td class="gsc_a_t"><a href="/citations?view_op=view_citation&citation_for_view=X:1">Notes on the Engine</a>
      <div class="gs_gray">A Lovelace, C Babbage</div><div class="gs_gray">Scientific Memoirs, 1843</div></td>
    <td class="gsc_a_c"><a>42</a></td>
  </tr>
  <tr class="gsc_a_tr">
    <td class="gsc_a_t"><a href="/citations?view_op=view_citation&citation_for_view=X:2">Letters</a></td>
    <td class="gsc_a_c"></td>
  </tr>
</tbody></table>
<div class="gsc_oci">
  <span class="gsc_oci_name"><a href="/citations?user=babbage">Charles Babbage</a></span>
  <span class="gsc_oci_aff">Cambridge</span>
</div>
</body></html>
"#;

    fn parser() -> ProfileParser {
        ProfileParser::new(Url::parse("https://scholar.google.com/citations").unwrap()).unwrap()
    }

    #[test]
    fn test_parse_profile_header() {
        let profile = parser().parse_profile(PROFILE).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.affiliation.as_deref(), Some("Analytical Engine Society"));
        assert_eq!(profile.email.as_deref(), Some("engine.org"));
        assert_eq!(profile.interests, vec!["Computing", "Mathematics"]);
    }

    #[test]
    fn test_parse_profile_metrics() {
        let profile = parser().parse_profile(PROFILE).unwrap();
        assert_eq!(
            profile.metrics,
            ProfileMetrics {
                citations: 1234,
                h_index: 15,
                i10_index: 20,
            }
        );
    }

    #[test]
    fn test_parse_profile_publications() {
        let profile = parser().parse_profile(PROFILE).unwrap();
        assert_eq!(profile.publications.len(), 2);

        let first = &profile.publications[0];
        assert_eq!(first.title, "Notes on the Engine");
        assert_eq!(first.authors.as_deref(), Some("A Lovelace, C Babbage"));
        assert_eq!(first.source.as_deref(), Some("Scientific Memoirs, 1843"));
        assert_eq!(first.citation_count, 42);
        assert!(first
            .article_url
            .as_deref()
            .unwrap()
            .starts_with("https://scholar.google.com/citations?view_op=view_citation"));

        let second = &profile.publications[1];
        assert_eq!(second.citation_count, 0);
        assert!(second.authors.is_none());
    }

    #[test]
    fn test_parse_profile_co_authors() {
        let profile = parser().parse_profile(PROFILE).unwrap();
        assert_eq!(
            profile.co_authors,
            vec![CoAuthor {
                name: "Charles Babbage".to_string(),
                affiliation: Some("Cambridge".to_string()),
                profile_url: Some("https://scholar.google.com/citations?user=babbage".to_string()),
            }]
        );
    }

    #[test]
    fn test_empty_profile_is_error() {
        assert!(matches!(
            parser().parse_profile(""),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn test_sparse_profile() {
        let profile = parser()
            .parse_profile("<html><body><div id=\"gsc_prf_in\">Someone</div></body></html>")
            .unwrap();
        assert_eq!(profile.name.as_deref(), Some("Someone"));
        assert!(profile.publications.is_empty());
        assert_eq!(profile.metrics, ProfileMetrics::default());
    }
}
