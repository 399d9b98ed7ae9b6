//! CSV and JSON export of collected results

use crate::output::ExportError;
use crate::parser::{AuthorProfile, ScrapeResult};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// One CSV row; authors are flattened into a single column
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    title: Option<&'a str>,
    authors: String,
    publication: Option<&'a str>,
    year: Option<i32>,
    cited_by_count: u32,
    cited_by_url: Option<&'a str>,
    related_articles_url: Option<&'a str>,
    article_url: Option<&'a str>,
    doi: Option<&'a str>,
    pdf_url: Option<&'a str>,
    pdf_path: Option<&'a str>,
    snippet: Option<&'a str>,
}

impl<'a> From<&'a ScrapeResult> for ResultRow<'a> {
    fn from(result: &'a ScrapeResult) -> Self {
        Self {
            title: result.title.as_deref(),
            authors: result.authors.join(", "),
            publication: result.publication.as_deref(),
            year: result.year,
            cited_by_count: result.cited_by_count,
            cited_by_url: result.cited_by_url.as_deref(),
            related_articles_url: result.related_articles_url.as_deref(),
            article_url: result.article_url.as_deref(),
            doi: result.doi.as_deref(),
            pdf_url: result.pdf_url.as_deref(),
            pdf_path: result.pdf_path.as_deref(),
            snippet: result.snippet.as_deref(),
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes results as CSV with a header row
pub fn export_csv(results: &[ScrapeResult], path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for result in results {
        writer.serialize(ResultRow::from(result))?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), "Exported {} results as CSV", results.len());
    Ok(())
}

/// Writes results as a pretty-printed JSON array
pub fn export_json(results: &[ScrapeResult], path: &Path) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(create(path)?, results)?;
    tracing::info!(path = %path.display(), "Exported {} results as JSON", results.len());
    Ok(())
}

/// Writes results as JSON when `json` is set, CSV otherwise
pub fn export_results(results: &[ScrapeResult], path: &Path, json: bool) -> Result<(), ExportError> {
    if json {
        export_json(results, path)
    } else {
        export_csv(results, path)
    }
}

/// Writes an author profile
///
/// JSON output carries the whole profile. CSV output only has room for the
/// publication list.
pub fn export_profile(profile: &AuthorProfile, path: &Path, json: bool) -> Result<(), ExportError> {
    if json {
        serde_json::to_writer_pretty(create(path)?, profile)?;
    } else {
        let mut writer = csv::Writer::from_writer(create(path)?);
        for publication in &profile.publications {
            writer.serialize(publication)?;
        }
        writer.flush()?;
    }
    tracing::info!(
        path = %path.display(),
        "Exported profile with {} publications",
        profile.publications.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ProfilePublication;
    use tempfile::TempDir;

    fn sample() -> ScrapeResult {
        ScrapeResult {
            title: Some("Graphs, and more".to_string()),
            authors: vec!["A Author".to_string(), "B Author".to_string()],
            year: Some(2021),
            cited_by_count: 7,
            article_url: Some("https://a.example/1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_export_csv_joins_authors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        export_csv(&[sample()], &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "title");
        assert_eq!(&headers[1], "authors");

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Graphs, and more");
        assert_eq!(&record[1], "A Author, B Author");
        assert_eq!(&record[3], "2021");
    }

    #[test]
    fn test_export_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("results.json");
        export_results(&[sample()], &path, true).unwrap();

        let loaded: Vec<ScrapeResult> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, vec![sample()]);
    }

    #[test]
    fn test_export_profile_csv_lists_publications() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.csv");
        let profile = AuthorProfile {
            name: Some("Ada".to_string()),
            publications: vec![ProfilePublication {
                title: "On engines".to_string(),
                authors: Some("A Lovelace".to_string()),
                source: None,
                citation_count: 12,
                article_url: None,
            }],
            ..Default::default()
        };
        export_profile(&profile, &path, false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("title,authors,source,citation_count,article_url"));
        assert!(content.contains("On engines,A Lovelace,,12,"));
    }
}
