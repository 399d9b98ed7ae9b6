//! End-to-end crawls against a mock search service in direct mode

use scholar_sweep::config::Config;
use scholar_sweep::crawler::{build_controller, CrawlRequest, SearchQuery};
use scholar_sweep::storage::{ResultStore, SqliteStorage};
use scholar_sweep::CitationGraph;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a direct-mode configuration pointing every endpoint at `base_url`
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    let mut config = Config::default();
    config.proxy.enabled = false;
    config.fetch.min_delay = 0;
    config.fetch.max_delay = 0;
    config.fetch.retry_backoff_min = 0;
    config.fetch.retry_backoff_max = 0;
    config.fetch.max_retries = 1;
    config.crawl.search_url = format!("{}/scholar", base_url);
    config.crawl.profile_url = format!("{}/citations", base_url);
    config.crawl.unpaywall_url = format!("{}/unpaywall", base_url);
    config.output.database_path = db_path.to_string();
    config
}

/// One search hit: title, article path, cited-by id, optional DOI
fn result_block(base_url: &str, title: &str, slug: &str, cites: u32, doi: Option<&str>) -> String {
    let doi_link = doi
        .map(|d| format!(r#"<a href="https://doi.org/{}">doi</a>"#, d))
        .unwrap_or_default();
    format!(
        r#"<div class="gs_r gs_or gs_scl"><div class="gs_ri">
<h3 class="gs_rt"><a href="{base}/papers/{slug}">{title}</a></h3>
<div class="gs_a">J Doe, R Roe - Journal of Mocks, 2020 - mocks.example</div>
<div class="gs_rs">Snippet for {title}.</div>
{doi_link}
<div class="gs_fl"><a href="/scholar?cites={cites}&hl=en">Cited by 3</a></div>
</div></div>"#,
        base = base_url,
        slug = slug,
        title = title,
        cites = cites,
        doi_link = doi_link
    )
}

fn page(blocks: &[String]) -> String {
    format!("<html><body>{}</body></html>", blocks.concat())
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=UTF-8")
}

#[tokio::test]
async fn test_direct_crawl_with_expansion_and_pdf() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("results.db");
    let pdf_dir = dir.path().join("pdfs");

    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param("start", "0"))
        .respond_with(html(page(&[
            result_block(&base, "Root Paper", "root", 1, Some("10.1000/root")),
            result_block(&base, "Second Paper", "second", 2, None),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param("cites", "1"))
        .respond_with(html(page(&[result_block(&base, "Citing Paper", "citing", 10, None)])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param("cites", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/unpaywall/10.1000/root"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"best_oa_location": {{"url_for_pdf": "{}/files/root.pdf"}}}}"#,
            base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/root.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4 mock".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let config = create_test_config(&base, db_path.to_str().unwrap());
    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut controller = build_controller(&config, "test-hash", Box::new(storage)).unwrap();

    let request = CrawlRequest {
        query: SearchQuery::new("mocks"),
        num_results: 10,
        max_depth: 1,
        pdf_dir: Some(pdf_dir.clone()),
    };
    let mut graph = CitationGraph::new();
    let outcome = controller
        .crawl(&request, &mut graph, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert!(!outcome.stopped_early);

    let root = &outcome.results[0];
    assert_eq!(root.title.as_deref(), Some("Root Paper"));
    assert_eq!(root.authors, vec!["J Doe", "R Roe"]);
    assert_eq!(root.year, Some(2020));
    assert_eq!(root.cited_by_count, 3);
    assert!(pdf_dir.join("Root_Paper_2020.pdf").exists());
    assert!(root.pdf_path.is_some());

    // the second paper's cited-by page failed; it is still kept
    assert!(outcome.results[1].pdf_path.is_none());

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.contains_edge(&format!("{}/papers/citing", base), "10.1000/root"));

    let metrics = controller.orchestrator().metrics().snapshot();
    assert_eq!(metrics.pages_fetched, 1);
    assert_eq!(metrics.frontier_expanded, 2);
    assert_eq!(metrics.pdfs_downloaded, 1);

    assert_eq!(controller.storage().count().unwrap(), 2);
}

#[tokio::test]
async fn test_rerun_skips_stored_results() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param("start", "0"))
        .respond_with(html(page(&[
            result_block(&base, "First", "first", 1, None),
            result_block(&base, "Second", "second", 2, None),
            result_block(&base, "Third", "third", 3, None),
        ])))
        .mount(&server)
        .await;

    let config = create_test_config(&base, db_path.to_str().unwrap());
    let request = CrawlRequest {
        query: SearchQuery::new("mocks"),
        num_results: 2,
        max_depth: 0,
        pdf_dir: None,
    };

    for expected in [2, 1, 0] {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let mut controller = build_controller(&config, "test-hash", Box::new(storage)).unwrap();
        let outcome = controller
            .crawl(&request, &mut CitationGraph::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), expected);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count().unwrap(), 3);
}
