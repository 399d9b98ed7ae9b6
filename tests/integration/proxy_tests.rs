//! Proxy discovery, probing and blacklist persistence over real sockets

use async_trait::async_trait;
use scholar_sweep::proxy::{
    CandidateProvider, ListUrlProvider, PoolSettings, Prober, ProxyPool, StaticCandidates,
    TunnelProber,
};
use scholar_sweep::CrawlMetrics;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Accepts every address
struct AlwaysAlive;

#[async_trait]
impl Prober for AlwaysAlive {
    async fn probe(&self, _address: &str) -> Result<Duration, String> {
        Ok(Duration::from_millis(5))
    }
}

#[tokio::test]
async fn test_list_provider_reads_served_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxies.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "# free proxies\n1.2.3.4:8080\nnot-a-proxy\n5.6.7.8:3128\n\n1.2.3.4:8080\n",
        ))
        .mount(&server)
        .await;

    let provider = ListUrlProvider::new(
        vec![
            format!("{}/proxies.txt", server.uri()),
            format!("{}/missing.txt", server.uri()),
        ],
        Duration::from_secs(5),
    )
    .unwrap();

    let candidates = provider.candidates().await.unwrap();
    assert_eq!(candidates, vec!["1.2.3.4:8080", "5.6.7.8:3128"]);
}

#[tokio::test]
async fn test_list_provider_fails_when_every_source_fails() {
    let server = MockServer::start().await;
    let provider =
        ListUrlProvider::new(vec![format!("{}/gone.txt", server.uri())], Duration::from_secs(5))
            .unwrap();

    assert!(provider.candidates().await.is_err());
}

#[tokio::test]
async fn test_tunnel_probe_through_live_proxy() {
    // wiremock answers the proxied request itself
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&proxy)
        .await;

    let prober = TunnelProber::new("http://scholar.invalid/", Duration::from_secs(5));
    let address = proxy.address().to_string();
    assert!(prober.probe(&address).await.is_ok());
}

#[tokio::test]
async fn test_tunnel_probe_against_closed_port() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let prober = TunnelProber::new("http://scholar.invalid/", Duration::from_secs(2));
    assert!(prober.probe(&address).await.is_err());
}

#[tokio::test]
async fn test_blacklist_survives_restart() {
    let dir = TempDir::new().unwrap();
    let settings = PoolSettings {
        enabled: true,
        num_proxies: 5,
        refresh_interval: Duration::from_secs(300),
        blacklist_duration: Duration::from_secs(600),
        blacklist_file: Some(dir.path().join("blacklist.json")),
    };
    let candidates = vec!["10.0.0.1:8080".to_string(), "10.0.0.2:8080".to_string()];

    let pool = ProxyPool::new(
        settings.clone(),
        Arc::new(StaticCandidates::new(candidates.clone())),
        Arc::new(AlwaysAlive),
        Arc::new(CrawlMetrics::new()),
    );
    assert_eq!(pool.refresh().await.unwrap().len(), 2);
    assert!(pool.evict("10.0.0.1:8080"));
    drop(pool);

    let restarted = ProxyPool::new(
        settings,
        Arc::new(StaticCandidates::new(candidates)),
        Arc::new(AlwaysAlive),
        Arc::new(CrawlMetrics::new()),
    );
    assert!(restarted.is_blacklisted("10.0.0.1:8080"));
    assert_eq!(restarted.refresh().await.unwrap(), vec!["10.0.0.2:8080"]);
}
