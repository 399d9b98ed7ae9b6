//! Candidate proxy sources
//!
//! Providers return raw `host:port` strings with no liveness guarantee; the
//! pool probes every candidate before admitting it.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Source of unvalidated proxy addresses
#[async_trait]
pub trait CandidateProvider: Send + Sync {
    /// Returns candidate addresses, or a description of why none could be fetched
    async fn candidates(&self) -> Result<Vec<String>, String>;
}

/// Fixed candidate list taken from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    addresses: Vec<String>,
}

impl StaticCandidates {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }
}

#[async_trait]
impl CandidateProvider for StaticCandidates {
    async fn candidates(&self) -> Result<Vec<String>, String> {
        Ok(self
            .addresses
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| is_valid_address(a))
            .collect())
    }
}

/// Fetches newline-separated `host:port` lists from one or more URLs
pub struct ListUrlProvider {
    client: Client,
    sources: Vec<String>,
}

impl ListUrlProvider {
    /// Creates a provider fetching each source with the given timeout
    ///
    /// # Arguments
    ///
    /// * `sources` - URLs returning plain-text proxy lists
    /// * `timeout` - Per-source request timeout
    pub fn new(sources: Vec<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, sources })
    }

    async fn fetch_source(&self, source: &str) -> Result<Vec<String>, String> {
        let response = self
            .client
            .get(source)
            .send()
            .await
            .map_err(|e| format!("{}: {}", source, e))?;

        if !response.status().is_success() {
            return Err(format!("{}: HTTP {}", source, response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("{}: {}", source, e))?;

        Ok(parse_candidate_list(&body))
    }
}

#[async_trait]
impl CandidateProvider for ListUrlProvider {
    async fn candidates(&self) -> Result<Vec<String>, String> {
        let mut all = Vec::new();
        let mut errors = Vec::new();

        for source in &self.sources {
            match self.fetch_source(source).await {
                Ok(found) => {
                    tracing::debug!(source = %source, "Fetched {} proxy candidates", found.len());
                    all.extend(found);
                }
                Err(e) => {
                    tracing::warn!("Proxy source failed: {}", e);
                    errors.push(e);
                }
            }
        }

        if all.is_empty() && !errors.is_empty() {
            return Err(errors.join("; "));
        }

        Ok(dedupe(all))
    }
}

/// Concatenates several providers, tolerating individual failures
pub struct ChainedProvider {
    providers: Vec<Arc<dyn CandidateProvider>>,
}

impl ChainedProvider {
    pub fn new(providers: Vec<Arc<dyn CandidateProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl CandidateProvider for ChainedProvider {
    async fn candidates(&self) -> Result<Vec<String>, String> {
        let mut all = Vec::new();
        let mut errors = Vec::new();

        for provider in &self.providers {
            match provider.candidates().await {
                Ok(found) => all.extend(found),
                Err(e) => errors.push(e),
            }
        }

        if all.is_empty() && !errors.is_empty() {
            return Err(errors.join("; "));
        }

        Ok(dedupe(all))
    }
}

/// Extracts valid `host:port` lines from a plain-text proxy list
pub fn parse_candidate_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| is_valid_address(line))
        .map(str::to_string)
        .collect()
}

/// Checks that `address` looks like `host:port` with a non-zero port
pub fn is_valid_address(address: &str) -> bool {
    let Some((host, port)) = address.rsplit_once(':') else {
        return false;
    };

    if host.is_empty() || host.contains(char::is_whitespace) || host.contains('/') {
        return false;
    }

    matches!(port.parse::<u16>(), Ok(p) if p > 0)
}

fn dedupe(addresses: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address("127.0.0.1:8080"));
        assert!(is_valid_address("proxy.example.com:3128"));
        assert!(!is_valid_address("127.0.0.1"));
        assert!(!is_valid_address("127.0.0.1:0"));
        assert!(!is_valid_address("127.0.0.1:99999"));
        assert!(!is_valid_address(":8080"));
        assert!(!is_valid_address("http://x:80/"));
    }

    #[test]
    fn test_parse_candidate_list() {
        let body = "1.1.1.1:80\r\n\n# comment\nnot-a-proxy\n 2.2.2.2:3128 \n";
        assert_eq!(
            parse_candidate_list(body),
            vec!["1.1.1.1:80".to_string(), "2.2.2.2:3128".to_string()]
        );
    }

    #[tokio::test]
    async fn test_static_candidates_filters_invalid() {
        let provider = StaticCandidates::new(vec![
            "10.0.0.1:8080".to_string(),
            "garbage".to_string(),
        ]);
        assert_eq!(
            provider.candidates().await.unwrap(),
            vec!["10.0.0.1:8080".to_string()]
        );
    }

    struct Failing;

    #[async_trait]
    impl CandidateProvider for Failing {
        async fn candidates(&self) -> Result<Vec<String>, String> {
            Err("source down".to_string())
        }
    }

    #[tokio::test]
    async fn test_chained_provider_dedupes_and_tolerates_failures() {
        let chained = ChainedProvider::new(vec![
            Arc::new(Failing),
            Arc::new(StaticCandidates::new(vec!["10.0.0.1:8080".to_string()])),
            Arc::new(StaticCandidates::new(vec![
                "10.0.0.1:8080".to_string(),
                "10.0.0.2:8080".to_string(),
            ])),
        ]);

        let found = chained.candidates().await.unwrap();
        assert_eq!(found, vec!["10.0.0.1:8080", "10.0.0.2:8080"]);
    }

    #[tokio::test]
    async fn test_chained_provider_all_failing() {
        let chained = ChainedProvider::new(vec![Arc::new(Failing)]);
        assert!(chained.candidates().await.is_err());
    }
}
