use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::{Duration, Instant};

/// Liveness check for a candidate proxy
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns the round-trip latency when `address` relays the test request
    async fn probe(&self, address: &str) -> Result<Duration, String>;
}

/// Fetches a fixed test endpoint through the candidate
///
/// An HTTPS test URL forces the proxy to open a CONNECT tunnel, which is the
/// same path real requests take.
#[derive(Debug, Clone)]
pub struct TunnelProber {
    test_url: String,
    timeout: Duration,
}

impl TunnelProber {
    pub fn new(test_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            test_url: test_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Prober for TunnelProber {
    async fn probe(&self, address: &str) -> Result<Duration, String> {
        let proxy = Proxy::all(format!("http://{}", address)).map_err(|e| e.to_string())?;
        let client = Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())?;

        let started = Instant::now();
        let response = client
            .get(&self.test_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("test endpoint returned HTTP {}", response.status()));
        }

        Ok(started.elapsed())
    }
}
