//! Fetch orchestrator - one retried, paced, proxy-routed retrieval per call
//!
//! Each logical fetch binds one proxy and keeps it for every retry. Failures
//! are classified and reported to the pool; the proxy is only evicted once
//! the attempts are exhausted or a challenge page comes back.
//!
//! # Retry Policy
//!
//! | Outcome | Action |
//! |---------|--------|
//! | 2xx, no challenge | Report success, return content |
//! | 2xx, challenge page | Report, evict, refresh pool, stop (no retry) |
//! | 403 / 407 / 429 | Report `Forbidden`, retry with the same proxy |
//! | Other non-2xx | Report `Other`, retry with the same proxy |
//! | Timeout | Report `Timeout`, retry with the same proxy |
//! | Connection error | Report `Connection`, retry with the same proxy |
//! | Last attempt failed | Evict the proxy, stop |

use crate::config::FetchConfig;
use crate::fetch::challenge::ChallengeDetector;
use crate::fetch::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::fetch::user_agent::UserAgentPool;
use crate::proxy::{FailureKind, ProxyBinding, ProxyPool};
use crate::state::{CrawlMetrics, ThroughputTracker};
use crate::NoProxiesAvailable;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Pacing, retry and timeout settings
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry_backoff_min: Duration,
    pub retry_backoff_max: Duration,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub latency_window: usize,
}

impl FetchSettings {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay),
            max_delay: Duration::from_millis(config.max_delay),
            retry_backoff_min: Duration::from_millis(config.retry_backoff_min),
            retry_backoff_max: Duration::from_millis(config.retry_backoff_max),
            max_retries: config.max_retries,
            request_timeout: Duration::from_secs(config.request_timeout),
            download_timeout: Duration::from_secs(config.download_timeout),
            latency_window: config.latency_window,
        }
    }
}

/// How a retrieval ended
enum Retrieval {
    Delivered(TransportResponse),
    Challenged,
    Failed,
}

pub struct FetchOrchestrator {
    pool: Arc<ProxyPool>,
    transport: Arc<dyn Transport>,
    detector: Arc<dyn ChallengeDetector>,
    user_agents: UserAgentPool,
    settings: FetchSettings,
    metrics: Arc<CrawlMetrics>,
    throughput: Mutex<ThroughputTracker>,
}

impl FetchOrchestrator {
    pub fn new(
        pool: Arc<ProxyPool>,
        transport: Arc<dyn Transport>,
        detector: Arc<dyn ChallengeDetector>,
        user_agents: UserAgentPool,
        settings: FetchSettings,
        metrics: Arc<CrawlMetrics>,
    ) -> Self {
        let throughput = Mutex::new(ThroughputTracker::new(settings.latency_window));
        Self {
            pool,
            transport,
            detector,
            user_agents,
            settings,
            metrics,
            throughput,
        }
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    pub fn metrics(&self) -> &Arc<CrawlMetrics> {
        &self.metrics
    }

    /// Fetches `url` as text with the configured retry budget
    ///
    /// # Returns
    ///
    /// * `Ok(Some(body))` - Content retrieved
    /// * `Ok(None)` - Attempts exhausted, challenge page, or pool lost mid-call
    /// * `Err(NoProxiesAvailable)` - No proxy could be bound for the first attempt
    pub async fn fetch(&self, url: &str) -> Result<Option<String>, NoProxiesAvailable> {
        self.fetch_with_retries(url, self.settings.max_retries).await
    }

    /// Fetches `url` as text with an explicit retry budget
    pub async fn fetch_with_retries(
        &self,
        url: &str,
        max_retries: u32,
    ) -> Result<Option<String>, NoProxiesAvailable> {
        match self
            .retrieve(url, max_retries, self.settings.request_timeout)
            .await?
        {
            Retrieval::Delivered(response) => Ok(Some(response.text())),
            Retrieval::Challenged | Retrieval::Failed => Ok(None),
        }
    }

    /// Downloads a PDF to `destination`
    ///
    /// A file exists at `destination` if and only if this returns `Ok(true)`.
    /// The body is written to a `.part` sibling and renamed into place, and the
    /// partial file is removed on any write failure. A file left at
    /// `destination` by an earlier run is removed before the request is made.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - PDF saved
    /// * `Ok(false)` - Retrieval failed, response was not a PDF, or the write failed
    /// * `Err(NoProxiesAvailable)` - No proxy could be bound for the first attempt
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<bool, NoProxiesAvailable> {
        if let Err(e) = remove_stale(destination).await {
            tracing::warn!(path = %destination.display(), "Cannot replace existing file: {}", e);
            return Ok(false);
        }

        let response = match self
            .retrieve(url, self.settings.max_retries, self.settings.download_timeout)
            .await?
        {
            Retrieval::Delivered(response) => response,
            Retrieval::Challenged | Retrieval::Failed => return Ok(false),
        };

        if !is_pdf(&response) {
            tracing::debug!(
                url = %url,
                content_type = ?response.content_type,
                "Download skipped, response is not a PDF"
            );
            return Ok(false);
        }

        match write_atomically(destination, &response.body).await {
            Ok(()) => {
                self.metrics.record_pdf();
                tracing::info!(path = %destination.display(), "Downloaded PDF");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(path = %destination.display(), "Failed to save PDF: {}", e);
                Ok(false)
            }
        }
    }

    /// Rolling requests per second over recent successful fetches
    pub fn requests_per_second(&self) -> f64 {
        self.throughput
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .requests_per_second()
    }

    /// Estimated time to complete `remaining` more fetches
    pub fn estimated_time_remaining(&self, remaining: usize) -> Option<Duration> {
        self.throughput
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .estimated_time_remaining(remaining)
    }

    async fn retrieve(
        &self,
        url: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Retrieval, NoProxiesAvailable> {
        let mut binding = self.pool.acquire(None).await?;
        let attempts = max_retries.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                binding = match self.pool.acquire(binding.as_ref()).await {
                    Ok(binding) => binding,
                    Err(e) => {
                        tracing::warn!(url = %url, "Lost proxy binding mid-fetch: {}", e);
                        self.metrics.record_failure();
                        return Ok(Retrieval::Failed);
                    }
                };
            }

            tokio::time::sleep(random_between(self.settings.min_delay, self.settings.max_delay))
                .await;

            let proxy = binding.as_ref().map(ProxyBinding::address);
            let request = TransportRequest {
                url,
                proxy,
                user_agent: self.user_agents.random(),
                timeout,
            };

            let started = Instant::now();
            let outcome = self.transport.get(&request).await;
            let elapsed = started.elapsed();

            let kind = match outcome {
                Ok(response) if response.is_success() => {
                    if !is_pdf(&response) && self.detector.is_challenge(&response.text()) {
                        self.handle_challenge(url, proxy).await;
                        return Ok(Retrieval::Challenged);
                    }

                    if let Some(address) = proxy {
                        self.pool.report_success(address, elapsed);
                    }
                    self.metrics.record_success();
                    self.throughput
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record(elapsed);

                    tracing::debug!(url = %url, attempt, elapsed_ms = elapsed.as_millis() as u64, "Fetched");
                    return Ok(Retrieval::Delivered(response));
                }
                Ok(response) => classify_status(response.status),
                Err(e) => classify_error(&e),
            };

            if let Some(address) = proxy {
                self.pool.report_failure(address, kind);
            }
            tracing::debug!(
                url = %url,
                proxy = proxy.unwrap_or("direct"),
                attempt,
                kind = %kind,
                "Fetch attempt failed"
            );

            if attempt == attempts {
                if let Some(address) = proxy {
                    self.pool.evict(address);
                    self.transport.release(address);
                }
                self.metrics.record_failure();
                tracing::warn!(url = %url, "Giving up after {} attempts", attempts);
                return Ok(Retrieval::Failed);
            }

            tokio::time::sleep(random_between(
                self.settings.retry_backoff_min,
                self.settings.retry_backoff_max,
            ))
            .await;
        }

        Ok(Retrieval::Failed)
    }

    async fn handle_challenge(&self, url: &str, proxy: Option<&str>) {
        tracing::warn!(url = %url, proxy = proxy.unwrap_or("direct"), "Challenge page detected");
        self.metrics.record_challenge();
        self.metrics.record_failure();

        if let Some(address) = proxy {
            self.pool.report_failure(address, FailureKind::Challenge);
            self.pool.evict(address);
            self.transport.release(address);
        }

        if let Err(e) = self.pool.refresh().await {
            tracing::warn!("Pool refresh after challenge failed: {}", e);
        }
    }
}

fn classify_status(status: u16) -> FailureKind {
    match status {
        403 | 407 | 429 => FailureKind::Forbidden,
        _ => FailureKind::Other,
    }
}

fn classify_error(error: &TransportError) -> FailureKind {
    match error {
        TransportError::Connection(_) => FailureKind::Connection,
        TransportError::Timeout => FailureKind::Timeout,
        TransportError::Other(_) => FailureKind::Other,
    }
}

fn is_pdf(response: &TransportResponse) -> bool {
    response
        .content_type
        .as_deref()
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

async fn remove_stale(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn write_atomically(destination: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut partial = destination.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let result = async {
        tokio::fs::write(&partial, body).await?;
        tokio::fs::rename(&partial, destination).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}
