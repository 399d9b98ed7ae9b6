use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Run-wide counters shared by the pool, the orchestrator and the controller
///
/// One instance is created per run and handed to each component through an
/// `Arc`; callers read it with [`CrawlMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct CrawlMetrics {
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    challenges: AtomicU64,
    proxies_evicted: AtomicU64,
    pdfs_downloaded: AtomicU64,
    pages_fetched: AtomicU64,
    frontier_expanded: AtomicU64,
    proxies_used: Mutex<HashSet<String>>,
}

/// Point-in-time copy of [`CrawlMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub challenges: u64,
    pub proxies_evicted: u64,
    pub pdfs_downloaded: u64,
    pub pages_fetched: u64,
    pub frontier_expanded: u64,
    pub proxies_used: usize,
}

impl MetricsSnapshot {
    /// Total logical requests that reached a conclusion
    pub fn total_requests(&self) -> u64 {
        self.successful_requests + self.failed_requests
    }

    /// Percentage of requests that succeeded, 0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.successful_requests as f64 / total as f64 * 100.0
        }
    }
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_challenge(&self) {
        self.challenges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.proxies_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pdf(&self) {
        self.pdfs_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expansion(&self) {
        self.frontier_expanded.fetch_add(1, Ordering::Relaxed);
    }

    /// Remembers that a proxy carried at least one request
    pub fn record_proxy_used(&self, address: &str) {
        let mut used = self
            .proxies_used
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !used.contains(address) {
            used.insert(address.to_string());
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let proxies_used = self
            .proxies_used
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len();

        MetricsSnapshot {
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            challenges: self.challenges.load(Ordering::Relaxed),
            proxies_evicted: self.proxies_evicted.load(Ordering::Relaxed),
            pdfs_downloaded: self.pdfs_downloaded.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            frontier_expanded: self.frontier_expanded.load(Ordering::Relaxed),
            proxies_used,
        }
    }
}
