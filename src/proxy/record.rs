use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Classification of a failed attempt through a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Connection,
    Timeout,
    Challenge,
    Forbidden,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Connection => "connection",
            FailureKind::Timeout => "timeout",
            FailureKind::Challenge => "challenge",
            FailureKind::Forbidden => "forbidden",
            FailureKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Membership status of a known proxy address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProxyStatus {
    Active,
    Blacklisted,
}

/// Per-address performance counters
///
/// Counters survive a refresh: an address that drops out of the pool and is
/// later re-validated keeps its history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProxyStats {
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub challenge_hits: u64,
    pub connection_errors: u64,
    pub forbidden: u64,
    pub last_latency: Option<Duration>,
    pub request_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ProxyStats {
    /// Increments the counter matching `kind` and the aggregate failure counter
    pub fn record_failure(&mut self, kind: FailureKind) {
        self.failures += 1;
        match kind {
            FailureKind::Connection => self.connection_errors += 1,
            FailureKind::Timeout => self.timeouts += 1,
            FailureKind::Challenge => self.challenge_hits += 1,
            FailureKind::Forbidden => self.forbidden += 1,
            FailureKind::Other => {}
        }
    }

    pub fn record_success(&mut self, latency: Duration) {
        self.successes += 1;
        self.last_latency = Some(latency);
    }

    /// Marks the proxy as handed out for a request
    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.request_count += 1;
        self.last_used_at = Some(now);
    }

    /// Percentage of reported outcomes that were successes
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            0.0
        } else {
            self.successes as f64 / total as f64 * 100.0
        }
    }
}

/// Snapshot of one proxy as seen by the pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRecord {
    pub address: String,
    pub status: ProxyStatus,
    pub blacklist_expires_at: Option<DateTime<Utc>>,
    pub stats: ProxyStats,
}

/// Association between one logical fetch and the proxy serving it
///
/// Returned by `ProxyPool::acquire` and threaded through the retry loop by
/// the caller; it is never stored inside the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyBinding {
    address: String,
}

impl ProxyBinding {
    pub(crate) fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for ProxyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
