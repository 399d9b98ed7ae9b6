//! Proxy pool - the sole authority over proxy health state
//!
//! The pool keeps a bounded set of validated relay addresses, per-address
//! performance counters and a durable, time-limited blacklist. Every mutation
//! goes through one `std::sync::Mutex`, which is never held across an await.
//! Refreshes are additionally serialized by an async gate so concurrent
//! callers that find the pool empty trigger one probe round, not many.

use crate::config::ProxyConfig;
use crate::proxy::blacklist::Blacklist;
use crate::proxy::probe::Prober;
use crate::proxy::provider::CandidateProvider;
use crate::proxy::record::{FailureKind, ProxyBinding, ProxyRecord, ProxyStats, ProxyStatus};
use crate::state::CrawlMetrics;
use crate::NoProxiesAvailable;
use chrono::Utc;
use futures::future::join_all;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Tunables for a [`ProxyPool`]
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// When false the pool hands out no proxy and callers connect directly
    pub enabled: bool,
    pub num_proxies: usize,
    pub refresh_interval: Duration,
    pub blacklist_duration: Duration,
    /// Where the blacklist is persisted; `None` keeps it in memory only
    pub blacklist_file: Option<PathBuf>,
}

impl PoolSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            enabled: config.enabled,
            num_proxies: config.num_proxies,
            refresh_interval: config.refresh_interval(),
            blacklist_duration: config.blacklist_duration(),
            blacklist_file: Some(PathBuf::from(&config.blacklist_file)),
        }
    }
}

struct PoolState {
    active: Vec<String>,
    stats: HashMap<String, ProxyStats>,
    blacklist: Blacklist,
    last_refresh_at: Option<Instant>,
}

pub struct ProxyPool {
    settings: PoolSettings,
    provider: Arc<dyn CandidateProvider>,
    prober: Arc<dyn Prober>,
    metrics: Arc<CrawlMetrics>,
    state: Mutex<PoolState>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl ProxyPool {
    /// Creates an empty pool, loading the persisted blacklist if configured
    ///
    /// No network activity happens here; call [`ProxyPool::refresh`] to
    /// populate the pool.
    pub fn new(
        settings: PoolSettings,
        provider: Arc<dyn CandidateProvider>,
        prober: Arc<dyn Prober>,
        metrics: Arc<CrawlMetrics>,
    ) -> Self {
        let blacklist = match &settings.blacklist_file {
            Some(path) => Blacklist::load(path, settings.blacklist_duration, Utc::now()),
            None => Blacklist::new(settings.blacklist_duration),
        };

        if !blacklist.is_empty() {
            tracing::info!("Loaded {} blacklisted proxies", blacklist.len());
        }

        Self {
            settings,
            provider,
            prober,
            metrics,
            state: Mutex::new(PoolState {
                active: Vec::new(),
                stats: HashMap::new(),
                blacklist,
                last_refresh_at: None,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the pool routes traffic through proxies at all
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Repopulates the active set unless a recent refresh is still valid
    ///
    /// Returns the active addresses. Within `refresh_interval` of the last
    /// refresh, and while the pool is non-empty, this returns the cached set
    /// without contacting the provider.
    ///
    /// # Errors
    ///
    /// `NoProxiesAvailable` when the provider yields nothing or no candidate
    /// passes the liveness probe.
    pub async fn refresh(&self) -> Result<Vec<String>, NoProxiesAvailable> {
        self.refresh_inner(false).await
    }

    /// Repopulates the active set regardless of when it was last refreshed
    pub async fn force_refresh(&self) -> Result<Vec<String>, NoProxiesAvailable> {
        self.refresh_inner(true).await
    }

    async fn refresh_inner(&self, force: bool) -> Result<Vec<String>, NoProxiesAvailable> {
        if !self.settings.enabled {
            return Ok(Vec::new());
        }

        let _gate = self.refresh_gate.lock().await;

        if !force {
            let state = self.lock_state();
            if let Some(at) = state.last_refresh_at {
                if !state.active.is_empty() && at.elapsed() < self.settings.refresh_interval {
                    tracing::debug!("Proxy pool refreshed recently, reusing {} proxies", state.active.len());
                    return Ok(state.active.clone());
                }
            }
        }

        let raw = self.provider.candidates().await.map_err(|e| {
            tracing::warn!("Candidate provider failed: {}", e);
            NoProxiesAvailable::new(format!("candidate provider failed: {}", e))
        })?;

        if raw.is_empty() {
            return Err(NoProxiesAvailable::new(
                "candidate provider returned no addresses",
            ));
        }

        let candidates: Vec<String> = {
            let mut state = self.lock_state();
            let now = Utc::now();
            state.blacklist.prune(now);

            let mut seen = HashSet::new();
            raw.into_iter()
                .filter(|addr| seen.insert(addr.clone()))
                .filter(|addr| !state.blacklist.contains(addr, now))
                .collect()
        };

        if candidates.is_empty() {
            return Err(NoProxiesAvailable::new("every candidate is blacklisted"));
        }

        tracing::info!("Probing {} proxy candidates", candidates.len());

        let probes = candidates.iter().map(|address| async move {
            let outcome = self.prober.probe(address).await;
            (address, outcome)
        });
        let outcomes = join_all(probes).await;

        let mut state = self.lock_state();
        let now = Utc::now();
        let mut survivors = Vec::new();

        for (address, outcome) in outcomes {
            match outcome {
                Ok(latency) => {
                    // An eviction may have landed while the probes were running
                    if state.blacklist.contains(address, now) {
                        continue;
                    }
                    if survivors.len() < self.settings.num_proxies {
                        state.stats.entry(address.clone()).or_default().last_latency =
                            Some(latency);
                        survivors.push(address.clone());
                    }
                }
                Err(e) => {
                    tracing::debug!(proxy = %address, "Liveness probe failed: {}", e);
                }
            }
        }

        tracing::info!(
            "Proxy pool refreshed: {} of {} candidates alive",
            survivors.len(),
            candidates.len()
        );

        state.active = survivors;
        state.last_refresh_at = Some(Instant::now());

        if state.active.is_empty() {
            return Err(NoProxiesAvailable::new(
                "no candidate passed the liveness probe",
            ));
        }

        Ok(state.active.clone())
    }

    /// Hands out a proxy for one logical fetch
    ///
    /// # Arguments
    ///
    /// * `existing` - The caller's current binding, reused if still active
    ///
    /// # Returns
    ///
    /// * `Ok(Some(binding))` - A proxy to route through
    /// * `Ok(None)` - Proxies are disabled; connect directly
    /// * `Err(NoProxiesAvailable)` - The pool stayed empty after a refresh and a forced refresh
    pub async fn acquire(
        &self,
        existing: Option<&ProxyBinding>,
    ) -> Result<Option<ProxyBinding>, NoProxiesAvailable> {
        if !self.settings.enabled {
            return Ok(None);
        }

        if let Some(binding) = self.try_acquire(existing) {
            return Ok(Some(binding));
        }

        tracing::info!("Proxy pool is empty, refreshing");
        if let Err(e) = self.refresh().await {
            tracing::debug!("Refresh failed: {}", e);
        }
        if let Some(binding) = self.try_acquire(None) {
            return Ok(Some(binding));
        }

        tracing::warn!("Proxy pool still empty, forcing refresh");
        let last_error = self.force_refresh().await.err();
        if let Some(binding) = self.try_acquire(None) {
            return Ok(Some(binding));
        }

        Err(last_error.unwrap_or_else(|| NoProxiesAvailable::new("proxy pool is empty")))
    }

    fn try_acquire(&self, existing: Option<&ProxyBinding>) -> Option<ProxyBinding> {
        let mut state = self.lock_state();

        let address = match existing {
            Some(binding) if state.active.iter().any(|a| a == binding.address()) => {
                binding.address().to_string()
            }
            _ => state.active.choose(&mut rand::thread_rng())?.clone(),
        };

        state
            .stats
            .entry(address.clone())
            .or_default()
            .record_use(Utc::now());
        self.metrics.record_proxy_used(&address);

        Some(ProxyBinding::new(address))
    }

    /// Records a failed attempt without changing pool membership
    pub fn report_failure(&self, address: &str, kind: FailureKind) {
        let mut state = self.lock_state();
        state
            .stats
            .entry(address.to_string())
            .or_default()
            .record_failure(kind);
        tracing::debug!(proxy = %address, kind = %kind, "Proxy attempt failed");
    }

    /// Records a successful attempt and its latency
    pub fn report_success(&self, address: &str, latency: Duration) {
        let mut state = self.lock_state();
        state
            .stats
            .entry(address.to_string())
            .or_default()
            .record_success(latency);
    }

    /// Moves `address` from the active set to the blacklist and persists it
    ///
    /// Returns true when the address was active or not yet blacklisted.
    pub fn evict(&self, address: &str) -> bool {
        let (changed, snapshot) = {
            let mut state = self.lock_state();
            let now = Utc::now();

            let before = state.active.len();
            state.active.retain(|a| a != address);
            let was_active = state.active.len() != before;
            let already = state.blacklist.contains(address, now);
            state.blacklist.insert(address, now);

            (was_active || !already, state.blacklist.clone())
        };

        if changed {
            self.metrics.record_eviction();
            tracing::info!(proxy = %address, "Proxy blacklisted");
        }

        if let Some(path) = &self.settings.blacklist_file {
            if let Err(e) = snapshot.save(path) {
                tracing::warn!(path = %path.display(), "Failed to persist blacklist: {}", e);
            }
        }

        changed
    }

    /// Addresses currently in the active set
    pub fn active_addresses(&self) -> Vec<String> {
        self.lock_state().active.clone()
    }

    pub fn len(&self) -> usize {
        self.lock_state().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().active.is_empty()
    }

    pub fn is_blacklisted(&self, address: &str) -> bool {
        self.lock_state().blacklist.contains(address, Utc::now())
    }

    /// Current view of one address, if it is active or blacklisted
    pub fn record(&self, address: &str) -> Option<ProxyRecord> {
        let state = self.lock_state();
        Self::build_record(&state, address)
    }

    fn build_record(state: &PoolState, address: &str) -> Option<ProxyRecord> {
        let now = Utc::now();
        let (status, blacklist_expires_at) = if state.active.iter().any(|a| a == address) {
            (ProxyStatus::Active, None)
        } else if state.blacklist.contains(address, now) {
            (ProxyStatus::Blacklisted, state.blacklist.expires_at(address))
        } else {
            return None;
        };

        Some(ProxyRecord {
            address: address.to_string(),
            status,
            blacklist_expires_at,
            stats: state.stats.get(address).cloned().unwrap_or_default(),
        })
    }

    /// Records for every known address, best success rate first
    pub fn performance_report(&self) -> Vec<ProxyRecord> {
        let state = self.lock_state();
        let mut records: Vec<ProxyRecord> = state
            .active
            .iter()
            .map(String::as_str)
            .chain(state.blacklist.addresses())
            .filter_map(|addr| Self::build_record(&state, addr))
            .collect();

        records.sort_by(|a, b| {
            b.stats
                .success_rate()
                .total_cmp(&a.stats.success_rate())
                .then_with(|| a.address.cmp(&b.address))
        });
        records.dedup_by(|a, b| a.address == b.address);
        records
    }

    /// Logs the performance report at info level
    pub fn log_performance(&self) {
        let report = self.performance_report();
        if report.is_empty() {
            return;
        }

        tracing::info!("Proxy performance report ({} proxies)", report.len());
        for record in report {
            let stats = &record.stats;
            tracing::info!(
                proxy = %record.address,
                status = ?record.status,
                success_rate = %format_args!("{:.1}%", stats.success_rate()),
                successes = stats.successes,
                failures = stats.failures,
                timeouts = stats.timeouts,
                challenge_hits = stats.challenge_hits,
                connection_errors = stats.connection_errors,
                forbidden = stats.forbidden,
                last_latency_ms = stats.last_latency.map(|d| d.as_millis() as u64),
                requests = stats.request_count,
                last_used = ?stats.last_used_at,
                "proxy"
            );
        }
    }
}
