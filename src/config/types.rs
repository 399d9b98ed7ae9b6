use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Scholar-Sweep
///
/// Every table and key is optional; missing values fall back to the defaults
/// below so the tool runs without a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub proxy: ProxyConfig,
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// Proxy pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// When false every request goes out directly (no relay)
    pub enabled: bool,

    /// Maximum number of validated proxies kept in the active pool
    pub num_proxies: usize,

    /// Liveness probe timeout (seconds)
    pub probe_timeout: u64,

    /// Minimum time between two non-forced refreshes (seconds)
    pub refresh_interval: u64,

    /// How long an evicted proxy stays blacklisted (seconds)
    pub blacklist_duration: u64,

    /// Where the blacklist is persisted
    pub blacklist_file: String,

    /// Endpoint fetched through each candidate during the liveness probe
    pub test_url: String,

    /// URLs returning newline-separated `host:port` candidates
    pub sources: Vec<String>,

    /// Static `host:port` candidates
    pub candidates: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_proxies: 20,
            probe_timeout: 5,
            refresh_interval: 300,
            blacklist_duration: 600,
            blacklist_file: "proxy_blacklist.json".to_string(),
            test_url: "https://scholar.google.com/".to_string(),
            sources: vec![
                "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=5000&country=all"
                    .to_string(),
            ],
            candidates: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn blacklist_duration(&self) -> Duration {
        Duration::from_secs(self.blacklist_duration)
    }
}

/// Request pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Lower bound of the pre-request jitter (milliseconds)
    pub min_delay: u64,

    /// Upper bound of the pre-request jitter (milliseconds)
    pub max_delay: u64,

    /// Lower bound of the extra backoff between retries (milliseconds)
    pub retry_backoff_min: u64,

    /// Upper bound of the extra backoff between retries (milliseconds)
    pub retry_backoff_max: u64,

    /// Attempts per logical fetch, all through the same proxy
    pub max_retries: u32,

    /// Page request timeout (seconds)
    pub request_timeout: u64,

    /// PDF download timeout (seconds)
    pub download_timeout: u64,

    /// Number of recent fetch durations kept for throughput reporting
    pub latency_window: usize,

    /// Overrides the built-in user-agent rotation list when non-empty
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_delay: 2000,
            max_delay: 5000,
            retry_backoff_min: 2000,
            retry_backoff_max: 5000,
            max_retries: 3,
            request_timeout: 10,
            download_timeout: 20,
            latency_window: 20,
            user_agents: Vec::new(),
        }
    }
}

/// Search and citation expansion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Search endpoint
    pub search_url: String,

    /// Author profile endpoint
    pub profile_url: String,

    /// Results per search page; the offset advances by this much
    pub page_size: u32,

    /// Highest offset the search service will serve
    pub max_offset: u32,

    /// Default citation expansion depth
    pub max_depth: u32,

    /// Upper bound on simultaneous fetches within one depth level
    pub max_concurrent_expansions: usize,

    /// Open-access lookup endpoint used to resolve PDFs from DOIs
    pub unpaywall_url: String,

    /// Contact email sent with open-access lookups
    pub unpaywall_email: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            search_url: "https://scholar.google.com/scholar".to_string(),
            profile_url: "https://scholar.google.com/citations".to_string(),
            page_size: 10,
            max_offset: 990,
            max_depth: 3,
            max_concurrent_expansions: 8,
            unpaywall_url: "https://api.unpaywall.org/v2".to_string(),
            unpaywall_email: "unpaywall@impactstory.org".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite results database
    pub database_path: String,

    /// Directory receiving downloaded PDFs
    pub pdf_dir: String,

    /// Path of the GraphML citation graph
    pub graph_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "scholar_data.db".to_string(),
            pdf_dir: "pdfs".to_string(),
            graph_path: "citation_graph.graphml".to_string(),
        }
    }
}

/// Per-invocation parameters checked before any network activity
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub query: Option<String>,
    pub author_profile: Option<String>,
    pub num_results: i64,
    pub max_depth: i64,
    pub year_low: Option<i32>,
    pub year_high: Option<i32>,
}
