//! Crawler module for search traversal and citation expansion
//!
//! This module contains the core crawling logic, including:
//! - Search query and URL construction
//! - The leveled, deduplicated citation frontier
//! - PDF resolution for results carrying a DOI
//! - Overall crawl coordination

mod coordinator;
mod enrich;
mod frontier;
mod query;

pub use coordinator::{CrawlController, CrawlOutcome, CrawlRequest, CrawlSettings, ProfileOutcome};
pub use enrich::{find_pdf_link, pdf_filename, PdfResolver, UnpaywallResolver};
pub use frontier::{Frontier, FrontierEntry};
pub use query::{profile_url, SearchQuery};

use crate::config::Config;
use crate::fetch::{
    FetchOrchestrator, FetchSettings, RegexChallengeDetector, ReqwestTransport, UserAgentPool,
};
use crate::parser::{ProfileParser, ScholarParser};
use crate::proxy::{
    CandidateProvider, ChainedProvider, ListUrlProvider, PoolSettings, ProxyPool,
    StaticCandidates, TunnelProber,
};
use crate::state::CrawlMetrics;
use crate::storage::ResultStore;
use crate::{ParseError, SweepError};
use std::sync::Arc;
use std::time::Duration;

/// Builds the proxy pool described by the configuration
///
/// Configured candidates are tried alongside the list sources.
pub fn build_pool(config: &Config, metrics: Arc<CrawlMetrics>) -> Result<ProxyPool, SweepError> {
    let proxy = &config.proxy;

    let mut providers: Vec<Arc<dyn CandidateProvider>> = Vec::new();
    if !proxy.candidates.is_empty() {
        providers.push(Arc::new(StaticCandidates::new(proxy.candidates.clone())));
    }
    if !proxy.sources.is_empty() {
        providers.push(Arc::new(ListUrlProvider::new(
            proxy.sources.clone(),
            Duration::from_secs(config.fetch.request_timeout),
        )?));
    }

    Ok(ProxyPool::new(
        PoolSettings::from_config(proxy),
        Arc::new(ChainedProvider::new(providers)),
        Arc::new(TunnelProber::new(&proxy.test_url, proxy.probe_timeout())),
        metrics,
    ))
}

/// Wires the pool, orchestrator, parsers and storage into a controller
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_hash` - Hash recorded with every run
/// * `storage` - Result store the controller dedups against
pub fn build_controller(
    config: &Config,
    config_hash: &str,
    storage: Box<dyn ResultStore + Send>,
) -> Result<CrawlController, SweepError> {
    let metrics = Arc::new(CrawlMetrics::new());
    let pool = Arc::new(build_pool(config, metrics.clone())?);

    let detector =
        RegexChallengeDetector::new().map_err(|e| ParseError::Selector(e.to_string()))?;
    let orchestrator = Arc::new(FetchOrchestrator::new(
        pool,
        Arc::new(ReqwestTransport::new()),
        Arc::new(detector),
        UserAgentPool::new(config.fetch.user_agents.clone()),
        FetchSettings::from_config(&config.fetch),
        metrics,
    ));

    let settings = CrawlSettings::from_config(&config.crawl, config_hash)?;
    let parser = ScholarParser::new(settings.search_url.clone())?;
    let profile_parser = ProfileParser::new(settings.profile_url.clone())?;

    let mut controller =
        CrawlController::new(settings, orchestrator, Arc::new(parser), profile_parser, storage);

    if !config.crawl.unpaywall_url.is_empty() {
        let resolver = UnpaywallResolver::new(
            &config.crawl.unpaywall_url,
            &config.crawl.unpaywall_email,
            Duration::from_secs(config.fetch.request_timeout),
        )?;
        controller = controller.with_resolver(Arc::new(resolver));
    }

    Ok(controller)
}
