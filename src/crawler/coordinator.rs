//! Crawl controller - paginated search plus leveled citation expansion
//!
//! This module drives a whole crawl:
//! - Walking search result pages until the requested count is reached
//! - Skipping results the store already holds
//! - Resolving and downloading PDFs for new results
//! - Persisting results and registering them with the citation graph
//! - Expanding cited-by pages one depth level at a time
//!
//! Pages that fail to fetch or parse are skipped. Running out of proxies in
//! the middle of a search ends the crawl with whatever was collected.

use crate::config::CrawlConfig;
use crate::crawler::enrich::{pdf_filename, PdfResolver};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::query::{profile_url, SearchQuery};
use crate::fetch::FetchOrchestrator;
use crate::graph::{GraphSink, PaperRef};
use crate::parser::{AuthorProfile, ProfileParser, ResultParser, ScrapeResult};
use crate::state::CrawlMetrics;
use crate::storage::{ResultStore, RunStatus};
use crate::{ConfigError, SweepError};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Controller settings resolved from [`CrawlConfig`]
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub search_url: Url,
    pub profile_url: Url,
    pub page_size: u32,
    pub max_offset: u32,
    pub max_concurrent_expansions: usize,
    /// Recorded with every run
    pub config_hash: String,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlConfig, config_hash: &str) -> Result<Self, ConfigError> {
        let parse = |name: &str, value: &str| {
            Url::parse(value)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))
        };

        Ok(Self {
            search_url: parse("search-url", &config.search_url)?,
            profile_url: parse("profile-url", &config.profile_url)?,
            page_size: config.page_size.max(1),
            max_offset: config.max_offset,
            max_concurrent_expansions: config.max_concurrent_expansions.max(1),
            config_hash: config_hash.to_string(),
        })
    }
}

/// One search crawl
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub query: SearchQuery,
    /// Upper bound on returned results
    pub num_results: usize,
    /// How many cited-by levels to follow; 0 disables expansion
    pub max_depth: u32,
    /// Where to store PDFs; `None` skips PDF enrichment
    pub pdf_dir: Option<PathBuf>,
}

/// Results of a search crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Newly stored results, in page order
    pub results: Vec<ScrapeResult>,
    /// True when the proxy pool ran dry before the target was met
    pub stopped_early: bool,
}

/// Results of a profile crawl
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub profile: AuthorProfile,
    /// Results parsed from the publication pages when crawling recursively
    pub results: Vec<ScrapeResult>,
}

/// Drives search and profile crawls
pub struct CrawlController {
    settings: CrawlSettings,
    orchestrator: Arc<FetchOrchestrator>,
    parser: Arc<dyn ResultParser>,
    profile_parser: ProfileParser,
    storage: Box<dyn ResultStore + Send>,
    resolver: Option<Arc<dyn PdfResolver>>,
    metrics: Arc<CrawlMetrics>,
}

impl CrawlController {
    pub fn new(
        settings: CrawlSettings,
        orchestrator: Arc<FetchOrchestrator>,
        parser: Arc<dyn ResultParser>,
        profile_parser: ProfileParser,
        storage: Box<dyn ResultStore + Send>,
    ) -> Self {
        let metrics = orchestrator.metrics().clone();
        Self {
            settings,
            orchestrator,
            parser,
            profile_parser,
            storage,
            resolver: None,
            metrics,
        }
    }

    /// Enables PDF enrichment through `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn PdfResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn orchestrator(&self) -> &Arc<FetchOrchestrator> {
        &self.orchestrator
    }

    pub fn storage(&self) -> &dyn ResultStore {
        self.storage.as_ref()
    }

    /// Runs a search crawl, recording it as a run in the store
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - At most `num_results` newly stored results
    /// * `Err(SweepError::Cancelled)` - `cancel` fired
    /// * `Err(SweepError)` - The store failed
    pub async fn crawl(
        &mut self,
        request: &CrawlRequest,
        graph: &mut dyn GraphSink,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, SweepError> {
        let run_id = self
            .storage
            .start_run(&self.settings.config_hash, &request.query.terms())?;
        tracing::info!(
            run_id,
            query = %request.query.terms(),
            target = request.num_results,
            max_depth = request.max_depth,
            "Starting crawl"
        );

        let outcome = self.run_search(request, graph, cancel).await;

        let (status, collected) = match &outcome {
            Ok(o) if o.stopped_early => (RunStatus::Partial, o.results.len()),
            Ok(o) => (RunStatus::Completed, o.results.len()),
            Err(SweepError::Cancelled) => (RunStatus::Interrupted, 0),
            Err(_) => (RunStatus::Failed, 0),
        };
        if let Err(e) = self.storage.finish_run(run_id, status, collected) {
            tracing::warn!(run_id, "Failed to record run status: {}", e);
        }

        outcome
    }

    async fn run_search(
        &mut self,
        request: &CrawlRequest,
        graph: &mut dyn GraphSink,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, SweepError> {
        let mut outcome = CrawlOutcome::default();
        let mut frontier = Frontier::new();
        let mut offset = 0u32;
        let start = Instant::now();

        while outcome.results.len() < request.num_results {
            if offset > self.settings.max_offset {
                tracing::info!(offset, "Reached the last page the search service serves");
                break;
            }
            if cancel.is_cancelled() {
                return Err(SweepError::Cancelled);
            }

            let url = request.query.search_url(&self.settings.search_url, offset);
            tracing::debug!(offset, "Fetching results page {}", url);

            let body = match self.orchestrator.fetch(url.as_str()).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    tracing::warn!(offset, "Results page failed, moving to the next one");
                    offset += self.settings.page_size;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        collected = outcome.results.len(),
                        "Stopping crawl early: {}",
                        e
                    );
                    outcome.stopped_early = true;
                    break;
                }
            };
            self.metrics.record_page();

            let parsed = match self.parser.parse(&body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(offset, "Could not parse results page: {}", e);
                    offset += self.settings.page_size;
                    continue;
                }
            };
            let has_next = self.parser.next_page_link(&body).is_some();

            for result in parsed {
                if outcome.results.len() >= request.num_results {
                    break;
                }
                if let Some(result) = self
                    .accept(result, request, graph, &mut frontier)
                    .await?
                {
                    outcome.results.push(result);
                }
            }

            self.expand_frontier(&mut frontier, request.max_depth, graph, cancel)
                .await?;

            let remaining = request.num_results.saturating_sub(outcome.results.len());
            let pages_left = remaining.div_ceil(self.settings.page_size as usize);
            tracing::info!(
                "Progress: {}/{} results, {:.2} req/s, ETA {}",
                outcome.results.len(),
                request.num_results,
                self.orchestrator.requests_per_second(),
                self.orchestrator
                    .estimated_time_remaining(pages_left)
                    .map(|eta| format!("{}s", eta.as_secs()))
                    .unwrap_or_else(|| "unknown".to_string())
            );

            if !has_next {
                tracing::info!(offset, "No further results pages");
                break;
            }
            offset += self.settings.page_size;
        }

        tracing::info!(
            "Crawl finished: {} results in {:?}",
            outcome.results.len(),
            start.elapsed()
        );
        Ok(outcome)
    }

    /// Dedups, enriches, stores and graphs one top-level result
    ///
    /// Returns `None` when the store already held it.
    async fn accept(
        &mut self,
        result: ScrapeResult,
        request: &CrawlRequest,
        graph: &mut dyn GraphSink,
        frontier: &mut Frontier,
    ) -> Result<Option<ScrapeResult>, SweepError> {
        if let Some(url) = result.canonical_url() {
            if self.storage.exists(url)? {
                tracing::debug!(url = %url, "Already stored, skipping");
                return Ok(None);
            }
        }

        let result = self.enrich(result, request.pdf_dir.as_deref()).await;
        self.storage.insert(&result)?;

        if let Some(paper) = PaperRef::from_result(&result) {
            graph.add_paper(&paper);
            if request.max_depth > 0 {
                if let Some(cited_by) = &result.cited_by_url {
                    frontier.push(FrontierEntry {
                        url: cited_by.clone(),
                        depth: 1,
                        parent: Some(paper),
                    });
                }
            }
        }

        Ok(Some(result))
    }

    /// Downloads an open-access PDF for the result when one can be found
    async fn enrich(&self, mut result: ScrapeResult, pdf_dir: Option<&Path>) -> ScrapeResult {
        let (Some(resolver), Some(dir), Some(doi)) = (&self.resolver, pdf_dir, result.doi.clone())
        else {
            return result;
        };

        let Some(pdf_url) = resolver.resolve(&doi).await else {
            tracing::debug!(doi = %doi, "No open-access PDF found");
            return result;
        };

        let path = dir.join(pdf_filename(result.title.as_deref(), result.year));
        match self.orchestrator.download(&pdf_url, &path).await {
            Ok(true) => {
                result.pdf_url = Some(pdf_url);
                result.pdf_path = Some(path.display().to_string());
            }
            Ok(false) => tracing::debug!(url = %pdf_url, "PDF download failed"),
            Err(e) => tracing::warn!(url = %pdf_url, "PDF download skipped: {}", e),
        }
        result
    }

    /// Expands the frontier level by level until it is empty
    ///
    /// Every entry of a level is fetched concurrently and the whole level
    /// completes before the next one starts.
    async fn expand_frontier(
        &self,
        frontier: &mut Frontier,
        max_depth: u32,
        graph: &mut dyn GraphSink,
        cancel: &CancellationToken,
    ) -> Result<(), SweepError> {
        loop {
            let level = frontier.drain_level();
            let Some(depth) = level.first().map(|e| e.depth) else {
                return Ok(());
            };
            tracing::info!(depth, entries = level.len(), "Expanding citation frontier");

            let fan_out = stream::iter(level.into_iter().map(|entry| async move {
                let results = self.expand_entry(&entry).await;
                (entry, results)
            }))
            .buffer_unordered(self.settings.max_concurrent_expansions)
            .collect::<Vec<_>>();

            let expanded = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SweepError::Cancelled),
                expanded = fan_out => expanded,
            };

            for (entry, results) in expanded {
                for result in results {
                    let Some(paper) = PaperRef::from_result(&result) else {
                        continue;
                    };
                    match &entry.parent {
                        Some(parent) => graph.add_citation(&paper, parent),
                        None => graph.add_paper(&paper),
                    }

                    if entry.depth < max_depth {
                        if let Some(cited_by) = &result.cited_by_url {
                            frontier.push(FrontierEntry {
                                url: cited_by.clone(),
                                depth: entry.depth + 1,
                                parent: Some(paper),
                            });
                        }
                    }
                }
            }
        }
    }

    async fn expand_entry(&self, entry: &FrontierEntry) -> Vec<ScrapeResult> {
        self.metrics.record_expansion();

        match self.orchestrator.fetch(&entry.url).await {
            Ok(Some(body)) => self.parser.parse(&body).unwrap_or_else(|e| {
                tracing::debug!(url = %entry.url, "Could not parse cited-by page: {}", e);
                Vec::new()
            }),
            Ok(None) => {
                tracing::debug!(url = %entry.url, depth = entry.depth, "Cited-by page failed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(url = %entry.url, "Cited-by page skipped: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetches an author profile, optionally following every publication link
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ProfileOutcome))` - The parsed profile
    /// * `Ok(None)` - The profile page could not be retrieved
    /// * `Err(SweepError)` - No proxies, unparseable profile, or cancellation
    pub async fn crawl_profile(
        &mut self,
        author_id: &str,
        recursive: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<ProfileOutcome>, SweepError> {
        let url = profile_url(&self.settings.profile_url, author_id);
        let run_id = self
            .storage
            .start_run(&self.settings.config_hash, &format!("profile:{}", author_id))?;

        let outcome = self.run_profile(url, recursive, cancel).await;

        let (status, collected) = match &outcome {
            Ok(Some(o)) => (RunStatus::Completed, o.results.len()),
            Ok(None) => (RunStatus::Failed, 0),
            Err(SweepError::Cancelled) => (RunStatus::Interrupted, 0),
            Err(_) => (RunStatus::Failed, 0),
        };
        if let Err(e) = self.storage.finish_run(run_id, status, collected) {
            tracing::warn!(run_id, "Failed to record run status: {}", e);
        }

        outcome
    }

    async fn run_profile(
        &mut self,
        url: Url,
        recursive: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<ProfileOutcome>, SweepError> {
        tracing::info!("Fetching author profile {}", url);

        let Some(body) = self.orchestrator.fetch(url.as_str()).await? else {
            tracing::error!("Could not retrieve author profile {}", url);
            return Ok(None);
        };
        self.metrics.record_page();

        let profile = self.profile_parser.parse_profile(&body)?;
        tracing::info!(
            name = profile.name.as_deref().unwrap_or("unknown"),
            publications = profile.publications.len(),
            "Parsed author profile"
        );

        let mut results = Vec::new();
        if recursive {
            let links: Vec<String> = profile
                .publications
                .iter()
                .filter_map(|p| p.article_url.clone())
                .collect();

            for link in links {
                if cancel.is_cancelled() {
                    return Err(SweepError::Cancelled);
                }

                let body = match self.orchestrator.fetch(&link).await {
                    Ok(Some(body)) => body,
                    Ok(None) => {
                        tracing::warn!(url = %link, "Publication page failed");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Stopping profile expansion early: {}", e);
                        break;
                    }
                };
                self.metrics.record_page();

                for result in self.parser.parse(&body).unwrap_or_default() {
                    if let Some(url) = result.canonical_url() {
                        if self.storage.exists(url)? {
                            continue;
                        }
                    }
                    self.storage.insert(&result)?;
                    results.push(result);
                }
            }
        }

        Ok(Some(ProfileOutcome { profile, results }))
    }
}
