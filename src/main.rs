//! Scholar-Sweep main entry point
//!
//! This is the command-line interface for the Scholar-Sweep citation crawler.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use scholar_sweep::config::{
    load_config_with_hash, validate, validate_run_request, Config, RunRequest,
};
use scholar_sweep::crawler::{build_controller, CrawlController, CrawlRequest, SearchQuery};
use scholar_sweep::graph::write_graphml;
use scholar_sweep::output::{export_profile, export_results, print_statistics, RunSummary};
use scholar_sweep::storage::open_storage;
use scholar_sweep::{CitationGraph, ScrapeResult, SweepError};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Scholar-Sweep: a proxy-routed citation crawler
///
/// Searches an academic search service through a rotating pool of proxies,
/// follows cited-by links to a bounded depth and exports what it finds.
#[derive(Parser, Debug)]
#[command(name = "scholar-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A proxy-routed citation crawler", long_about = None)]
struct Cli {
    /// Search query
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Restrict results to these authors
    #[arg(long)]
    authors: Option<String>,

    /// Restrict results to this publication
    #[arg(long)]
    publication: Option<String>,

    /// Earliest publication year
    #[arg(long, allow_negative_numbers = true)]
    year_low: Option<i32>,

    /// Latest publication year
    #[arg(long, allow_negative_numbers = true)]
    year_high: Option<i32>,

    /// Exact phrase that must appear
    #[arg(long)]
    phrase: Option<String>,

    /// Comma-separated terms that must not appear
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Words that must appear in the title
    #[arg(long)]
    title: Option<String>,

    /// Author operator
    #[arg(long)]
    author: Option<String>,

    /// Source (venue) operator
    #[arg(long)]
    source: Option<String>,

    /// Number of results to collect
    #[arg(short = 'n', long, default_value_t = 10, allow_negative_numbers = true)]
    num_results: i64,

    /// Output file
    #[arg(short, long, default_value = "results.csv")]
    output: PathBuf,

    /// Write JSON instead of CSV
    #[arg(long)]
    json: bool,

    /// Directory for downloaded PDFs (defaults to the configured one)
    #[arg(long)]
    pdf_dir: Option<PathBuf>,

    /// Cited-by levels to follow (defaults to the configured depth)
    #[arg(long, allow_negative_numbers = true)]
    max_depth: Option<i64>,

    /// Drop results with fewer citations than this before export
    #[arg(long, default_value_t = 0)]
    min_citations: u32,

    /// Fetch this author profile instead of searching
    #[arg(long, value_name = "ID")]
    author_profile: Option<String>,

    /// With --author-profile, also fetch every publication page
    #[arg(long)]
    recursive: bool,

    /// GraphML output for the citation graph (defaults to the configured path)
    #[arg(long)]
    graph_file: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Connect directly instead of through proxies
    #[arg(long)]
    direct: bool,
}

impl Cli {
    fn run_request(&self) -> RunRequest {
        RunRequest {
            query: self.query.clone(),
            author_profile: self.author_profile.clone(),
            num_results: self.num_results,
            max_depth: self.max_depth.unwrap_or(0),
            year_low: self.year_low,
            year_high: self.year_high,
        }
    }

    fn search_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.query.clone().unwrap_or_default(),
            authors: self.authors.clone(),
            publication: self.publication.clone(),
            year_low: self.year_low,
            year_high: self.year_high,
            phrase: self.phrase.clone(),
            exclude: self.exclude.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            source: self.source.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reject bad invocations before touching the network
    if let Err(e) = validate_run_request(&cli.run_request()) {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }

    setup_logging(&cli.log_level);

    let (mut config, config_hash) = load_configuration(cli.config.as_deref())?;
    if cli.direct {
        tracing::info!("Direct mode: proxies disabled");
        config.proxy.enabled = false;
    }

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open results database")?;
    let mut controller = build_controller(&config, &config_hash, Box::new(storage))?;

    let pool = controller.orchestrator().pool().clone();
    if pool.is_enabled() {
        let proxies = pool
            .refresh()
            .await
            .context("Cannot start without at least one working proxy")?;
        tracing::info!("Proxy pool ready with {} proxies", proxies.len());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        });
    }

    let started = Instant::now();
    let mut graph = CitationGraph::new();
    let outcome = match &cli.author_profile {
        Some(author_id) => handle_profile(&cli, &mut controller, author_id, &cancel).await,
        None => handle_search(&cli, &config, &mut controller, &mut graph, &cancel).await,
    };
    let (results_collected, stopped_early) = match outcome {
        Ok(summary) => summary,
        Err(SweepError::Cancelled) => {
            pool.log_performance();
            anyhow::bail!("Crawl interrupted");
        }
        Err(e) => return Err(e.into()),
    };

    if cli.author_profile.is_none() {
        let graph_path = cli
            .graph_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.graph_path));
        write_graphml(&graph, &graph_path).context("Failed to write citation graph")?;
    }

    print_statistics(
        &controller.orchestrator().metrics().snapshot(),
        &RunSummary {
            results_collected,
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
            elapsed: started.elapsed(),
            stopped_early,
        },
    );
    pool.log_performance();

    Ok(())
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` takes precedence over `--log-level`.
fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scholar_sweep={},warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, hash))
        }
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok((config, "default".to_string()))
        }
    }
}

/// Runs a search crawl and exports its results
async fn handle_search(
    cli: &Cli,
    config: &Config,
    controller: &mut CrawlController,
    graph: &mut CitationGraph,
    cancel: &CancellationToken,
) -> Result<(usize, bool), SweepError> {
    let pdf_dir = cli
        .pdf_dir
        .clone()
        .or_else(|| (!config.output.pdf_dir.is_empty()).then(|| PathBuf::from(&config.output.pdf_dir)));

    let request = CrawlRequest {
        query: cli.search_query(),
        num_results: cli.num_results.max(0) as usize,
        max_depth: cli
            .max_depth
            .map_or(config.crawl.max_depth, |d| d.max(0) as u32),
        pdf_dir,
    };

    let outcome = controller.crawl(&request, graph, cancel).await?;
    if outcome.stopped_early {
        tracing::warn!("Proxy pool exhausted, returning partial results");
    }

    let results = filter_by_citations(outcome.results, cli.min_citations);
    export_results(&results, &cli.output, cli.json)?;
    println!("Saved {} results to {}", results.len(), cli.output.display());

    Ok((results.len(), outcome.stopped_early))
}

/// Fetches an author profile and exports it
async fn handle_profile(
    cli: &Cli,
    controller: &mut CrawlController,
    author_id: &str,
    cancel: &CancellationToken,
) -> Result<(usize, bool), SweepError> {
    let Some(outcome) = controller
        .crawl_profile(author_id, cli.recursive, cancel)
        .await?
    else {
        return Err(SweepError::Usage(format!(
            "could not retrieve profile '{}'",
            author_id
        )));
    };

    export_profile(&outcome.profile, &cli.output, cli.json)?;
    println!(
        "Saved profile with {} publications to {}",
        outcome.profile.publications.len(),
        cli.output.display()
    );

    let results = filter_by_citations(outcome.results, cli.min_citations);
    if cli.recursive {
        let path = sibling_path(&cli.output, "publications");
        export_results(&results, &path, cli.json)?;
        println!("Saved {} publication results to {}", results.len(), path.display());
    }

    Ok((results.len(), false))
}

fn filter_by_citations(results: Vec<ScrapeResult>, min_citations: u32) -> Vec<ScrapeResult> {
    results
        .into_iter()
        .filter(|r| r.cited_by_count >= min_citations)
        .collect()
}

/// `results.csv` -> `results_publications.csv`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(name)
}
