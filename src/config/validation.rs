use crate::config::types::{Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, RunRequest};
use crate::ConfigError;
use url::Url;

/// Earliest year accepted for year-range filters
pub const MIN_YEAR: i32 = 1000;

/// Latest year accepted for year-range filters
pub const MAX_YEAR: i32 = 2100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_proxy_config(&config.proxy)?;
    validate_fetch_config(&config.fetch)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.num_proxies == 0 {
        return Err(ConfigError::Validation(
            "num-proxies must be at least 1".to_string(),
        ));
    }

    if config.blacklist_file.is_empty() {
        return Err(ConfigError::Validation(
            "blacklist-file cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.test_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid test-url: {}", e)))?;

    for source in &config.sources {
        Url::parse(source).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid proxy source '{}': {}", source, e))
        })?;
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.min_delay > config.max_delay {
        return Err(ConfigError::Validation(format!(
            "min-delay ({}ms) cannot exceed max-delay ({}ms)",
            config.min_delay, config.max_delay
        )));
    }

    if config.retry_backoff_min > config.retry_backoff_max {
        return Err(ConfigError::Validation(format!(
            "retry-backoff-min ({}ms) cannot exceed retry-backoff-max ({}ms)",
            config.retry_backoff_min, config.retry_backoff_max
        )));
    }

    if config.max_retries == 0 {
        return Err(ConfigError::Validation(
            "max-retries must be at least 1".to_string(),
        ));
    }

    if config.latency_window == 0 {
        return Err(ConfigError::Validation(
            "latency-window must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_size == 0 {
        return Err(ConfigError::Validation(
            "page-size must be at least 1".to_string(),
        ));
    }

    if config.max_concurrent_expansions == 0 {
        return Err(ConfigError::Validation(
            "max-concurrent-expansions must be at least 1".to_string(),
        ));
    }

    for (name, value) in [
        ("search-url", &config.search_url),
        ("profile-url", &config.profile_url),
        ("unpaywall-url", &config.unpaywall_url),
    ] {
        Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.pdf_dir.is_empty() {
        return Err(ConfigError::Validation("pdf-dir cannot be empty".to_string()));
    }

    if config.graph_path.is_empty() {
        return Err(ConfigError::Validation(
            "graph-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates invocation parameters before any network activity
pub fn validate_run_request(request: &RunRequest) -> Result<(), ConfigError> {
    let has_query = request
        .query
        .as_deref()
        .is_some_and(|q| !q.trim().is_empty());
    let has_profile = request
        .author_profile
        .as_deref()
        .is_some_and(|id| !id.trim().is_empty());

    if !has_query && !has_profile {
        return Err(ConfigError::Validation(
            "either a query or --author-profile must be provided".to_string(),
        ));
    }

    if request.num_results <= 0 {
        return Err(ConfigError::Validation(format!(
            "--num-results must be a positive integer, got {}",
            request.num_results
        )));
    }

    if request.max_depth < 0 {
        return Err(ConfigError::Validation(format!(
            "--max-depth cannot be negative, got {}",
            request.max_depth
        )));
    }

    for (flag, year) in [
        ("--year-low", request.year_low),
        ("--year-high", request.year_high),
    ] {
        if let Some(year) = year {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(ConfigError::Validation(format!(
                    "{} must be a valid year ({}-{}), got {}",
                    flag, MIN_YEAR, MAX_YEAR, year
                )));
            }
        }
    }

    if let (Some(low), Some(high)) = (request.year_low, request.year_high) {
        if low > high {
            return Err(ConfigError::Validation(format!(
                "--year-low ({}) cannot be after --year-high ({})",
                low, high
            )));
        }
    }

    Ok(())
}
