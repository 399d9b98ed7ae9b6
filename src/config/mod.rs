//! Configuration module for Scholar-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! as well as validating per-invocation parameters before a run starts.
//!
//! # Example
//!
//! ```no_run
//! use scholar_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Citation depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, RunRequest};

pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash};
pub use validation::{validate, validate_run_request, MAX_YEAR, MIN_YEAR};
