//! State module for tracking crawl progress
//!
//! This module provides the run-wide observational state shared by the crawl
//! components.
//!
//! # Components
//!
//! - `CrawlMetrics`: Atomic request, challenge, eviction and download counters
//! - `ThroughputTracker`: Sliding latency window for requests/sec and ETA

mod metrics;
mod throughput;

// Re-export main types
pub use metrics::{CrawlMetrics, MetricsSnapshot};
pub use throughput::ThroughputTracker;
