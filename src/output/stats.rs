//! End-of-run statistics
//!
//! This module renders the crawl metrics snapshot together with the
//! run-level figures the controller reports.

use crate::state::MetricsSnapshot;
use std::time::Duration;

/// Run-level figures shown alongside the metrics
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Results returned to the caller
    pub results_collected: usize,

    /// Nodes and edges of the citation graph
    pub graph_nodes: usize,
    pub graph_edges: usize,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,

    /// Whether the crawl ended before reaching its target
    pub stopped_early: bool,
}

/// Renders statistics as the lines printed at the end of a run
pub fn format_statistics(stats: &MetricsSnapshot, summary: &RunSummary) -> Vec<String> {
    let mut lines = vec!["=== Crawl Statistics ===".to_string(), String::new()];

    lines.push("Overview:".to_string());
    lines.push(format!("  Results collected: {}", summary.results_collected));
    lines.push(format!("  Result pages fetched: {}", stats.pages_fetched));
    lines.push(format!("  Frontier entries expanded: {}", stats.frontier_expanded));
    lines.push(format!(
        "  Citation graph: {} nodes, {} edges",
        summary.graph_nodes, summary.graph_edges
    ));
    lines.push(format!("  PDFs downloaded: {}", stats.pdfs_downloaded));
    lines.push(format!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64()));
    if summary.stopped_early {
        lines.push("  Stopped early: proxy pool exhausted".to_string());
    }
    lines.push(String::new());

    lines.push("Requests:".to_string());
    lines.push(format!("  Successful: {}", stats.successful_requests));
    lines.push(format!("  Failed: {}", stats.failed_requests));
    lines.push(format!("  Challenges: {}", stats.challenges));
    lines.push(String::new());

    lines.push("Proxies:".to_string());
    lines.push(format!("  Used: {}", stats.proxies_used));
    lines.push(format!("  Evicted: {}", stats.proxies_evicted));
    lines.push(String::new());

    lines.push(format!(
        "Success Rate: {:.1}% ({} / {} requests succeeded)",
        stats.success_rate(),
        stats.successful_requests,
        stats.total_requests()
    ));
    lines
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &MetricsSnapshot, summary: &RunSummary) {
    for line in format_statistics(stats, summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_statistics() {
        let stats = MetricsSnapshot {
            successful_requests: 3,
            failed_requests: 1,
            challenges: 1,
            proxies_used: 2,
            ..Default::default()
        };
        let summary = RunSummary {
            results_collected: 12,
            stopped_early: true,
            ..Default::default()
        };

        let lines = format_statistics(&stats, &summary);
        assert!(lines.contains(&"  Results collected: 12".to_string()));
        assert!(lines.contains(&"  Stopped early: proxy pool exhausted".to_string()));
        assert!(lines.contains(&"  Used: 2".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Success Rate: 75.0% (3 / 4 requests succeeded)"
        );
    }

    #[test]
    fn test_no_requests() {
        let lines = format_statistics(&MetricsSnapshot::default(), &RunSummary::default());
        assert!(!lines.iter().any(|l| l.contains("Stopped early")));
        assert_eq!(
            lines.last().unwrap(),
            "Success Rate: 0.0% (0 / 0 requests succeeded)"
        );
    }
}
