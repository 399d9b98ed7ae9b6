//! Leveled citation frontier
//!
//! Entries discovered while a depth level is expanded are queued for the
//! next level. A URL is only ever queued once per crawl.

use crate::graph::PaperRef;
use std::collections::HashSet;

/// A cited-by page waiting to be expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    /// Distance from the top-level search results, starting at 1
    pub depth: u32,
    /// The paper whose citations this page lists
    pub parent: Option<PaperRef>,
}

#[derive(Debug, Default)]
pub struct Frontier {
    pending: Vec<FrontierEntry>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an entry, returning false if its URL was queued before
    pub fn push(&mut self, entry: FrontierEntry) -> bool {
        if !self.seen.insert(entry.url.clone()) {
            return false;
        }
        self.pending.push(entry);
        true
    }

    /// Takes every queued entry
    pub fn drain_level(&mut self) -> Vec<FrontierEntry> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct URLs queued so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
