use crate::graph::{GraphSink, PaperRef};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory citation graph
///
/// Nodes are keyed by [`PaperRef::id`]; a node seen again keeps its first
/// title/URL/DOI unless those were missing. Edges point from the citing
/// paper to the cited one and are deduplicated. Self-citations are dropped.
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    nodes: BTreeMap<String, PaperRef>,
    edges: BTreeSet<(String, String)>,
}

impl CitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, citing: &str, cited: &str) -> bool {
        self.edges
            .contains(&(citing.to_string(), cited.to_string()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PaperRef> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}

impl GraphSink for CitationGraph {
    fn add_paper(&mut self, paper: &PaperRef) {
        match self.nodes.get_mut(&paper.id) {
            Some(existing) => {
                if existing.title.is_none() {
                    existing.title = paper.title.clone();
                }
                if existing.url.is_none() {
                    existing.url = paper.url.clone();
                }
                if existing.doi.is_none() {
                    existing.doi = paper.doi.clone();
                }
            }
            None => {
                self.nodes.insert(paper.id.clone(), paper.clone());
            }
        }
    }

    fn add_citation(&mut self, citing: &PaperRef, cited: &PaperRef) {
        if citing.id == cited.id {
            tracing::debug!(paper = %citing.id, "Skipping self-citation");
            return;
        }

        self.add_paper(citing);
        self.add_paper(cited);
        self.edges.insert((citing.id.clone(), cited.id.clone()));
    }
}
