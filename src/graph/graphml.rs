//! GraphML writer for the citation graph

use crate::graph::CitationGraph;
use std::io::Write;
use std::path::Path;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

/// Renders the graph as a GraphML document
pub fn render_graphml(graph: &CitationGraph) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    out.push_str("  <key id=\"title\" for=\"node\" attr.name=\"title\" attr.type=\"string\"/>\n");
    out.push_str("  <key id=\"url\" for=\"node\" attr.name=\"url\" attr.type=\"string\"/>\n");
    out.push_str("  <key id=\"doi\" for=\"node\" attr.name=\"doi\" attr.type=\"string\"/>\n");
    out.push_str("  <graph id=\"citations\" edgedefault=\"directed\">\n");

    for node in graph.nodes() {
        out.push_str(&format!("    <node id=\"{}\">\n", escape(&node.id)));
        for (key, value) in [("title", &node.title), ("url", &node.url), ("doi", &node.doi)] {
            if let Some(value) = value {
                out.push_str(&format!(
                    "      <data key=\"{}\">{}</data>\n",
                    key,
                    escape(value)
                ));
            }
        }
        out.push_str("    </node>\n");
    }

    for (citing, cited) in graph.edges() {
        out.push_str(&format!(
            "    <edge source=\"{}\" target=\"{}\"/>\n",
            escape(citing),
            escape(cited)
        ));
    }

    out.push_str("  </graph>\n");
    out.push_str("</graphml>\n");
    out
}

/// Writes the graph to `path` as GraphML
pub fn write_graphml(graph: &CitationGraph, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::File::create(path)?;
    file.write_all(render_graphml(graph).as_bytes())?;
    tracing::info!(
        path = %path.display(),
        "Citation graph written: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(())
}
