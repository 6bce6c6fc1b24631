//! Link graph over the document set: one adjacency list per page plus the
//! external URLs seen, for the optional liveness check. Cycles are fine; only
//! target existence is checked.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{DocumentSet, LinkTarget};
use crate::types::{Finding, Location, Rule};

/// A directed page-to-page edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<'a> {
    /// Fragment the link points at, if any.
    pub anchor: Option<&'a str>,
    /// One-based source line of the link.
    pub line: u32,
    /// Link target as written.
    pub raw: &'a str,
    /// Target page slug.
    pub target: &'a str,
}

/// Adjacency structure keyed by source slug.
#[derive(Debug, Default)]
pub struct LinkGraph<'a> {
    /// Outbound internal edges per page.
    pub edges: BTreeMap<&'a str, Vec<Edge<'a>>>,
    /// External URL -> every place it is linked from.
    pub external: BTreeMap<&'a str, Vec<Location>>,
}

impl<'a> LinkGraph<'a> {
    /// Build the graph in a single pass over every page's links.
    pub fn build(set: &'a DocumentSet) -> Self {
        let mut graph = Self::default();

        for page in set.pages.values() {
            let edges = graph.edges.entry(page.path.as_str()).or_default();
            for link in &page.links {
                match &link.target {
                    LinkTarget::Asset { .. } => {},
                    LinkTarget::External { url } => {
                        if url.starts_with("http://") || url.starts_with("https://") {
                            graph
                                .external
                                .entry(url.as_str())
                                .or_default()
                                .push(Location::at(&page.path, link.line));
                        }
                    },
                    LinkTarget::Internal { anchor, slug } => edges.push(Edge {
                        anchor: anchor.as_deref(),
                        line: link.line,
                        raw: &link.raw,
                        target: slug,
                    }),
                }
            }
        }

        return graph;
    }

    /// Number of internal edges.
    pub fn edge_count(&self) -> usize {
        return self.edges.values().map(Vec::len).sum();
    }
}

/// Check every internal edge: the target page must exist, and an anchored
/// edge's anchor must be one of the target page's heading anchors.
pub fn validate(set: &DocumentSet, graph: &LinkGraph<'_>) -> Vec<Finding> {
    let anchors: HashMap<&str, HashSet<&str>> = set
        .pages
        .iter()
        .map(|(slug, page)| return (slug.as_str(), page.anchors()))
        .collect();
    let mut findings = Vec::new();

    for (source, edges) in &graph.edges {
        for edge in edges {
            let Some(target_anchors) = anchors.get(edge.target) else {
                findings.push(Finding::new(
                    Rule::LinkMissingPage,
                    Location::at(*source, edge.line),
                    format!("link `{}` points at `{}`, which has no page", edge.raw, edge.target),
                ));
                continue;
            };
            let Some(anchor) = edge.anchor else {
                continue;
            };
            if !target_anchors.contains(anchor) {
                findings.push(Finding::new(
                    Rule::LinkMissingAnchor,
                    Location::at(*source, edge.line),
                    format!(
                        "link `{}`: page `{}` has no heading with anchor `#{anchor}`",
                        edge.raw, edge.target
                    ),
                ));
            }
        }
    }

    tracing::info!(
        edges = graph.edge_count(),
        external = graph.external.len(),
        findings = findings.len(),
        "links validated"
    );
    return findings;
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::loader::load_sources;
    use crate::types::{Category, Severity};

    fn set(pages: &[(&str, &str)]) -> DocumentSet {
        let sources = pages
            .iter()
            .map(|(path, text)| (PathBuf::from(path), (*text).to_string()))
            .collect();
        return load_sources(sources, Vec::new(), "/");
    }

    fn check(set: &DocumentSet) -> Vec<Finding> {
        let graph = LinkGraph::build(set);
        return validate(set, &graph);
    }

    #[test]
    fn existing_anchor_validates() {
        let set = set(&[
            ("api/overview.md", "See [chat](/api/models#chat-models).\n"),
            ("api/models.md", "# Models\n\n## Chat Models\n"),
        ]);
        assert!(check(&set).is_empty());
    }

    #[test]
    fn dangling_link_is_one_link_error_on_linking_page() {
        let set = set(&[("guide.md", "Go to [missing](/missing-page).\n")]);
        let findings = check(&set);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::LinkMissingPage);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].category, Category::Link);
        assert_eq!(findings[0].location, Location::at("guide", 1));
    }

    #[test]
    fn missing_anchor_is_error() {
        let set = set(&[
            ("api/overview.md", "See [embeddings](/api/models#embedding-models).\n"),
            ("api/models.md", "## Chat Models\n"),
        ]);
        let findings = check(&set);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::LinkMissingAnchor);
        assert!(findings[0].message.contains("#embedding-models"));
    }

    #[test]
    fn cycles_and_self_links_are_fine() {
        let set = set(&[
            ("a.md", "# A\n\n[b](/b) [top](#a)\n"),
            ("b.md", "# B\n\n[a](/a)\n"),
        ]);
        assert!(check(&set).is_empty());
    }

    #[test]
    fn every_heading_anchor_round_trips() {
        let headings = ["Chat Models", "What's New?", "Step 1: Install", "`max_tokens` limit", "Setup", "Setup"];
        let mut body = String::new();
        for heading in headings {
            body.push_str(&format!("## {heading}\n\n"));
        }
        let target = set(&[("t.md", body.as_str())]);
        let anchors: Vec<String> = target.pages["t"].headings.iter().map(|h| h.anchor.clone()).collect();

        let links: String = anchors.iter().map(|a| format!("[x](/t#{a})\n")).collect();
        let both = set(&[("t.md", body.as_str()), ("links.md", links.as_str())]);
        assert!(check(&both).is_empty());
    }

    #[test]
    fn external_links_recorded_not_checked() {
        let set = set(&[("a.md", "[site](https://example.com) and [mail](mailto:x@example.com)\n")]);
        let graph = LinkGraph::build(&set);
        assert_eq!(graph.external.len(), 1);
        assert!(validate(&set, &graph).is_empty());
    }
}
