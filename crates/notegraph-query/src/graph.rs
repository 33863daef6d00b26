//! Graph export: DOT, Mermaid, and JSON node-link renderings of the vault
//! graph, whole or around one note.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use notegraph_core::{NodeKind, NotegraphError, Result};
use notegraph_index::VaultGraph;
use serde::Serialize;

/// A node in an exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub exists: bool,
    pub isolated: bool,
}

/// An edge in an exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: String,
    pub count: usize,
}

/// Nodes and edges selected for export, in identity order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphExport {
    /// Every node and edge of the graph.
    #[must_use]
    pub fn from_vault(graph: &VaultGraph) -> Self {
        let ids: BTreeSet<&str> = graph.nodes().map(|node| node.id.as_str()).collect();
        Self::select(graph, &ids)
    }

    /// Nodes within `depth` hops of `center`, following edges both ways.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `center` is not in the graph.
    pub fn neighborhood(graph: &VaultGraph, center: &str, depth: u32) -> Result<Self> {
        let Some(start) = graph.node(center) else {
            return Err(NotegraphError::NotFound(center.to_string()));
        };
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        visited.insert(start.id.as_str());
        queue.push_back((start.id.as_str(), 0));

        while let Some((current, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }
            let forward = graph.out_edges(current).into_iter().map(|e| e.target);
            let reverse = graph.in_edges(current).into_iter().map(|e| e.source);
            for next in forward.chain(reverse) {
                if visited.insert(next.as_str()) {
                    queue.push_back((next.as_str(), current_depth + 1));
                }
            }
        }

        Ok(Self::select(graph, &visited))
    }

    fn select(graph: &VaultGraph, ids: &BTreeSet<&str>) -> Self {
        let nodes = ids
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|node| GraphNode {
                id: node.id.to_string(),
                kind: node.kind,
                exists: node.exists,
                isolated: node.isolated,
            })
            .collect();
        let mut edges: Vec<GraphEdge> = graph
            .edges()
            .filter(|edge| ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str()))
            .map(|edge| GraphEdge {
                source: edge.source.to_string(),
                target: edge.target.to_string(),
                kind: edge.attrs.kind.as_str().to_string(),
                count: edge.attrs.count,
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target, &a.kind).cmp(&(&b.source, &b.target, &b.kind)));
        Self { nodes, edges }
    }

    /// Format as DOT (Graphviz). Missing files are dashed, tags are ellipses.
    #[must_use]
    pub fn format_dot(&self) -> String {
        let mut out = String::from("digraph notegraph {\n  rankdir=LR;\n  node [shape=box];\n\n");

        for node in &self.nodes {
            let mut attrs = Vec::new();
            if node.kind == NodeKind::Tag {
                attrs.push("shape=ellipse".to_string());
            }
            if !node.exists {
                attrs.push("style=dashed".to_string());
            }
            let attrs = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };
            out.push_str(&format!("  \"{}\"{attrs};\n", dot_escape(&node.id)));
        }

        out.push('\n');

        for edge in &self.edges {
            let label = if edge.count > 1 {
                format!("{} x{}", edge.kind, edge.count)
            } else {
                edge.kind.clone()
            };
            out.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                dot_escape(&edge.source),
                dot_escape(&edge.target),
                label
            ));
        }

        out.push_str("}\n");
        out
    }

    /// Format as a Mermaid flowchart. Node keys are positional (`n0`,
    /// `n1`, ...) since identities may contain any character.
    #[must_use]
    pub fn format_mermaid(&self) -> String {
        let keys: BTreeMap<&str, String> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), format!("n{i}")))
            .collect();

        let mut out = String::from("graph LR\n");

        for node in &self.nodes {
            let label = node.id.replace('"', "'");
            let key = &keys[node.id.as_str()];
            match (node.kind, node.exists) {
                (NodeKind::Tag, _) => out.push_str(&format!("  {key}([\"{label}\"])\n")),
                (_, false) => out.push_str(&format!("  {key}[/\"{label}\"/]\n")),
                _ => out.push_str(&format!("  {key}[\"{label}\"]\n")),
            }
        }

        out.push('\n');

        for edge in &self.edges {
            let (Some(source), Some(target)) = (
                keys.get(edge.source.as_str()),
                keys.get(edge.target.as_str()),
            ) else {
                continue;
            };
            out.push_str(&format!("  {source} -->|{}| {target}\n", edge.kind));
        }

        out
    }

    /// Format as JSON node-link data.
    #[must_use]
    pub fn format_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegraph_core::VaultConfig;
    use notegraph_index::{connect, ConnectOptions, Connected, VaultInput};

    fn connected() -> Connected {
        let notes = [
            ("Standup.md", "Discussed [[Alpha]]."),
            ("Alpha.md", "Owner [[Jane \"JS\" Smith]], depends on [[Beta]] and [[Beta]]."),
            ("Beta.md", "#project"),
            ("Jane \"JS\" Smith.md", ""),
            ("Solo.md", ""),
        ];
        let input = VaultInput::from_texts(notes, &VaultConfig::default()).unwrap();
        let options = ConnectOptions {
            tag_nodes: true,
            ..ConnectOptions::default()
        };
        connect(&input, &options)
    }

    #[test]
    fn whole_graph_export() {
        let connected = connected();
        let export = GraphExport::from_vault(connected.graph());
        assert_eq!(export.nodes.len(), 6);
        assert_eq!(export.edges.len(), 4);
        let beta = export.edges.iter().find(|e| e.target == "Beta").unwrap();
        assert_eq!(beta.count, 2);
    }

    #[test]
    fn neighborhood_depth_one() {
        let connected = connected();
        let export = GraphExport::neighborhood(connected.graph(), "Alpha", 1).unwrap();
        let ids: Vec<&str> = export.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Alpha", "Beta", "Jane \"JS\" Smith", "Standup"]);
        assert_eq!(export.edges.len(), 3);
    }

    #[test]
    fn neighborhood_depth_two_reaches_tags() {
        let connected = connected();
        let export = GraphExport::neighborhood(connected.graph(), "Standup", 2).unwrap();
        assert!(export.nodes.iter().all(|n| n.id != "#project"));
        let export = GraphExport::neighborhood(connected.graph(), "Standup", 3).unwrap();
        assert!(export.nodes.iter().any(|n| n.id == "#project"));
    }

    #[test]
    fn neighborhood_of_single_node() {
        let connected = connected();
        let export = GraphExport::neighborhood(connected.graph(), "Solo", 2).unwrap();
        assert_eq!(export.nodes.len(), 1);
        assert!(export.edges.is_empty());
        assert!(GraphExport::neighborhood(connected.graph(), "Ghost", 1)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn format_dot_output() {
        let export = GraphExport::from_vault(connected().graph());
        let dot = export.format_dot();
        assert!(dot.starts_with("digraph notegraph {"));
        assert!(dot.contains("rankdir=LR"));
        assert!(dot.contains("\"Alpha\" -> \"Beta\" [label=\"wikilink x2\"];"));
        assert!(dot.contains("\"Jane \\\"JS\\\" Smith\""));
        assert!(dot.contains("\"#project\" [shape=ellipse];"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn format_mermaid_output() {
        let export = GraphExport::from_vault(connected().graph());
        let mermaid = export.format_mermaid();
        assert!(mermaid.starts_with("graph LR"));
        assert!(mermaid.contains("-->|wikilink|"));
        assert!(mermaid.contains("([\"#project\"])"));
        assert!(mermaid.contains("[\"Jane 'JS' Smith\"]"));
    }

    #[test]
    fn format_json_structure() {
        let export = GraphExport::from_vault(connected().graph());
        let parsed: serde_json::Value = serde_json::from_str(&export.format_json()).unwrap();
        assert!(parsed["nodes"].is_array());
        assert!(parsed["edges"].is_array());
        assert_eq!(parsed["nodes"][0]["kind"], "tag");
    }
}
