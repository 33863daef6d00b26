//! JSON Canvas (`.canvas`) documents.
//!
//! A canvas is a board of positioned cards joined by optional labelled
//! arrows. Cards are free text, vault files, web links, or groups.

use std::collections::{BTreeMap, HashMap};

use notegraph_core::{NotegraphError, Result};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasNodeKind {
    Text,
    File,
    Link,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CanvasNodeKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Vault-relative path of a file card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Title of a group card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub id: String,
    pub from_node: String,
    pub to_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

impl CanvasDocument {
    /// Parse canvas JSON. Blank input is an empty canvas.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::Parse`] if the JSON is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| NotegraphError::Parse(e.to_string()))
    }

    /// Card positions keyed by card id.
    #[must_use]
    pub fn positions(&self) -> BTreeMap<&str, (f64, f64)> {
        self.nodes
            .iter()
            .map(|node| (node.id.as_str(), (node.x, node.y)))
            .collect()
    }

    /// Arrow labels keyed by (from, to) card ids.
    #[must_use]
    pub fn edge_labels(&self) -> BTreeMap<(&str, &str), &str> {
        self.edges
            .iter()
            .filter_map(|edge| {
                let label = edge.label.as_deref()?;
                Some(((edge.from_node.as_str(), edge.to_node.as_str()), label))
            })
            .collect()
    }

    /// Vault paths shown on file cards, in card order.
    #[must_use]
    pub fn linked_files(&self) -> Vec<&str> {
        self.nodes.iter().filter_map(|node| node.file.as_deref()).collect()
    }

    /// The board as a directed graph of card ids with arrow labels.
    ///
    /// Arrows whose endpoints are not cards on this board are dropped.
    #[must_use]
    pub fn graph(&self) -> DiGraph<&str, Option<&str>> {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        for node in &self.nodes {
            indices.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
        }
        for edge in &self.edges {
            let (Some(&from), Some(&to)) = (
                indices.get(edge.from_node.as_str()),
                indices.get(edge.to_node.as_str()),
            ) else {
                continue;
            };
            graph.add_edge(from, to, edge.label.as_deref());
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"{
        "nodes": [
            {"id": "a", "type": "text", "text": "Crazy wall", "x": -100, "y": 20.5, "width": 250, "height": 60},
            {"id": "b", "type": "file", "file": "lipsum/Isolated note.md", "x": 300, "y": 0, "width": 400, "height": 400},
            {"id": "c", "type": "link", "url": "https://obsidian.md", "x": 0, "y": 500, "width": 200, "height": 100},
            {"id": "g", "type": "group", "label": "Cluster", "x": -200, "y": -200, "width": 1000, "height": 900}
        ],
        "edges": [
            {"id": "e1", "fromNode": "a", "fromSide": "right", "toNode": "b", "toSide": "left", "label": "explains"},
            {"id": "e2", "fromNode": "b", "toNode": "c"},
            {"id": "e3", "fromNode": "b", "toNode": "missing"}
        ]
    }"#;

    #[test]
    fn parses_cards_and_arrows() {
        let canvas = CanvasDocument::parse(BOARD).unwrap();
        assert_eq!(canvas.nodes.len(), 4);
        assert_eq!(canvas.nodes[1].kind, CanvasNodeKind::File);
        assert_eq!(canvas.edges[0].from_side.as_deref(), Some("right"));
        assert_eq!(canvas.positions()["a"], (-100.0, 20.5));
        assert_eq!(canvas.linked_files(), vec!["lipsum/Isolated note.md"]);
        assert_eq!(canvas.edge_labels()[&("a", "b")], "explains");
        assert_eq!(canvas.edge_labels().len(), 1);
    }

    #[test]
    fn graph_drops_dangling_arrows() {
        let canvas = CanvasDocument::parse(BOARD).unwrap();
        let graph = canvas.graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn blank_canvas_is_empty() {
        assert_eq!(CanvasDocument::parse("").unwrap(), CanvasDocument::default());
        assert_eq!(CanvasDocument::parse("{}").unwrap(), CanvasDocument::default());
    }

    #[test]
    fn malformed_canvas_is_a_parse_error() {
        let err = CanvasDocument::parse("{\"nodes\": [").unwrap_err();
        assert!(matches!(err, NotegraphError::Parse(_)));
    }

    #[test]
    fn serializes_with_canvas_field_names() {
        let canvas = CanvasDocument::parse(BOARD).unwrap();
        let json = serde_json::to_value(&canvas).unwrap();
        assert_eq!(json["edges"][0]["fromNode"], "a");
        assert_eq!(json["nodes"][0]["type"], "text");
    }
}
