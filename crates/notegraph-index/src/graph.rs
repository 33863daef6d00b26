//! The vault graph: identities as nodes, resolved references as edges.
//!
//! Built once per run by [`GraphBuilder`] and read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use notegraph_core::{Anchor, FileMeta, NodeKind, NoteId, ReferenceKind};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use crate::resolver::Resolution;

/// Kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Wikilink,
    Embed,
    MarkdownLink,
    /// Note to tag pseudo-node.
    Tag,
}

impl EdgeKind {
    /// Kinds that count as backlinks.
    #[must_use]
    pub fn is_navigable(self) -> bool {
        !matches!(self, Self::Tag)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wikilink => "wikilink",
            Self::Embed => "embed",
            Self::MarkdownLink => "markdown-link",
            Self::Tag => "tag",
        }
    }

    /// Edge kind for a reference kind; math has none.
    #[must_use]
    pub fn from_reference(kind: ReferenceKind) -> Option<Self> {
        match kind {
            ReferenceKind::Wikilink => Some(Self::Wikilink),
            ReferenceKind::Embed => Some(Self::Embed),
            ReferenceKind::MarkdownLink => Some(Self::MarkdownLink),
            ReferenceKind::Tag => Some(Self::Tag),
            ReferenceKind::Math => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeAttrs {
    pub id: NoteId,
    pub kind: NodeKind,
    /// File present on disk. Tag nodes always exist.
    pub exists: bool,
    /// No incoming and no outgoing edges of any kind.
    pub isolated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FileMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeAttrs {
    pub kind: EdgeKind,
    /// Number of references collapsed into this edge.
    pub count: usize,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub anchors: BTreeSet<Anchor>,
}

/// Target endpoint of an edge being added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeEnd {
    pub id: NoteId,
    pub kind: NodeKind,
    pub exists: bool,
}

impl EdgeEnd {
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            id: NoteId::for_tag(tag),
            kind: NodeKind::Tag,
            exists: true,
        }
    }
}

impl From<&Resolution> for EdgeEnd {
    fn from(resolution: &Resolution) -> Self {
        Self {
            id: resolution.id.clone(),
            kind: resolution.kind.into(),
            exists: resolution.exists(),
        }
    }
}

/// Borrowed view of one edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'g> {
    pub source: &'g NoteId,
    pub target: &'g NoteId,
    pub attrs: &'g EdgeAttrs,
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<NodeAttrs, EdgeAttrs>,
    nodes: BTreeMap<NoteId, NodeIndex>,
    edges: HashMap<(NodeIndex, NodeIndex, EdgeKind), EdgeIndex>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file that is present on disk.
    pub fn add_file(&mut self, id: NoteId, kind: NodeKind, meta: Option<FileMeta>) -> NodeIndex {
        let idx = self.ensure_node(&id, kind, true);
        if meta.is_some() {
            self.graph[idx].meta = meta;
        }
        idx
    }

    /// Add a note that is present on disk.
    pub fn add_note(&mut self, id: NoteId, meta: Option<FileMeta>) -> NodeIndex {
        self.add_file(id, NodeKind::Note, meta)
    }

    /// Add one reference from `source` to `target`.
    ///
    /// Missing endpoints are created; a target created here and never added
    /// as a file stays `exists = false`. Repeats of the same
    /// (source, target, kind) bump the edge count.
    pub fn add_edge(
        &mut self,
        source: &NoteId,
        target: &EdgeEnd,
        kind: EdgeKind,
        anchor: Option<&Anchor>,
    ) {
        let from = self.ensure_node(source, NodeKind::Note, true);
        let to = self.ensure_node(&target.id, target.kind, target.exists);
        let edge = match self.edges.get(&(from, to, kind)) {
            Some(&edge) => edge,
            None => {
                let edge = self.graph.add_edge(
                    from,
                    to,
                    EdgeAttrs {
                        kind,
                        count: 0,
                        anchors: BTreeSet::new(),
                    },
                );
                self.edges.insert((from, to, kind), edge);
                edge
            }
        };
        let attrs = &mut self.graph[edge];
        attrs.count += 1;
        if let Some(anchor) = anchor {
            attrs.anchors.insert(anchor.clone());
        }
    }

    /// Compute isolation flags and freeze the graph.
    #[must_use]
    pub fn finish(mut self) -> VaultGraph {
        let isolated: Vec<(NodeIndex, bool)> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.neighbors_undirected(idx).next().is_none()))
            .collect();
        for (idx, flag) in isolated {
            self.graph[idx].isolated = flag;
        }
        VaultGraph {
            graph: self.graph,
            nodes: self.nodes,
        }
    }

    fn ensure_node(&mut self, id: &NoteId, kind: NodeKind, exists: bool) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(id) {
            if exists {
                self.graph[idx].exists = true;
            }
            return idx;
        }
        let idx = self.graph.add_node(NodeAttrs {
            id: id.clone(),
            kind,
            exists,
            isolated: false,
            meta: None,
        });
        self.nodes.insert(id.clone(), idx);
        idx
    }
}

/// Finished, immutable vault graph.
#[derive(Debug, Clone, Default)]
pub struct VaultGraph {
    graph: DiGraph<NodeAttrs, EdgeAttrs>,
    nodes: BTreeMap<NoteId, NodeIndex>,
}

impl VaultGraph {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.nodes.get(id).map(|&idx| &self.graph[idx])
    }

    /// Nodes in identity order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeAttrs> {
        self.nodes.values().map(|&idx| &self.graph[idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.graph.edge_references().map(|edge| self.view(edge))
    }

    /// Outgoing edges of `id`, ordered by target then kind.
    #[must_use]
    pub fn out_edges(&self, id: &str) -> Vec<EdgeView<'_>> {
        let mut edges = self.directed(id, Direction::Outgoing);
        edges.sort_by(|a, b| (a.target, a.attrs.kind).cmp(&(b.target, b.attrs.kind)));
        edges
    }

    /// Incoming edges of `id`, ordered by source then kind.
    #[must_use]
    pub fn in_edges(&self, id: &str) -> Vec<EdgeView<'_>> {
        let mut edges = self.directed(id, Direction::Incoming);
        edges.sort_by(|a, b| (a.source, a.attrs.kind).cmp(&(b.source, b.attrs.kind)));
        edges
    }

    /// Nodes of `kind` referenced but not present on disk.
    #[must_use]
    pub fn nonexistent(&self, kind: NodeKind) -> Vec<&NoteId> {
        self.nodes()
            .filter(|node| node.kind == kind && !node.exists)
            .map(|node| &node.id)
            .collect()
    }

    /// Nodes of `kind` with no edges at all.
    #[must_use]
    pub fn isolated(&self, kind: NodeKind) -> Vec<&NoteId> {
        self.nodes()
            .filter(|node| node.kind == kind && node.isolated)
            .map(|node| &node.id)
            .collect()
    }

    #[must_use]
    pub fn nonexistent_notes(&self) -> Vec<&NoteId> {
        self.nonexistent(NodeKind::Note)
    }

    #[must_use]
    pub fn isolated_notes(&self) -> Vec<&NoteId> {
        self.isolated(NodeKind::Note)
    }

    /// The underlying petgraph graph, for algorithms not wrapped here.
    #[must_use]
    pub fn as_petgraph(&self) -> &DiGraph<NodeAttrs, EdgeAttrs> {
        &self.graph
    }

    fn directed(&self, id: &str, direction: Direction) -> Vec<EdgeView<'_>> {
        let Some(&idx) = self.nodes.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .map(|edge| self.view(edge))
            .collect()
    }

    fn view<'a>(&'a self, edge: petgraph::graph::EdgeReference<'a, EdgeAttrs>) -> EdgeView<'a> {
        EdgeView {
            source: &self.graph[edge.source()].id,
            target: &self.graph[edge.target()].id,
            attrs: edge.weight(),
        }
    }
}
