//! Module dependency graph with version reconciliation
//!
//! Uses `petgraph::StableGraph` as the backing store: nodes are never
//! removed, so indices double as a stable first-seen ordering, and parallel
//! edges keep duplicate report lines intact.
//!
//! Each module identity owns exactly one [`Node`]. Every reference to a
//! module goes through [`Graph::upsert`], which keeps the maximum version
//! token as the selected version and records all others as superseded.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::version::VersionToken;

/// A module in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    module: String,
    selected: VersionToken,
    superseded: BTreeSet<VersionToken>,
}

impl Node {
    fn new(module: &str, version: VersionToken) -> Self {
        Self {
            module: module.to_string(),
            selected: version,
            superseded: BTreeSet::new(),
        }
    }

    /// Module identity (e.g. "golang.org/x/mod")
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The highest version token seen for this module
    ///
    /// Empty for the root module when it is referenced without a version.
    pub fn version(&self) -> &VersionToken {
        &self.selected
    }

    /// Versions observed but not selected, highest first
    pub fn superseded(&self) -> impl Iterator<Item = &VersionToken> {
        self.superseded.iter().rev()
    }

    pub fn superseded_count(&self) -> usize {
        self.superseded.len()
    }

    /// Fold one more observed version into this node
    ///
    /// Returns `true` if the version was not already recorded.
    fn observe(&mut self, version: VersionToken) -> bool {
        if version > self.selected {
            let previous = std::mem::replace(&mut self.selected, version);
            self.superseded.insert(previous)
        } else if version < self.selected {
            self.superseded.insert(version)
        } else {
            false
        }
    }
}

/// A "required by" relationship between two modules
///
/// The edge runs from the required module to the module requiring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// 1-based line of the report record that produced this edge
    pub line: usize,
}

/// The module dependency graph
///
/// Built in a single pass by [`crate::process::process`], then read by the
/// exporter. Nodes are iterated in first-seen order and edges in arrival
/// order.
#[derive(Debug, Clone)]
pub struct Graph {
    /// The underlying stable graph (private to enforce encapsulation)
    inner: StableGraph<Node, Edge>,

    /// Maps module identities to their NodeIndex for O(1) upserts
    index: HashMap<String, NodeIndex>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            inner: StableGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Record that `module` was seen at `version`
    ///
    /// Creates the node on first reference. Afterwards a strictly greater
    /// version becomes the selected version (the previous one is
    /// superseded), a strictly lower version is added to the superseded
    /// set, and an equal version changes nothing.
    pub fn upsert(&mut self, module: &str, version: &str) -> NodeIndex {
        let version = VersionToken::from(version);
        let unparseable = !version.is_empty() && !version.is_valid();

        if let Some(&idx) = self.index.get(module) {
            let recorded = match self.inner.node_weight_mut(idx) {
                Some(node) => node.observe(version.clone()),
                None => false,
            };
            if recorded && unparseable {
                debug!(module, version = version.as_str(), "unparseable version token");
            }
            return idx;
        }

        if unparseable {
            debug!(module, version = version.as_str(), "unparseable version token");
        }
        let idx = self.inner.add_node(Node::new(module, version));
        self.index.insert(module.to_string(), idx);
        idx
    }

    /// Append an edge between two nodes returned by [`Graph::upsert`]
    ///
    /// Duplicate edges are kept.
    pub(crate) fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: Edge) -> EdgeIndex {
        self.inner.add_edge(from, to, edge)
    }

    /// Look up a node by module identity
    pub fn node(&self, module: &str) -> Option<&Node> {
        self.index
            .get(module)
            .and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Get the number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Get the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Iterate over nodes in first-seen order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.node_weights()
    }

    /// Iterate over edges in arrival order
    ///
    /// Yields `(from_module, to_module, edge)` tuples.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &Edge)> {
        self.inner.edge_references().filter_map(move |e| {
            let from = self.inner.node_weight(e.source())?;
            let to = self.inner.node_weight(e.target())?;
            Some((from.module(), to.module(), e.weight()))
        })
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
