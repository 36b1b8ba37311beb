//! OpenGraph exchange document
//!
//! A pure mapping from [`Graph`] into the JSON document consumed by
//! BloodHound's OpenGraph ingestion:
//!
//! ```json
//! {
//!   "metadata": { "source_kind": "ModHoundBase" },
//!   "graph": {
//!     "nodes": [{ "id": "...", "kinds": ["GoModule"], "properties": { "module": "..." } }],
//!     "edges": [{ "start": { "match_by": "id", "value": "..." },
//!                 "end": { "match_by": "id", "value": "..." },
//!                 "kind": "RequiredBy" }]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::process::RootIdentity;

/// Top-level exchange document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenGraph {
    pub metadata: Metadata,
    pub graph: GraphDocument,
}

/// Identifies the producer of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source_kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<NodeDocument>,
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    pub kinds: Vec<String>,
    pub properties: NodeProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    pub name: String,
    pub module: String,
    /// Selected version; absent when no version was pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Superseded versions, highest first; absent when there are none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unpicked_versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub start: NodeMatcher,
    pub end: NodeMatcher,
    pub kind: String,
}

/// Reference to an edge endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMatcher {
    pub match_by: MatchBy,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBy {
    Id,
}

/// How node ids are derived from module identities
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdScheme {
    /// The bare module identity
    Module,
    /// `<prefix>_<root>_<module>`, keeping ids unique across projects
    Scoped { prefix: String },
}

impl IdScheme {
    pub fn node_id(&self, root: &RootIdentity, module: &str) -> String {
        match self {
            IdScheme::Module => module.to_string(),
            IdScheme::Scoped { prefix } => format!("{}_{}_{}", prefix, root, module),
        }
    }
}

impl Default for IdScheme {
    fn default() -> Self {
        IdScheme::Scoped {
            prefix: "modhound".to_string(),
        }
    }
}

/// Labels and id scheme used when exporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub source_kind: String,
    pub node_kind: String,
    pub edge_kind: String,
    pub id_scheme: IdScheme,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            source_kind: "ModHoundBase".to_string(),
            node_kind: "GoModule".to_string(),
            edge_kind: "RequiredBy".to_string(),
            id_scheme: IdScheme::default(),
        }
    }
}

/// Map a built graph into an exchange document
///
/// Nodes keep first-seen order and edges keep arrival order, so the same
/// report always produces the same document.
pub fn export(graph: &Graph, root: &RootIdentity, options: &ExportOptions) -> OpenGraph {
    let nodes = graph
        .nodes()
        .map(|node| NodeDocument {
            id: options.id_scheme.node_id(root, node.module()),
            kinds: vec![options.node_kind.clone()],
            properties: NodeProperties {
                name: node.module().to_string(),
                module: node.module().to_string(),
                version: (!node.version().is_empty()).then(|| node.version().to_string()),
                unpicked_versions: node.superseded().map(|v| v.to_string()).collect(),
            },
        })
        .collect();

    let edges = graph
        .edges()
        .map(|(from, to, _)| EdgeDocument {
            start: NodeMatcher {
                match_by: MatchBy::Id,
                value: options.id_scheme.node_id(root, from),
            },
            end: NodeMatcher {
                match_by: MatchBy::Id,
                value: options.id_scheme.node_id(root, to),
            },
            kind: options.edge_kind.clone(),
        })
        .collect();

    OpenGraph {
        metadata: Metadata {
            source_kind: options.source_kind.clone(),
        },
        graph: GraphDocument { nodes, edges },
    }
}
