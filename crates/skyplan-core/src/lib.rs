pub mod controller;
pub mod error;
pub mod export;
pub mod graph;
pub mod rules;
pub mod taxonomy;

pub use controller::{
    CatalogPayload, Change, ClickTarget, Controller, Event, InteractionState, Notice,
};
pub use error::{Error, Result};
pub use export::{
    export_file_name, export_schema, export_to_file, import_from_file, ExportDocument,
    ImportedArchitecture,
};
pub use graph::GraphModel;
pub use rules::{ConnectionRules, RuleOverrides};
pub use taxonomy::{Category, Provider, ResourceSpec, ResourceTemplate, Taxonomy};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// --- Types (shared by the editor and the persisted record) ---

/// Ordered configuration key → value mapping carried by every node.
pub type Properties = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// What an edge stands for. Informational only; never affects validity.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Network,
    Data,
    #[default]
    Dependency,
}

impl ConnectionKind {
    /// Pick a kind for a freshly drawn edge from the categories it joins.
    pub fn infer(source: Category, target: Category) -> Self {
        let either = |c: Category| source == c || target == c;
        if either(Category::Network)
            || either(Category::LoadBalancer)
            || either(Category::OrchestrationIngress)
        {
            ConnectionKind::Network
        } else if either(Category::Database) || either(Category::Storage) {
            ConnectionKind::Data
        } else {
            ConnectionKind::Dependency
        }
    }
}

/// A resource placed on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub provider: Provider,
    pub resource_type: String,
    pub category: Category,
    pub label: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub properties: Properties,
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub connection_kind: ConnectionKind,
}

/// Complete node and edge set of a graph at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Generate an edge ID from source and target node IDs.
pub fn make_edge_id(source: &str, target: &str) -> String {
    format!("edge-{}-{}", source, target)
}

/// Parse the numeric suffix of a generated node id ("node-{N}").
pub(crate) fn node_seq(id: &str) -> Option<u64> {
    id.strip_prefix("node-").and_then(|s| s.parse::<u64>().ok())
}
