use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyplan_core::{Edge, GraphSnapshot, Node};

/// A named, persisted graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Architecture {
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn summary(&self) -> ArchitectureSummary {
        ArchitectureSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            updated_at: self.updated_at,
            node_count: self.nodes.len(),
        }
    }
}

/// One row of the saved-architectures list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureSummary {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub node_count: usize,
}
