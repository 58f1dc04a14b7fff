//! Portable export/import of an architecture as a JSON document.
//!
//! The document is `{version, name, nodes, edges}`. Field additions are the
//! only allowed format change: unknown fields are ignored on import and a
//! missing `version` reads as 1.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::validate_snapshot;
use crate::taxonomy::Taxonomy;
use crate::{Edge, Error, GraphSnapshot, Node, Result};

pub const EXPORT_VERSION: u32 = 1;

fn default_version() -> u32 {
    EXPORT_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct ExportDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Result of a successful import: the graph plus the name it was saved under.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedArchitecture {
    pub name: String,
    pub snapshot: GraphSnapshot,
}

pub fn export_to_file(snapshot: &GraphSnapshot, name: &str) -> Result<Vec<u8>> {
    let doc = ExportDocument {
        version: EXPORT_VERSION,
        name: name.to_string(),
        nodes: snapshot.nodes.clone(),
        edges: snapshot.edges.clone(),
    };
    serde_json::to_vec_pretty(&doc)
        .map_err(|e| Error::Validation(format!("export failed: {}", e)))
}

/// Parse and validate an export. Every failure, whether syntax or a broken
/// graph invariant, is reported as `MalformedImport`.
pub fn import_from_file(bytes: &[u8], taxonomy: &Taxonomy) -> Result<ImportedArchitecture> {
    let doc: ExportDocument = serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedImport(e.to_string()))?;
    let mut snapshot = GraphSnapshot {
        nodes: doc.nodes,
        edges: doc.edges,
    };
    validate_snapshot(taxonomy, &mut snapshot)
        .map_err(|e| Error::MalformedImport(e.to_string()))?;
    debug!(
        "imported '{}' (v{}): {} node(s), {} edge(s)",
        doc.name,
        doc.version,
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(ImportedArchitecture {
        name: doc.name,
        snapshot,
    })
}

/// Download name for an export: whitespace runs become `_`.
pub fn export_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 5);
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    if out.is_empty() {
        out.push_str("architecture");
    }
    out.push_str(".json");
    out
}

/// JSON Schema of [`ExportDocument`], for hosts that pre-validate files.
pub fn export_schema() -> schemars::Schema {
    schemars::schema_for!(ExportDocument)
}
