//! In-memory node/edge graph with invariant-preserving mutations.
//!
//! Every operation is atomic: it either applies fully or leaves the graph
//! exactly as it was. The model holds no locks; the interaction controller
//! is its only writer.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::taxonomy::Taxonomy;
use crate::{
    make_edge_id, node_seq, ConnectionKind, Edge, Error, GraphSnapshot, Node, Position, Result,
};

#[derive(Debug, Clone)]
pub struct GraphModel {
    taxonomy: Arc<Taxonomy>,
    nodes: IndexMap<String, Node>,
    edges: IndexMap<String, Edge>,
    /// Next node sequence number. Only ever grows, so ids of deleted nodes
    /// are not handed out again. Wraps to 1 past `u64::MAX`; allocation then
    /// skips ids still in use.
    next_node_seq: u64,
}

impl GraphModel {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            taxonomy,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            next_node_seq: 1,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges with `id` as either endpoint.
    pub fn edges_touching<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .values()
            .filter(move |e| e.source == id || e.target == id)
    }

    pub fn has_edge_between(&self, source: &str, target: &str) -> bool {
        self.edges
            .values()
            .any(|e| e.source == source && e.target == target)
    }

    fn allocate_node_id(&mut self) -> String {
        loop {
            let id = format!("node-{}", self.next_node_seq);
            self.next_node_seq = self.next_node_seq.checked_add(1).unwrap_or(1);
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn allocate_edge_id(&self, source: &str, target: &str) -> String {
        let base = make_edge_id(source, target);
        if !self.edges.contains_key(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let id = format!("{}-{}", base, n);
            if !self.edges.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    pub fn add_node(
        &mut self,
        provider: &str,
        resource_type: &str,
        position: Position,
    ) -> Result<Node> {
        let spec = self.taxonomy.lookup(provider, resource_type)?;
        if !position.is_finite() {
            return Err(Error::Validation("node position must be finite".into()));
        }
        let (provider, category) = (spec.provider, spec.category);
        let properties = spec.template.to_properties();
        let id = self.allocate_node_id();
        let node = Node {
            id: id.clone(),
            provider,
            resource_type: resource_type.to_string(),
            category,
            label: resource_type.to_string(),
            position,
            properties,
        };
        debug!("added {} {} as {}", provider, resource_type, id);
        self.nodes.insert(id, node.clone());
        Ok(node)
    }

    /// Remove a node and every edge touching it. Returns the removed edge ids;
    /// empty when the node was absent.
    pub fn remove_node(&mut self, id: &str) -> Vec<String> {
        if self.nodes.shift_remove(id).is_none() {
            return Vec::new();
        }
        let removed: Vec<String> = self.edges_touching(id).map(|e| e.id.clone()).collect();
        for edge_id in &removed {
            self.edges.shift_remove(edge_id);
        }
        debug!("removed {} and {} edge(s)", id, removed.len());
        removed
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    pub fn rename_node(&mut self, id: &str, label: &str) -> Result<()> {
        self.node_mut(id)?.label = label.to_string();
        Ok(())
    }

    /// Unvalidated, eager property write. Keys are only ever added or
    /// overwritten, never dropped.
    pub fn set_property(&mut self, id: &str, key: &str, value: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        node.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        if !position.is_finite() {
            return Err(Error::Validation("node position must be finite".into()));
        }
        self.node_mut(id)?.position = position;
        Ok(())
    }

    pub fn add_edge(&mut self, source: &str, target: &str, kind: ConnectionKind) -> Result<Edge> {
        if source == target {
            return Err(Error::SelfLoopNotAllowed(source.to_string()));
        }
        for id in [source, target] {
            if !self.nodes.contains_key(id) {
                return Err(Error::NodeNotFound(id.to_string()));
            }
        }
        if self.has_edge_between(source, target) {
            return Err(Error::DuplicateEdge {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        let edge = Edge {
            id: self.allocate_edge_id(source, target),
            source: source.to_string(),
            target: target.to_string(),
            connection_kind: kind,
        };
        debug!("connected {} -> {} as {}", source, target, edge.id);
        self.edges.insert(edge.id.clone(), edge.clone());
        Ok(edge)
    }

    /// No-op when absent.
    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        self.edges.shift_remove(id)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Replace the whole graph. The snapshot is validated first; on error
    /// the current graph is left untouched.
    pub fn restore(&mut self, mut snapshot: GraphSnapshot) -> Result<()> {
        validate_snapshot(&self.taxonomy, &mut snapshot)?;
        let highest = snapshot
            .nodes
            .iter()
            .filter_map(|n| node_seq(&n.id))
            .max()
            .unwrap_or(0);
        self.nodes = snapshot
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        self.edges = snapshot
            .edges
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
        self.next_node_seq = self.next_node_seq.max(highest.saturating_add(1));
        debug!(
            "restored {} node(s), {} edge(s)",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}

/// Check every graph invariant on a snapshot, backfilling template keys a
/// node is missing (older files predate some template keys).
pub fn validate_snapshot(taxonomy: &Taxonomy, snapshot: &mut GraphSnapshot) -> Result<()> {
    let mut node_ids: HashSet<String> = HashSet::new();
    for node in &mut snapshot.nodes {
        if !node_ids.insert(node.id.clone()) {
            return Err(Error::Validation(format!("duplicate node id '{}'", node.id)));
        }
        let spec = taxonomy
            .get(node.provider, &node.resource_type)
            .ok_or_else(|| Error::UnknownResourceType {
                provider: node.provider.to_string(),
                resource_type: node.resource_type.clone(),
            })?;
        if spec.category != node.category {
            return Err(Error::Validation(format!(
                "node '{}' is a {} {} but is tagged {}",
                node.id, node.provider, node.resource_type, node.category
            )));
        }
        if !node.position.is_finite() {
            return Err(Error::Validation(format!("node '{}' has a non-finite position", node.id)));
        }
        for (key, value) in spec.template.to_properties() {
            node.properties.entry(key).or_insert(value);
        }
    }

    let mut edge_ids = HashSet::new();
    let mut pairs = HashSet::new();
    for edge in &snapshot.edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(Error::Validation(format!("duplicate edge id '{}'", edge.id)));
        }
        if edge.source == edge.target {
            return Err(Error::SelfLoopNotAllowed(edge.source.clone()));
        }
        for end in [&edge.source, &edge.target] {
            if !node_ids.contains(end.as_str()) {
                return Err(Error::NodeNotFound(end.clone()));
            }
        }
        if !pairs.insert((edge.source.as_str(), edge.target.as_str())) {
            return Err(Error::DuplicateEdge {
                from: edge.source.clone(),
                to: edge.target.clone(),
            });
        }
    }
    Ok(())
}
