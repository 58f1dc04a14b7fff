//! Canvas interaction state machine.
//!
//! The controller consumes pointer, keyboard and catalog events and turns
//! completed gestures into graph mutations. It owns the [`GraphModel`] and
//! only hands out shared references to it, so every write goes through
//! [`Controller::handle`] or [`Controller::install`].
//!
//! Exactly one [`InteractionState`] is active at a time. Events that make no
//! sense in the current state are ignored. Graph errors never escape: they
//! are queued as [`Notice`]s and the machine lands in a stable state.

use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::GraphModel;
use crate::rules::ConnectionRules;
use crate::taxonomy::{Provider, Taxonomy};
use crate::{ConnectionKind, Edge, Error, GraphSnapshot, Node, Position, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// A catalog item has been picked up but not dropped.
    DraggingNewNode {
        provider: Provider,
        resource_type: String,
    },
    /// Pointer went down on a node's connection handle.
    ConnectingEdge { source_id: String },
    /// A node has focus; the property panel is live.
    NodeSelected { node_id: String },
    EditingLabel { node_id: String },
}

impl InteractionState {
    /// Node the property panel is bound to.
    pub fn focused_node(&self) -> Option<&str> {
        match self {
            Self::NodeSelected { node_id } | Self::EditingLabel { node_id } => Some(node_id),
            _ => None,
        }
    }
}

/// Drag payload handed over by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPayload {
    pub provider: String,
    pub resource_type: String,
}

impl CatalogPayload {
    pub fn new(provider: &str, resource_type: &str) -> Self {
        Self {
            provider: provider.to_string(),
            resource_type: resource_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Node(String),
    /// The label of a node, as opposed to its body.
    NodeLabel(String),
    Canvas,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CatalogDragStart(CatalogPayload),
    DropOnCanvas { position: Position },
    DropOutsideCanvas,
    /// Escape: abandons whatever gesture is in progress.
    Cancel,
    PointerDownOnHandle { node_id: String },
    PointerUpOnNode { node_id: String },
    PointerUpOnCanvas,
    Click(ClickTarget),
    /// Delete key or delete button.
    Delete,
    CommitLabel { label: String },
    PropertyChange { key: String, value: String },
    MoveNode { node_id: String, position: Position },
    DeleteEdge { edge_id: String },
    ClearCanvas,
}

/// A committed graph mutation, for the host to redraw from.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    NodeAdded(Node),
    NodeRemoved {
        node_id: String,
        removed_edges: Vec<String>,
    },
    NodeRenamed { node_id: String, label: String },
    PropertySet {
        node_id: String,
        key: String,
        value: String,
    },
    NodeMoved { node_id: String, position: Position },
    EdgeAdded(Edge),
    EdgeRemoved { edge_id: String },
    Cleared,
}

/// Non-blocking message for the user. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub cause: Error,
}

impl From<Error> for Notice {
    fn from(cause: Error) -> Self {
        Self {
            message: cause.notice(),
            cause,
        }
    }
}

pub struct Controller {
    graph: GraphModel,
    rules: ConnectionRules,
    state: InteractionState,
    notices: Vec<Notice>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Taxonomy::builtin(), ConnectionRules::default())
    }
}

impl Controller {
    pub fn new(taxonomy: Arc<Taxonomy>, rules: ConnectionRules) -> Self {
        Self {
            graph: GraphModel::new(taxonomy),
            rules,
            state: InteractionState::Idle,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    /// Node whose property panel is open, if any.
    pub fn selected_node(&self) -> Option<&Node> {
        self.state
            .focused_node()
            .and_then(|id| self.graph.node(id))
    }

    /// Drain pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        mem::take(&mut self.notices)
    }

    /// Atomically replace the graph, e.g. after a load or import. Any gesture
    /// in progress is abandoned. On error neither graph nor state changes.
    pub fn install(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        self.graph.restore(snapshot)?;
        self.state = InteractionState::Idle;
        Ok(())
    }

    pub fn handle(&mut self, event: Event) -> Option<Change> {
        let previous = mem::replace(&mut self.state, InteractionState::Idle);
        let from = previous.clone();
        let (next, change) = self.transition(previous, event);
        if next != from {
            debug!("interaction state {:?} -> {:?}", from, next);
        }
        self.state = next;
        change
    }

    fn reject(&mut self, err: Error) {
        debug!("gesture rejected: {}", err);
        self.notices.push(Notice::from(err));
    }

    fn transition(
        &mut self,
        state: InteractionState,
        event: Event,
    ) -> (InteractionState, Option<Change>) {
        use InteractionState as S;

        match (state, event) {
            // Catalog drag-and-drop.
            (S::Idle | S::NodeSelected { .. }, Event::CatalogDragStart(payload)) => {
                let taxonomy = self.graph.taxonomy();
                match taxonomy.lookup(&payload.provider, &payload.resource_type) {
                    Ok(spec) => (
                        S::DraggingNewNode {
                            provider: spec.provider,
                            resource_type: payload.resource_type,
                        },
                        None,
                    ),
                    Err(err) => {
                        debug!("ignoring catalog payload: {}", err);
                        (S::Idle, None)
                    }
                }
            }
            (
                S::DraggingNewNode {
                    provider,
                    resource_type,
                },
                Event::DropOnCanvas { position },
            ) => {
                let provider = provider.as_str();
                match self.graph.add_node(provider, &resource_type, position) {
                    Ok(node) => (S::Idle, Some(Change::NodeAdded(node))),
                    Err(err) => {
                        self.reject(err);
                        (S::Idle, None)
                    }
                }
            }
            (S::DraggingNewNode { .. }, Event::DropOutsideCanvas | Event::Cancel) => {
                (S::Idle, None)
            }

            // Edge drawing.
            (S::Idle | S::NodeSelected { .. }, Event::PointerDownOnHandle { node_id }) => {
                if self.graph.node(&node_id).is_some() {
                    (S::ConnectingEdge { source_id: node_id }, None)
                } else {
                    self.reject(Error::NodeNotFound(node_id));
                    (S::Idle, None)
                }
            }
            (S::ConnectingEdge { source_id }, Event::PointerUpOnNode { node_id }) => {
                let change = match self.connect(&source_id, &node_id) {
                    Ok(edge) => Some(Change::EdgeAdded(edge)),
                    Err(err) => {
                        self.reject(err);
                        None
                    }
                };
                (S::Idle, change)
            }
            (S::ConnectingEdge { .. }, Event::PointerUpOnCanvas | Event::Cancel) => {
                (S::Idle, None)
            }

            // Selection.
            (S::NodeSelected { node_id }, Event::Click(ClickTarget::NodeLabel(id)))
                if id == node_id =>
            {
                (S::EditingLabel { node_id }, None)
            }
            (
                S::Idle | S::NodeSelected { .. },
                Event::Click(ClickTarget::Node(id) | ClickTarget::NodeLabel(id)),
            ) => self.select(id),
            (S::NodeSelected { .. }, Event::Click(ClickTarget::Canvas) | Event::Cancel) => {
                (S::Idle, None)
            }

            (S::NodeSelected { node_id }, Event::Delete) => {
                let removed_edges = self.graph.remove_node(&node_id);
                let change = Change::NodeRemoved {
                    node_id,
                    removed_edges,
                };
                (S::Idle, Some(change))
            }

            // Label editing.
            (S::EditingLabel { node_id }, Event::CommitLabel { label }) => {
                let label = label.trim().to_string();
                if label.is_empty() {
                    return (S::NodeSelected { node_id }, None);
                }
                match self.graph.rename_node(&node_id, &label) {
                    Ok(()) => {
                        let change = Change::NodeRenamed {
                            node_id: node_id.clone(),
                            label,
                        };
                        (S::NodeSelected { node_id }, Some(change))
                    }
                    Err(err) => {
                        self.reject(err);
                        (S::Idle, None)
                    }
                }
            }
            (S::EditingLabel { node_id }, Event::Cancel) => (S::NodeSelected { node_id }, None),

            // Property panel: applied eagerly, no commit step.
            (
                state @ (S::NodeSelected { .. } | S::EditingLabel { .. }),
                Event::PropertyChange { key, value },
            ) => {
                let node_id = state.focused_node().unwrap_or_default().to_string();
                match self.graph.set_property(&node_id, &key, &value) {
                    Ok(()) => {
                        let change = Change::PropertySet {
                            node_id,
                            key,
                            value,
                        };
                        (state, Some(change))
                    }
                    Err(err) => {
                        self.reject(err);
                        (S::Idle, None)
                    }
                }
            }

            // Canvas-wide edits, available whenever no gesture is in flight.
            (
                state @ (S::Idle | S::NodeSelected { .. }),
                Event::MoveNode { node_id, position },
            ) => {
                match self.graph.move_node(&node_id, position) {
                    Ok(()) => (state, Some(Change::NodeMoved { node_id, position })),
                    Err(err) => {
                        self.reject(err);
                        (self.stable(state), None)
                    }
                }
            }
            (state @ (S::Idle | S::NodeSelected { .. }), Event::DeleteEdge { edge_id }) => {
                let change = self
                    .graph
                    .remove_edge(&edge_id)
                    .map(|_| Change::EdgeRemoved { edge_id });
                (state, change)
            }
            (S::Idle | S::NodeSelected { .. }, Event::ClearCanvas) => {
                self.graph.clear();
                (S::Idle, Some(Change::Cleared))
            }

            (state, event) => {
                debug!("ignoring {:?} in {:?}", event, state);
                (state, None)
            }
        }
    }

    fn select(&mut self, node_id: String) -> (InteractionState, Option<Change>) {
        if self.graph.node(&node_id).is_some() {
            (InteractionState::NodeSelected { node_id }, None)
        } else {
            self.reject(Error::NodeNotFound(node_id));
            (InteractionState::Idle, None)
        }
    }

    /// Fall back to `Idle` if the state refers to a node that is gone.
    fn stable(&self, state: InteractionState) -> InteractionState {
        match &state {
            InteractionState::NodeSelected { node_id } if self.graph.node(node_id).is_none() => {
                InteractionState::Idle
            }
            _ => state,
        }
    }

    /// Rule check then graph insert. The rule table is consulted before the
    /// model so a rejected connection never reaches it.
    fn connect(&mut self, source_id: &str, target_id: &str) -> Result<Edge> {
        let source = self
            .graph
            .node(source_id)
            .ok_or_else(|| Error::NodeNotFound(source_id.to_string()))?;
        let target = self
            .graph
            .node(target_id)
            .ok_or_else(|| Error::NodeNotFound(target_id.to_string()))?;
        if source.id == target.id {
            return Err(Error::SelfLoopNotAllowed(source.id.clone()));
        }
        let (from, to) = (source.category, target.category);
        if let Some(reason) = self.rules.reason_if_invalid(from, to) {
            return Err(Error::InvalidConnection {
                from: source.label.clone(),
                to: target.label.clone(),
                reason,
            });
        }
        let kind = ConnectionKind::infer(from, to);
        self.graph.add_edge(source_id, target_id, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::import_from_file;
    use crate::make_edge_id;

    fn drop_node(c: &mut Controller, provider: &str, resource_type: &str) -> Node {
        c.handle(pick_up(provider, resource_type));
        let position = Position::new(100.0, 50.0);
        match c.handle(Event::DropOnCanvas { position }) {
            Some(Change::NodeAdded(node)) => node,
            other => panic!("expected NodeAdded, got {:?}", other),
        }
    }

    fn drag_connect(c: &mut Controller, from: &str, to: &str) -> Option<Change> {
        c.handle(Event::PointerDownOnHandle {
            node_id: from.to_string(),
        });
        c.handle(Event::PointerUpOnNode {
            node_id: to.to_string(),
        })
    }

    fn pick_up(provider: &str, resource_type: &str) -> Event {
        Event::CatalogDragStart(CatalogPayload::new(provider, resource_type))
    }

    fn drop_at(x: f64, y: f64) -> Event {
        let position = Position::new(x, y);
        Event::DropOnCanvas { position }
    }

    fn selected(id: &str) -> InteractionState {
        let node_id = id.to_string();
        InteractionState::NodeSelected { node_id }
    }

    fn editing(id: &str) -> InteractionState {
        let node_id = id.to_string();
        InteractionState::EditingLabel { node_id }
    }

    fn property(key: &str, value: &str) -> Event {
        Event::PropertyChange {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn drop_creates_node_and_returns_to_idle() {
        let mut c = Controller::default();
        c.handle(pick_up("AWS", "EC2"));
        let state = c.state();
        assert!(matches!(state, InteractionState::DraggingNewNode { .. }));
        let change = c.handle(drop_at(1.0, 2.0));
        assert!(matches!(change, Some(Change::NodeAdded(_))));
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.graph().node_count(), 1);
    }

    #[test]
    fn drop_outside_canvas_does_nothing() {
        let mut c = Controller::default();
        c.handle(pick_up("GCP", "SQL"));
        assert_eq!(c.handle(Event::DropOutsideCanvas), None);
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.graph().node_count(), 0);
    }

    #[test]
    fn cancel_mid_drag_adds_nothing() {
        let mut c = Controller::default();
        c.handle(pick_up("AWS", "Lambda"));
        assert_eq!(c.handle(Event::Cancel), None);
        assert_eq!(c.state(), &InteractionState::Idle);

        // The abandoned payload is gone: a later drop is out of place.
        assert_eq!(c.handle(drop_at(5.0, 5.0)), None);
        assert_eq!(c.graph().node_count(), 0);
        assert!(c.take_notices().is_empty());
    }

    #[test]
    fn invalid_catalog_payload_aborts_silently() {
        let mut c = Controller::default();
        c.handle(pick_up("AWS", "Mainframe"));
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.handle(drop_at(0.0, 0.0)), None);
        assert_eq!(c.graph().node_count(), 0);
        assert!(c.take_notices().is_empty());
    }

    #[test]
    fn compute_to_database_connects() {
        let mut c = Controller::default();
        let web = drop_node(&mut c, "AWS", "EC2");
        let db = drop_node(&mut c, "AWS", "RDS");
        let change = drag_connect(&mut c, &web.id, &db.id);
        match change {
            Some(Change::EdgeAdded(edge)) => {
                assert_eq!(edge.source, web.id);
                assert_eq!(edge.target, db.id);
                assert_eq!(edge.connection_kind, ConnectionKind::Data);
            }
            other => panic!("expected EdgeAdded, got {:?}", other),
        }
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.graph().edge_count(), 1);
    }

    #[test]
    fn storage_to_database_is_rejected_before_the_model() {
        let mut c = Controller::default();
        let bucket = drop_node(&mut c, "AWS", "S3");
        let db = drop_node(&mut c, "AWS", "RDS");
        assert_eq!(drag_connect(&mut c, &bucket.id, &db.id), None);
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.graph().edge_count(), 0);

        let notices = c.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0].cause, Error::InvalidConnection { .. }));
    }

    #[test]
    fn duplicate_and_self_loop_are_surfaced() {
        let mut c = Controller::default();
        let web = drop_node(&mut c, "Azure", "VM");
        let db = drop_node(&mut c, "Azure", "SQL");
        assert!(drag_connect(&mut c, &web.id, &db.id).is_some());
        assert_eq!(drag_connect(&mut c, &web.id, &db.id), None);
        assert_eq!(drag_connect(&mut c, &web.id, &web.id), None);

        let causes: Vec<Error> = c.take_notices().into_iter().map(|n| n.cause).collect();
        assert!(matches!(causes[0], Error::DuplicateEdge { .. }));
        assert_eq!(causes[1], Error::SelfLoopNotAllowed(web.id.clone()));
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.graph().edge_count(), 1);
    }

    #[test]
    fn release_over_empty_canvas_abandons_connection() {
        let mut c = Controller::default();
        let a = drop_node(&mut c, "AWS", "EC2");
        let source_id = a.id.clone();
        c.handle(Event::PointerDownOnHandle { node_id: a.id });
        assert_eq!(c.state(), &InteractionState::ConnectingEdge { source_id });
        assert_eq!(c.handle(Event::PointerUpOnCanvas), None);
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.graph().edge_count(), 0);
    }

    #[test]
    fn cancel_mid_connection_adds_no_edge() {
        let mut c = Controller::default();
        let web = drop_node(&mut c, "AWS", "EC2");
        let db = drop_node(&mut c, "AWS", "RDS");
        c.handle(Event::PointerDownOnHandle {
            node_id: web.id.clone(),
        });
        assert_eq!(c.handle(Event::Cancel), None);
        assert_eq!(c.state(), &InteractionState::Idle);

        // Releasing over a valid target afterwards connects nothing.
        assert_eq!(c.handle(Event::PointerUpOnNode { node_id: db.id }), None);
        assert_eq!(c.graph().edge_count(), 0);
        assert!(c.take_notices().is_empty());
    }

    #[test]
    fn select_edit_label_and_delete() {
        let mut c = Controller::default();
        let n = drop_node(&mut c, "Kubernetes", "Pod");
        c.handle(Event::Click(ClickTarget::Node(n.id.clone())));
        assert_eq!(c.state(), &selected(&n.id));

        c.handle(Event::Click(ClickTarget::NodeLabel(n.id.clone())));
        assert_eq!(c.state(), &editing(&n.id));

        // Delete while typing must not remove the node.
        assert_eq!(c.handle(Event::Delete), None);
        assert_eq!(c.graph().node_count(), 1);

        let label = "Web Server".to_string();
        let change = c.handle(Event::CommitLabel {
            label: label.clone(),
        });
        let renamed = Change::NodeRenamed {
            node_id: n.id.clone(),
            label,
        };
        assert_eq!(change, Some(renamed));
        assert_eq!(c.state(), &selected(&n.id));

        let change = c.handle(Event::Delete);
        assert!(matches!(change, Some(Change::NodeRemoved { .. })));
        assert_eq!(c.state(), &InteractionState::Idle);
        let snap = c.snapshot();
        assert!(snap.nodes.is_empty());
        assert!(snap.edges.is_empty());
    }

    #[test]
    fn deleting_a_connected_node_reports_cascaded_edges() {
        let mut c = Controller::default();
        let lb = drop_node(&mut c, "AWS", "ELB");
        let web = drop_node(&mut c, "AWS", "EC2");
        let db = drop_node(&mut c, "AWS", "RDS");
        let mut cascaded = Vec::new();
        for (from, to) in [(&lb.id, &web.id), (&web.id, &db.id)] {
            match drag_connect(&mut c, from, to) {
                Some(Change::EdgeAdded(edge)) => cascaded.push(edge.id),
                other => panic!("expected EdgeAdded, got {:?}", other),
            }
        }
        assert_eq!(c.graph().edge_count(), 2);

        c.handle(Event::Click(ClickTarget::Node(web.id.clone())));
        let removed = match c.handle(Event::Delete) {
            Some(Change::NodeRemoved {
                node_id,
                removed_edges,
            }) => {
                assert_eq!(node_id, web.id);
                removed_edges
            }
            other => panic!("expected NodeRemoved, got {:?}", other),
        };
        assert_eq!(removed, cascaded);
        assert_eq!(c.graph().edge_count(), 0);
        assert_eq!(c.graph().node_count(), 2);
        assert!(c.graph().node(&web.id).is_none());
    }

    #[test]
    fn cancel_label_edit_keeps_label() {
        let mut c = Controller::default();
        let n = drop_node(&mut c, "GCP", "Compute");
        c.handle(Event::Click(ClickTarget::Node(n.id.clone())));
        c.handle(Event::Click(ClickTarget::NodeLabel(n.id.clone())));
        assert_eq!(c.handle(Event::Cancel), None);
        assert_eq!(c.state(), &selected(&n.id));
        assert_eq!(c.graph().node(&n.id).unwrap().label, "Compute");
    }

    #[test]
    fn blank_label_commit_is_a_cancel() {
        let mut c = Controller::default();
        let n = drop_node(&mut c, "GCP", "Compute");
        c.handle(Event::Click(ClickTarget::Node(n.id.clone())));
        c.handle(Event::Click(ClickTarget::NodeLabel(n.id.clone())));
        let blank = "   ".to_string();
        assert_eq!(c.handle(Event::CommitLabel { label: blank }), None);
        assert_eq!(c.graph().node(&n.id).unwrap().label, "Compute");
    }

    #[test]
    fn selection_moves_between_nodes_and_clears_on_canvas_click() {
        let mut c = Controller::default();
        let a = drop_node(&mut c, "AWS", "EC2");
        let b = drop_node(&mut c, "AWS", "S3");
        c.handle(Event::Click(ClickTarget::Node(a.id.clone())));
        c.handle(Event::Click(ClickTarget::NodeLabel(b.id.clone())));
        assert_eq!(c.state(), &selected(&b.id));
        c.handle(Event::Click(ClickTarget::Canvas));
        assert_eq!(c.state(), &InteractionState::Idle);
        assert!(c.selected_node().is_none());
    }

    #[test]
    fn property_changes_apply_eagerly() {
        let mut c = Controller::default();
        let n = drop_node(&mut c, "AWS", "EC2");
        c.handle(Event::Click(ClickTarget::Node(n.id.clone())));
        for value in ["t", "t3", "t3.large"] {
            c.handle(property("instance_type", value));
        }
        let node = c.selected_node().unwrap();
        let instance_type = node.properties.get("instance_type");
        assert_eq!(instance_type.map(String::as_str), Some("t3.large"));

        // Without a selection the change goes nowhere.
        c.handle(Event::Click(ClickTarget::Canvas));
        assert_eq!(c.handle(property("region", "eu-west-1")), None);
        let region = c.graph().node(&n.id).unwrap().properties.get("region");
        assert_eq!(region.map(String::as_str), Some("us-east-1"));
    }

    #[test]
    fn events_out_of_place_are_ignored() {
        let mut c = Controller::default();
        assert_eq!(c.handle(drop_at(0.0, 0.0)), None);
        let node_id = "node-1".to_string();
        assert_eq!(c.handle(Event::PointerUpOnNode { node_id }), None);
        let label = "x".to_string();
        assert_eq!(c.handle(Event::CommitLabel { label }), None);
        assert_eq!(c.handle(Event::Delete), None);
        assert_eq!(c.state(), &InteractionState::Idle);

        c.handle(pick_up("AWS", "EC2"));
        // Clicking mid-drag does not start a selection.
        c.handle(Event::Click(ClickTarget::Canvas));
        let state = c.state();
        assert!(matches!(state, InteractionState::DraggingNewNode { .. }));
    }

    #[test]
    fn click_on_missing_node_lands_idle_with_notice() {
        let mut c = Controller::default();
        c.handle(Event::Click(ClickTarget::Node("node-404".into())));
        assert_eq!(c.state(), &InteractionState::Idle);
        let expected = Error::NodeNotFound("node-404".into());
        assert_eq!(c.take_notices()[0].cause, expected);
    }

    #[test]
    fn move_delete_edge_and_clear() {
        let mut c = Controller::default();
        let a = drop_node(&mut c, "AWS", "Lambda");
        let b = drop_node(&mut c, "AWS", "S3");
        let edge = match drag_connect(&mut c, &a.id, &b.id) {
            Some(Change::EdgeAdded(e)) => e,
            other => panic!("expected EdgeAdded, got {:?}", other),
        };

        let to = Position::new(300.0, 400.0);
        c.handle(Event::MoveNode {
            node_id: a.id.clone(),
            position: to,
        });
        assert_eq!(c.graph().node(&a.id).unwrap().position, to);

        let edge_id = edge.id.clone();
        let change = c.handle(Event::DeleteEdge { edge_id });
        assert_eq!(change, Some(Change::EdgeRemoved { edge_id: edge.id }));
        let edge_id = make_edge_id(&a.id, &b.id);
        assert_eq!(c.handle(Event::DeleteEdge { edge_id }), None);

        assert_eq!(c.handle(Event::ClearCanvas), Some(Change::Cleared));
        assert!(c.snapshot().is_empty());
    }

    #[test]
    fn install_replaces_graph_and_resets_state() {
        let mut source = Controller::default();
        let a = drop_node(&mut source, "AWS", "EC2");
        let b = drop_node(&mut source, "AWS", "RDS");
        drag_connect(&mut source, &a.id, &b.id);
        let snapshot = source.snapshot();

        let mut c = Controller::default();
        let n = drop_node(&mut c, "GCP", "VPC");
        c.handle(Event::Click(ClickTarget::Node(n.id)));
        c.install(snapshot.clone()).unwrap();
        assert_eq!(c.state(), &InteractionState::Idle);
        assert_eq!(c.snapshot(), snapshot);
    }

    #[test]
    fn failed_install_leaves_everything_untouched() {
        let mut c = Controller::default();
        let n = drop_node(&mut c, "GCP", "VPC");
        c.handle(Event::Click(ClickTarget::Node(n.id.clone())));
        let before = c.snapshot();

        let mut bad = before.clone();
        bad.nodes.push(bad.nodes[0].clone());
        assert!(c.install(bad).is_err());
        assert_eq!(c.snapshot(), before);
        assert_eq!(c.state(), &selected(&n.id));
    }

    #[test]
    fn installing_an_import_with_the_largest_node_id_keeps_working() {
        let json = br#"{
            "name": "Edge of the counter",
            "nodes": [{
                "id": "node-18446744073709551615", "provider": "AWS", "resourceType": "EC2",
                "category": "compute", "label": "last",
                "position": {"x": 0.0, "y": 0.0}, "properties": {}
            }],
            "edges": []
        }"#;
        let taxonomy = Taxonomy::builtin();
        let imported = import_from_file(json, &taxonomy).unwrap();

        let mut c = Controller::default();
        c.install(imported.snapshot).unwrap();
        let a = drop_node(&mut c, "AWS", "RDS");
        let b = drop_node(&mut c, "AWS", "RDS");
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, "node-18446744073709551615");
        assert_eq!(c.graph().node_count(), 3);
    }
}
