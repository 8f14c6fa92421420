//! Circuit topology: typed nodes joined by wire edges.
//!
//! [`CircuitGraph`] owns the electrical layout of one training circuit. It
//! stores nodes under caller-supplied string ids and edges in a slotmap, so
//! edge handles stay valid across unrelated removals. Iteration follows
//! insertion order everywhere, which keeps propagation results and event
//! order reproducible for a fixed build sequence.
//!
//! The graph is pure topology plus one derived bit per node (`energized`),
//! written only by [`EnergyPropagator`](crate::power::EnergyPropagator).
//! Removing a node removes every edge touching it in the same call; the
//! graph never holds a dangling endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::debug;

use crate::id::{DeviceId, EdgeId, NodeId};

// ---------------------------------------------------------------------------
// Node and wire kinds
// ---------------------------------------------------------------------------

/// What a circuit node is. The kind decides whether the node gates power
/// flow during propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Service panel. Every propagation starts here; panels are always hot.
    Panel,
    /// Circuit breaker. Passes power only while its device reports on.
    Breaker,
    /// Receptacle. Accepts power and passes it through to daisy-chained
    /// neighbors.
    Outlet,
    /// Wall switch. Passes power only while its device reports on.
    Switch,
    /// Junction box. Joins wire runs, never gates.
    Junction,
    /// Light or appliance. Terminal like an outlet.
    Fixture,
    /// Ground-fault interrupter. Blocks power while tripped.
    Gfci,
}

/// Which conductor an edge models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireKind {
    Hot,
    Neutral,
    Ground,
}

// ---------------------------------------------------------------------------
// Graph entities
// ---------------------------------------------------------------------------

/// A point in the circuit: panel, device, or termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Host device consulted by propagation for gating kinds. `None` means
    /// the node always passes.
    pub device: Option<DeviceId>,
    /// Result of the most recent propagation sweep. False until one runs.
    pub energized: bool,
}

/// A run of wire between two nodes.
///
/// Endpoint order is identity only: `(a, b)` and `(b, a)` are distinct
/// edges. Traversal treats every edge as bidirectional regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub wire: WireKind,
    /// Physically joined. Separated wires block both propagation and
    /// continuity until reconnected.
    pub connected: bool,
}

impl CircuitEdge {
    /// The endpoint opposite `id`, if `id` is an endpoint at all.
    pub fn other_end(&self, id: &NodeId) -> Option<&NodeId> {
        if self.from == *id {
            Some(&self.to)
        } else if self.to == *id {
            Some(&self.from)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Insert outcome
// ---------------------------------------------------------------------------

/// Outcome of an idempotent insert.
///
/// Duplicate inserts hand back the pre-existing entity instead of erroring,
/// so circuit setup code can run twice without damage while callers can
/// still tell which inserts were fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert<T> {
    /// Created by this call.
    Added(T),
    /// An identical entity was already present; nothing changed.
    Existing(T),
}

impl<T> Insert<T> {
    /// The inserted or pre-existing entity, either way.
    pub fn entity(self) -> T {
        match self {
            Insert::Added(e) | Insert::Existing(e) => e,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Insert::Added(_))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The referenced node id is not in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    /// No edge has the given ordered endpoints.
    #[error("no edge from {from} to {to}")]
    EdgeNotFound { from: NodeId, to: NodeId },
}

// ---------------------------------------------------------------------------
// CircuitGraph
// ---------------------------------------------------------------------------

/// Electrical topology for one training circuit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitGraph {
    nodes: HashMap<NodeId, CircuitNode>,
    /// Node ids in insertion order; drives every deterministic iteration.
    order: Vec<NodeId>,
    edges: SlotMap<EdgeId, CircuitEdge>,
    /// Edge ids touching each node, insertion order. Self-loops appear once.
    adjacency: HashMap<NodeId, Vec<EdgeId>>,
}

impl CircuitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -- nodes ---------------------------------------------------------------

    /// Add a node. A duplicate id leaves the graph untouched and returns
    /// [`Insert::Existing`] with the original id.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        kind: NodeKind,
        device: Option<DeviceId>,
    ) -> Insert<NodeId> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            debug!(id = %id, "add_node: id already present");
            return Insert::Existing(id);
        }
        self.order.push(id.clone());
        self.adjacency.insert(id.clone(), Vec::new());
        self.nodes.insert(
            id.clone(),
            CircuitNode {
                id: id.clone(),
                kind,
                device,
                energized: false,
            },
        );
        Insert::Added(id)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            debug!(id, "remove_node: unknown node");
            return Err(GraphError::NodeNotFound(NodeId::new(id)));
        }
        let touching = self.adjacency.get(id).cloned().unwrap_or_default();
        for eid in touching {
            self.remove_edge_by_id(eid);
        }
        self.adjacency.remove(id);
        self.nodes.remove(id);
        self.order.retain(|n| n.as_str() != id);
        Ok(())
    }

    // -- edges ---------------------------------------------------------------

    /// Add a wire between two existing nodes, connected by default.
    ///
    /// An edge with identical `(from, to, wire)` already in the graph comes
    /// back as [`Insert::Existing`] with its id; nothing is changed.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        wire: WireKind,
    ) -> Result<Insert<EdgeId>, GraphError> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        if let Some(existing) = self.find_edge(&from, &to, wire) {
            debug!(from = %from, to = %to, "add_edge: edge already present");
            return Ok(Insert::Existing(existing));
        }
        let eid = self.edges.insert(CircuitEdge {
            from: from.clone(),
            to: to.clone(),
            wire,
            connected: true,
        });
        if let Some(list) = self.adjacency.get_mut(&from) {
            list.push(eid);
        }
        if to != from
            && let Some(list) = self.adjacency.get_mut(&to)
        {
            list.push(eid);
        }
        Ok(Insert::Added(eid))
    }

    /// Remove every edge whose ordered endpoints are `(from, to)`.
    /// Returns how many edges went away.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> Result<usize, GraphError> {
        let matches = self.matching_edges(from, to)?;
        for &eid in &matches {
            self.remove_edge_by_id(eid);
        }
        Ok(matches.len())
    }

    /// Mark every `(from, to)` edge physically separated. Separated wires
    /// stop carrying power and fail continuity until reconnected.
    pub fn disconnect_edge(&mut self, from: &str, to: &str) -> Result<usize, GraphError> {
        self.set_connected(from, to, false)
    }

    /// Re-join every `(from, to)` edge.
    pub fn reconnect_edge(&mut self, from: &str, to: &str) -> Result<usize, GraphError> {
        self.set_connected(from, to, true)
    }

    // -- queries -------------------------------------------------------------

    pub fn node(&self, id: &str) -> Option<&CircuitNode> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&CircuitEdge> {
        self.edges.get(id)
    }

    /// Edges touching `id` (either endpoint), insertion order.
    pub fn edges_of(&self, id: &str) -> Result<&[EdgeId], GraphError> {
        match self.adjacency.get(id) {
            Some(list) => Ok(list),
            None => {
                debug!(id, "edges_of: unknown node");
                Err(GraphError::NodeNotFound(NodeId::new(id)))
            }
        }
    }

    /// Nodes of one kind, insertion order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &CircuitNode> + '_ {
        self.nodes().filter(move |n| n.kind == kind)
    }

    /// All nodes, insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &CircuitNode> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &CircuitEdge)> + '_ {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the last propagation reached `id`. False for unknown ids and
    /// before any propagation has run.
    pub fn is_energized(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|n| n.energized)
    }

    /// Ids of currently energized nodes, insertion order.
    pub fn energized_ids(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|id| self.is_energized(id.as_str()))
            .cloned()
            .collect()
    }

    // -- crate-internal support ------------------------------------------------

    pub(crate) fn node_order(&self) -> &[NodeId] {
        &self.order
    }

    pub(crate) fn adjacent_edges(&self, id: &NodeId) -> &[EdgeId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn clear_energized(&mut self) {
        for node in self.nodes.values_mut() {
            node.energized = false;
        }
    }

    pub(crate) fn set_energized(&mut self, id: &NodeId, energized: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.energized = energized;
        }
    }

    // -- internals -------------------------------------------------------------

    fn resolve(&self, id: &str) -> Result<NodeId, GraphError> {
        match self.nodes.get(id) {
            Some(node) => Ok(node.id.clone()),
            None => {
                debug!(id, "unknown node");
                Err(GraphError::NodeNotFound(NodeId::new(id)))
            }
        }
    }

    fn find_edge(&self, from: &NodeId, to: &NodeId, wire: WireKind) -> Option<EdgeId> {
        self.adjacency.get(from)?.iter().copied().find(|&eid| {
            self.edges
                .get(eid)
                .is_some_and(|e| e.from == *from && e.to == *to && e.wire == wire)
        })
    }

    /// All edges with ordered endpoints `(from, to)`. Unknown ids error as
    /// [`GraphError::NodeNotFound`]; known ids with no edge as
    /// [`GraphError::EdgeNotFound`].
    fn matching_edges(&self, from: &str, to: &str) -> Result<Vec<EdgeId>, GraphError> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        let found: Vec<EdgeId> = self
            .adjacency
            .get(&from)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|&eid| {
                        self.edges
                            .get(eid)
                            .is_some_and(|e| e.from == from && e.to == to)
                    })
                    .collect()
            })
            .unwrap_or_default();
        if found.is_empty() {
            debug!(from = %from, to = %to, "no edge between endpoints");
            return Err(GraphError::EdgeNotFound { from, to });
        }
        Ok(found)
    }

    fn set_connected(
        &mut self,
        from: &str,
        to: &str,
        connected: bool,
    ) -> Result<usize, GraphError> {
        let matches = self.matching_edges(from, to)?;
        for &eid in &matches {
            if let Some(edge) = self.edges.get_mut(eid) {
                edge.connected = connected;
            }
        }
        Ok(matches.len())
    }

    fn remove_edge_by_id(&mut self, eid: EdgeId) {
        if let Some(edge) = self.edges.remove(eid) {
            if let Some(list) = self.adjacency.get_mut(&edge.from) {
                list.retain(|&e| e != eid);
            }
            if edge.to != edge.from
                && let Some(list) = self.adjacency.get_mut(&edge.to)
            {
                list.retain(|&e| e != eid);
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
