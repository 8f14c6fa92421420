//! Energy propagation: which nodes are hot, given device states.
//!
//! This models power distribution for training circuits, not electrical
//! physics: a node is either energized at nominal voltage or dead. Each
//! sweep clears every flag and runs a breadth-first search outward from all
//! panel nodes across connected edges (in both directions), admitting a
//! neighbor only if its kind-specific pass predicate holds:
//!
//! - panels always pass (they are the source),
//! - breakers pass while their device reports on,
//! - switches pass while their device reports on,
//! - GFCIs pass while not tripped,
//! - outlets, fixtures, and junctions always pass,
//! - any node with no device attached always passes.
//!
//! Device answers come through [`DeviceStateProvider`]; the propagator never
//! sees a concrete device type. Events fire only on *transitions* relative
//! to the previous sweep, so a steady-state re-propagation is silent.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::device::DeviceStateProvider;
use crate::graph::{CircuitGraph, CircuitNode, NodeKind};
use crate::id::NodeId;

/// Default service voltage for residential circuits.
pub const NOMINAL_VOLTAGE: f32 = 120.0;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Emitted by [`EnergyPropagator::propagate`] when a node's energized flag
/// changes, in node insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerEvent {
    NodeEnergized { node: NodeId },
    NodeDeEnergized { node: NodeId },
}

// ---------------------------------------------------------------------------
// Propagator
// ---------------------------------------------------------------------------

/// Recomputes energization across a [`CircuitGraph`].
///
/// Stateless apart from the nominal voltage; results are written into the
/// graph's nodes so reads stay cheap between sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPropagator {
    nominal: f32,
}

impl Default for EnergyPropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyPropagator {
    pub fn new() -> Self {
        Self {
            nominal: NOMINAL_VOLTAGE,
        }
    }

    /// Use a non-standard service voltage (240 V feeders, low-voltage demo
    /// boards).
    pub fn with_nominal(nominal: f32) -> Self {
        Self { nominal }
    }

    pub fn nominal(&self) -> f32 {
        self.nominal
    }

    /// Full sweep. Clears every flag, re-marks reachable nodes, and returns
    /// the transitions. Deterministic for a fixed insertion order.
    pub fn propagate(
        &self,
        graph: &mut CircuitGraph,
        devices: &dyn DeviceStateProvider,
    ) -> Vec<PowerEvent> {
        let before: Vec<(NodeId, bool)> = graph
            .node_order()
            .iter()
            .map(|id| (id.clone(), graph.is_energized(id.as_str())))
            .collect();

        let energized = reachable_energized(graph, devices);

        graph.clear_energized();
        for id in &energized {
            graph.set_energized(id, true);
        }

        let mut events = Vec::new();
        for (id, was) in before {
            let now = energized.contains(&id);
            match (was, now) {
                (false, true) => events.push(PowerEvent::NodeEnergized { node: id }),
                (true, false) => events.push(PowerEvent::NodeDeEnergized { node: id }),
                _ => {}
            }
        }
        events
    }

    /// Meter reading at a point: nominal when energized, zero otherwise
    /// (unknown ids read zero).
    pub fn voltage(&self, graph: &CircuitGraph, id: &str) -> f32 {
        if graph.is_energized(id) {
            self.nominal
        } else {
            0.0
        }
    }
}

/// BFS from all panels over connected edges, admitting nodes whose pass
/// predicate holds. Each node is examined at most once; the predicate is
/// path-independent, so the first answer stands.
fn reachable_energized(
    graph: &CircuitGraph,
    devices: &dyn DeviceStateProvider,
) -> HashSet<NodeId> {
    let mut energized: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for id in graph.node_order() {
        if let Some(node) = graph.node(id.as_str())
            && node.kind == NodeKind::Panel
        {
            energized.insert(id.clone());
            queue.push_back(id.clone());
        }
    }

    let mut examined: HashSet<NodeId> = energized.clone();

    while let Some(current) = queue.pop_front() {
        for &eid in graph.adjacent_edges(&current) {
            let Some(edge) = graph.edge(eid) else { continue };
            if !edge.connected {
                continue;
            }
            let Some(next) = edge.other_end(&current) else {
                continue;
            };
            if !examined.insert(next.clone()) {
                continue;
            }
            let Some(node) = graph.node(next.as_str()) else {
                continue;
            };
            if passes(node, devices) {
                energized.insert(next.clone());
                queue.push_back(next.clone());
            }
        }
    }

    energized
}

/// Kind-specific pass predicate. Nodes without a device pass
/// unconditionally, as does every kind that never gates.
fn passes(node: &CircuitNode, devices: &dyn DeviceStateProvider) -> bool {
    let Some(device) = &node.device else {
        return true;
    };
    match node.kind {
        NodeKind::Breaker => devices.is_breaker_on(device),
        NodeKind::Switch => devices.is_switch_on(device),
        NodeKind::Gfci => !devices.is_gfci_tripped(device),
        _ => true,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
