//! Shared circuit fixtures for unit tests, integration tests, and benchmarks
//! (via the `test-utils` feature).

use crate::device::{BreakerState, DeviceDirectory, GfciState, SwitchState};
use crate::graph::{CircuitGraph, NodeKind, WireKind};

// ===========================================================================
// Fixtures
// ===========================================================================

/// Panel -> breaker -> daisy chain of `outlets` outlets, all hot wire.
///
/// Node ids: `"panel"`, `"breaker"` (device `"dev-breaker"`, registered on),
/// `"outlet-0"` .. `"outlet-{n-1}"`.
pub fn chain_circuit(outlets: usize) -> (CircuitGraph, DeviceDirectory) {
    let mut graph = CircuitGraph::new();
    let mut devices = DeviceDirectory::new();

    graph.add_node("panel", NodeKind::Panel, None);
    graph.add_node("breaker", NodeKind::Breaker, Some("dev-breaker".into()));
    devices.set_breaker("dev-breaker", BreakerState::On);
    graph
        .add_edge("panel", "breaker", WireKind::Hot)
        .expect("panel and breaker exist");

    let mut prev = String::from("breaker");
    for i in 0..outlets {
        let id = format!("outlet-{i}");
        graph.add_node(id.as_str(), NodeKind::Outlet, None);
        graph
            .add_edge(prev.as_str(), id.as_str(), WireKind::Hot)
            .expect("chain nodes exist");
        prev = id;
    }

    (graph, devices)
}

/// Two-branch house circuit used across the suites. Every device is
/// registered in its conducting state, so a fresh sweep energizes all nodes.
///
/// Kitchen branch: `panel -> breaker-kitchen -> gfci-kitchen ->
/// outlet-counter-1 -> outlet-counter-2`.
/// Lighting branch: `panel -> breaker-lights -> junction-ceiling ->
/// switch-hall -> fixture-hall`.
///
/// Devices: `dev-brk-kitchen`, `dev-brk-lights`, `dev-gfci-kitchen`,
/// `dev-sw-hall`.
pub fn residential_circuit() -> (CircuitGraph, DeviceDirectory) {
    let mut graph = CircuitGraph::new();
    let mut devices = DeviceDirectory::new();

    graph.add_node("panel", NodeKind::Panel, None);

    // Kitchen branch.
    graph.add_node("breaker-kitchen", NodeKind::Breaker, Some("dev-brk-kitchen".into()));
    graph.add_node("gfci-kitchen", NodeKind::Gfci, Some("dev-gfci-kitchen".into()));
    graph.add_node("outlet-counter-1", NodeKind::Outlet, None);
    graph.add_node("outlet-counter-2", NodeKind::Outlet, None);
    graph
        .add_edge("panel", "breaker-kitchen", WireKind::Hot)
        .expect("kitchen branch nodes exist");
    graph
        .add_edge("breaker-kitchen", "gfci-kitchen", WireKind::Hot)
        .expect("kitchen branch nodes exist");
    graph
        .add_edge("gfci-kitchen", "outlet-counter-1", WireKind::Hot)
        .expect("kitchen branch nodes exist");
    graph
        .add_edge("outlet-counter-1", "outlet-counter-2", WireKind::Hot)
        .expect("kitchen branch nodes exist");

    // Lighting branch.
    graph.add_node("breaker-lights", NodeKind::Breaker, Some("dev-brk-lights".into()));
    graph.add_node("junction-ceiling", NodeKind::Junction, None);
    graph.add_node("switch-hall", NodeKind::Switch, Some("dev-sw-hall".into()));
    graph.add_node("fixture-hall", NodeKind::Fixture, None);
    graph
        .add_edge("panel", "breaker-lights", WireKind::Hot)
        .expect("lighting branch nodes exist");
    graph
        .add_edge("breaker-lights", "junction-ceiling", WireKind::Hot)
        .expect("lighting branch nodes exist");
    graph
        .add_edge("junction-ceiling", "switch-hall", WireKind::Hot)
        .expect("lighting branch nodes exist");
    graph
        .add_edge("switch-hall", "fixture-hall", WireKind::Hot)
        .expect("lighting branch nodes exist");

    devices.set_breaker("dev-brk-kitchen", BreakerState::On);
    devices.set_breaker("dev-brk-lights", BreakerState::On);
    devices.set_gfci("dev-gfci-kitchen", GfciState::Normal);
    devices.set_switch("dev-sw-hall", SwitchState::On);

    (graph, devices)
}
