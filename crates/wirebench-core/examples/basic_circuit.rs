//! Basic circuit example: a kitchen branch with a breaker and a GFCI.
//!
//! Builds panel -> breaker -> GFCI -> two outlets, propagates power, then
//! trips the GFCI and shows the transition events and meter readings a
//! trainee would see.
//!
//! Run with: `cargo run -p wirebench-core --example basic_circuit`

use wirebench_core::continuity::has_continuity;
use wirebench_core::device::{BreakerState, DeviceDirectory};
use wirebench_core::graph::{CircuitGraph, NodeKind, WireKind};
use wirebench_core::power::EnergyPropagator;

fn main() {
    let mut graph = CircuitGraph::new();
    let mut devices = DeviceDirectory::new();

    // --- Build the kitchen branch ---

    graph.add_node("panel", NodeKind::Panel, None);
    graph.add_node("breaker", NodeKind::Breaker, Some("dev-brk".into()));
    graph.add_node("gfci", NodeKind::Gfci, Some("dev-gfci".into()));
    graph.add_node("outlet-1", NodeKind::Outlet, None);
    graph.add_node("outlet-2", NodeKind::Outlet, None);

    graph.add_edge("panel", "breaker", WireKind::Hot).unwrap();
    graph.add_edge("breaker", "gfci", WireKind::Hot).unwrap();
    graph.add_edge("gfci", "outlet-1", WireKind::Hot).unwrap();
    graph.add_edge("outlet-1", "outlet-2", WireKind::Hot).unwrap();

    devices.set_breaker("dev-brk", BreakerState::On);

    // --- Energize ---

    let propagator = EnergyPropagator::new();
    let events = propagator.propagate(&mut graph, &devices);
    println!("first sweep: {} nodes energized", events.len());
    for id in ["panel", "breaker", "gfci", "outlet-1", "outlet-2"] {
        println!("  {id}: {:>5.1} V", propagator.voltage(&graph, id));
    }

    // --- Trip the GFCI ---

    devices.trip_gfci("dev-gfci");
    let events = propagator.propagate(&mut graph, &devices);
    println!("\nafter GFCI trip ({} transitions):", events.len());
    for event in &events {
        println!("  {event:?}");
    }
    println!("  outlet-2 reads {:.1} V", propagator.voltage(&graph, "outlet-2"));

    // --- The meter still sees the wire ---

    println!(
        "\ncontinuity panel <-> outlet-2: {}",
        has_continuity(&graph, "panel", "outlet-2")
    );
}
