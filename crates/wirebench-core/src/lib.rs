//! Wirebench Core -- the circuit model for electrical training simulators.
//!
//! This crate provides the typed circuit graph, energy propagation,
//! continuity testing, the device-state seam, and the deterministic RNG that
//! every Wirebench exercise builds on.
//!
//! # Model
//!
//! A training circuit is a [`graph::CircuitGraph`]: nodes are panels,
//! breakers, outlets, switches, junctions, fixtures, and GFCIs, named by
//! caller-supplied string ids; edges are runs of hot/neutral/ground wire
//! that can be connected or separated. The graph is pure topology -- what is
//! wired to what.
//!
//! Two read models sit on top:
//!
//! - [`power::EnergyPropagator`] sweeps outward from every panel and marks
//!   the nodes that device states allow power to reach, emitting events on
//!   transitions only.
//! - [`continuity::has_continuity`] answers multimeter-style path queries
//!   that ignore device state entirely.
//!
//! Gating devices are consulted through the [`device::DeviceStateProvider`]
//! trait, so the engine never learns what a host's breaker object looks
//! like. Everything is single-threaded, synchronous, and deterministic for
//! a fixed build order; the only randomness in the workspace flows through
//! [`rng::SessionRng`].
//!
//! # Key Types
//!
//! - [`graph::CircuitGraph`] -- nodes, wire edges, insertion-ordered
//!   iteration, cascade removal.
//! - [`power::EnergyPropagator`] -- BFS energization with pass predicates
//!   and transition events.
//! - [`device::DeviceDirectory`] -- in-memory [`device::DeviceStateProvider`]
//!   for hosts without their own device layer.
//! - [`rng::SessionRng`] -- SplitMix64, seedable, serializable.

pub mod continuity;
pub mod device;
pub mod graph;
pub mod id;
pub mod power;
pub mod rng;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
