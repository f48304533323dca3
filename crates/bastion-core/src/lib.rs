//! Bastion Core -- the shared world model for the base-building simulation.
//!
//! This crate owns the tile grid and everything that lives on it, plus the
//! generic connectivity search the power and transport crates build on.
//!
//! # Key Types
//!
//! - [`grid::TileGrid`] -- The single authoritative grid of cells and the
//!   resource deposits bound to them. All cell mutation goes through it.
//! - [`structure::Structure`] / [`structure::StructureStore`] -- Placed
//!   buildings, conduits, and hubs with explicit network role tags.
//! - [`unit::Unit`] -- Builders and soldiers.
//! - [`resource::ResourceAmounts`] -- Per-kind quantities in [`fixed::Fixed64`].
//! - [`catalog::StructureCatalog`] -- Per-kind specs, frozen at world creation.
//! - [`network::Propagation`] -- Breadth-first search over structure
//!   footprints, parameterised by a conduit/terminal classifier.
//! - [`config::SimConfig`] -- Everything tunable about a world.
//!
//! # Determinism
//!
//! Quantities are Q32.32 fixed point and all iteration follows slotmap or
//! `BTreeMap` order, so two worlds fed the same inputs stay identical.

pub mod catalog;
pub mod config;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod network;
pub mod resource;
pub mod structure;
pub mod unit;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
