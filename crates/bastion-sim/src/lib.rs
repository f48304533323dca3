//! The simulation facade.
//!
//! [`World`] owns the grid, the structure store, the units and the shared
//! resource pool, plus one instance of every per-tick module. A tick runs
//! the modules in a fixed order:
//!
//! 1. construction (reap destroyed, advance progress, steer and execute)
//! 2. power propagation
//! 3. resource-transport propagation
//! 4. distribution (production, storage drain) and generator fuel burn
//! 5. visibility
//!
//! Module events are collected into one [`SimEvent`] stream.

pub mod event;
pub mod snapshot;
pub mod world;

pub use event::SimEvent;
pub use snapshot::{SnapshotError, StateHash};
pub use world::World;
