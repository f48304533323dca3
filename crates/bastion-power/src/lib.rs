//! Power propagation over the structure grid.
//!
//! Each tick every structure's `is_powered` flag is recomputed from scratch
//! by a breadth-first search out of the active power sources.
//!
//! # Rules
//!
//! - Sources are every base and every generator that still has fuel (or
//!   needs none). Sources are powered themselves.
//! - Power lines are conduits: they are powered and pass power on.
//! - Everything else is a sink: powered when reached, but it does not pass
//!   power on.
//! - Base halo: any structure with a cell within `halo_radius` (Chebyshev)
//!   of a base footprint is reached directly, with no line in between. A
//!   line in the halo continues the search as usual. Generators get no halo.
//! - Structures under construction are invisible to the search.
//!
//! Events fire only on transitions, not every tick.

use std::collections::BTreeSet;

use bastion_core::fixed::{Fixed64, Ticks};
use bastion_core::grid::{GridPosition, TileGrid};
use bastion_core::id::StructureId;
use bastion_core::network::{ConnectivityIndex, NodeClass, Propagation};
use bastion_core::structure::{PowerRole, Structure, StructureKind, StructureStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerEvent {
    /// A structure gained power.
    Powered { structure: StructureId, tick: Ticks },
    /// A structure lost power.
    Unpowered { structure: StructureId, tick: Ticks },
    /// A generator burned its last fuel.
    FuelExhausted { structure: StructureId, tick: Ticks },
}

// ---------------------------------------------------------------------------
// Solved state
// ---------------------------------------------------------------------------

/// The result of one power solve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerState {
    pub sources: BTreeSet<StructureId>,
    pub powered: BTreeSet<StructureId>,
}

impl PowerState {
    pub fn is_powered(&self, id: StructureId) -> bool {
        self.powered.contains(&id)
    }
}

fn classify(structure: &Structure) -> NodeClass {
    match structure.power_role {
        PowerRole::Conduit => NodeClass::Conduit,
        PowerRole::Source | PowerRole::Sink => NodeClass::Terminal,
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerModule {
    /// Chebyshev radius of the base halo.
    pub halo_radius: u32,
}

impl Default for PowerModule {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PowerModule {
    pub fn new(halo_radius: u32) -> Self {
        Self { halo_radius }
    }

    /// Work out which structures are powered. Reads only; calling it twice
    /// on an unchanged world gives the same answer.
    pub fn solve(&self, grid: &TileGrid, structures: &StructureStore) -> PowerState {
        let index = ConnectivityIndex::build(structures);
        let sources: BTreeSet<StructureId> = structures
            .iter()
            .filter(|(_, s)| s.is_active_source())
            .map(|(id, _)| id)
            .collect();

        let mut run = Propagation::new(&index, structures, classify);
        for &id in &sources {
            run.seed(id);
        }

        let r = i64::from(self.halo_radius);
        let (max_x, max_y) = (i64::from(grid.width()) - 1, i64::from(grid.height()) - 1);
        for (_, base) in structures.of_kind(StructureKind::Base) {
            if !base.is_active_source() {
                continue;
            }
            for tile in base.tiles() {
                let (x, y) = (i64::from(tile.x), i64::from(tile.y));
                for py in (y - r).max(0)..=(y + r).min(max_y) {
                    for px in (x - r).max(0)..=(x + r).min(max_x) {
                        run.touch(GridPosition::new(px as i32, py as i32));
                    }
                }
            }
        }

        let reach = run.run();
        let mut powered = sources.clone();
        powered.extend(reach.conduits);
        powered.extend(reach.terminals);
        PowerState { sources, powered }
    }

    /// Write a solved state back onto the structures.
    ///
    /// Every flag is reset first, so a structure absent from `state` ends
    /// up unpowered.
    pub fn apply(
        &self,
        structures: &mut StructureStore,
        state: &PowerState,
        current_tick: Ticks,
    ) -> Vec<PowerEvent> {
        let mut events = Vec::new();
        for (id, s) in structures.iter_mut() {
            let was = s.is_powered;
            let now = state.is_powered(id);
            s.is_powered = now;
            match (was, now) {
                (false, true) => events.push(PowerEvent::Powered {
                    structure: id,
                    tick: current_tick,
                }),
                (true, false) => events.push(PowerEvent::Unpowered {
                    structure: id,
                    tick: current_tick,
                }),
                _ => {}
            }
        }
        if !events.is_empty() {
            debug!(changes = events.len(), "power transitions");
        }
        events
    }

    /// Solve and apply in one step.
    pub fn tick(
        &self,
        grid: &TileGrid,
        structures: &mut StructureStore,
        current_tick: Ticks,
    ) -> Vec<PowerEvent> {
        let state = self.solve(grid, structures);
        trace!(
            sources = state.sources.len(),
            powered = state.powered.len(),
            "power solved"
        );
        self.apply(structures, &state, current_tick)
    }

    /// Burn one tick of fuel in every running generator.
    pub fn burn_fuel(&self, structures: &mut StructureStore, current_tick: Ticks) -> Vec<PowerEvent> {
        let mut events = Vec::new();
        for (id, s) in structures.iter_mut() {
            if !s.is_operational() {
                continue;
            }
            let Some(generator) = s.generator.as_mut() else {
                continue;
            };
            let Some(fuel) = generator.fuel.as_mut() else {
                continue;
            };
            if *fuel <= Fixed64::ZERO {
                continue;
            }
            *fuel = (*fuel - generator.burn_per_tick).max(Fixed64::ZERO);
            if *fuel == Fixed64::ZERO {
                debug!(?id, "generator out of fuel");
                events.push(PowerEvent::FuelExhausted {
                    structure: id,
                    tick: current_tick,
                });
            }
        }
        events
    }

    /// Add fuel to a generator, up to its capacity. Returns the amount
    /// accepted; zero for anything that is not a fuelled generator.
    pub fn refuel(&self, structures: &mut StructureStore, id: StructureId, amount: Fixed64) -> Fixed64 {
        let Some(generator) = structures.get_mut(id).and_then(|s| s.generator.as_mut()) else {
            return Fixed64::ZERO;
        };
        let Some(fuel) = generator.fuel.as_mut() else {
            return Fixed64::ZERO;
        };
        let room = generator
            .capacity
            .map_or(amount, |cap| (cap - *fuel).max(Fixed64::ZERO));
        let accepted = amount.max(Fixed64::ZERO).min(room);
        *fuel = fuel.saturating_add(accepted);
        accepted
    }
}
