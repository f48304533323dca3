//! Resource-transport networks.
//!
//! Producers (mines, pumps) only deliver when a chain of pipelines links
//! them to a hub. Every tick the links are recomputed from scratch with the
//! same breadth-first search the power grid uses, run once per hub:
//!
//! - From each base: pipelines conduct, producers and storage hubs are
//!   terminals. Everything reached is connected to the base.
//! - From each storage hub: pipelines conduct, producers are terminals.
//!   A producer reached this way records the hub as its target. When two
//!   hubs reach the same producer the first hub in store order keeps it.
//!
//! A producer linked to a base sends its output straight to the pool; see
//! [`distribution`] for what happens to the resources themselves.
//!
//! Events fire only on transitions, not every tick.

pub mod distribution;
pub use distribution::{DistributionModule, DistributionReport};

use std::collections::{BTreeMap, BTreeSet};

use bastion_core::fixed::Ticks;
use bastion_core::id::StructureId;
use bastion_core::network::{ConnectivityIndex, NodeClass, propagate};
use bastion_core::structure::{Structure, StructureKind, StructureStore, TransportRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A structure joined a transport network.
    Linked { structure: StructureId, tick: Ticks },
    /// A structure dropped out of every transport network.
    Unlinked { structure: StructureId, tick: Ticks },
}

// ---------------------------------------------------------------------------
// Solved state
// ---------------------------------------------------------------------------

/// The result of one transport solve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportState {
    /// Structures with `is_connected` set: visited pipelines, linked
    /// producers, and hubs that link anything.
    pub connected: BTreeSet<StructureId>,
    /// Producers and storage hubs reachable from a base.
    pub base_linked: BTreeSet<StructureId>,
    /// Producer to the storage hub it delivers into.
    pub hub_links: BTreeMap<StructureId, StructureId>,
}

fn from_base(structure: &Structure) -> NodeClass {
    match structure.transport_role {
        TransportRole::Conduit => NodeClass::Conduit,
        TransportRole::Producer => NodeClass::Terminal,
        TransportRole::Hub if structure.kind == StructureKind::Storage => NodeClass::Terminal,
        _ => NodeClass::Blocked,
    }
}

fn from_storage(structure: &Structure) -> NodeClass {
    match structure.transport_role {
        TransportRole::Conduit => NodeClass::Conduit,
        TransportRole::Producer => NodeClass::Terminal,
        _ => NodeClass::Blocked,
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportModule;

impl TransportModule {
    pub fn new() -> Self {
        Self
    }

    /// Work out every transport link. Reads only.
    pub fn solve(&self, structures: &StructureStore) -> TransportState {
        let index = ConnectivityIndex::build(structures);
        let mut state = TransportState::default();

        for (base_id, base) in structures.of_kind(StructureKind::Base) {
            if !base.is_operational() {
                continue;
            }
            let reach = propagate(&index, structures, [base_id], from_base);
            if !reach.terminals.is_empty() {
                state.connected.insert(base_id);
            }
            state.connected.extend(reach.conduits);
            state.connected.extend(reach.terminals.iter().copied());
            state.base_linked.extend(reach.terminals);
        }

        for (hub_id, hub) in structures.of_kind(StructureKind::Storage) {
            if !hub.is_operational() {
                continue;
            }
            let reach = propagate(&index, structures, [hub_id], from_storage);
            if !reach.terminals.is_empty() {
                state.connected.insert(hub_id);
            }
            state.connected.extend(reach.conduits);
            for producer in reach.terminals {
                state.connected.insert(producer);
                state.hub_links.entry(producer).or_insert(hub_id);
            }
        }

        state
    }

    /// Write a solved state back onto the structures. All three link fields
    /// are reset first.
    pub fn apply(
        &self,
        structures: &mut StructureStore,
        state: &TransportState,
        current_tick: Ticks,
    ) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        for (id, s) in structures.iter_mut() {
            let was = s.is_connected;
            s.is_connected = state.connected.contains(&id);
            s.is_connected_to_base = state.base_linked.contains(&id);
            s.connected_target = state.hub_links.get(&id).copied();
            match (was, s.is_connected) {
                (false, true) => events.push(TransportEvent::Linked {
                    structure: id,
                    tick: current_tick,
                }),
                (true, false) => events.push(TransportEvent::Unlinked {
                    structure: id,
                    tick: current_tick,
                }),
                _ => {}
            }
        }
        if !events.is_empty() {
            debug!(changes = events.len(), "transport transitions");
        }
        events
    }

    pub fn tick(&self, structures: &mut StructureStore, current_tick: Ticks) -> Vec<TransportEvent> {
        let state = self.solve(structures);
        trace!(
            connected = state.connected.len(),
            base_linked = state.base_linked.len(),
            hub_links = state.hub_links.len(),
            "transport solved"
        );
        self.apply(structures, &state, current_tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::grid::GridPosition;
    use bastion_core::resource::ResourceKind;
    use bastion_core::test_utils::*;

    // -----------------------------------------------------------------------
    // Test 1: Pipeline chain links a producer to the base
    // -----------------------------------------------------------------------
    #[test]
    fn pipeline_links_producer_to_base() {
        let (mut grid, mut store, catalog) = test_world_parts(6, 1);
        let base = place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        let p1 = place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 1, 0);
        let p2 = place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 2, 0);
        grid.add_deposit(GridPosition::new(3, 0), ResourceKind::Gold, None);
        let mine = place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 3, 0);

        let events = TransportModule::new().tick(&mut store, 1);
        let m = store.get(mine).unwrap();
        assert!(m.is_connected && m.is_connected_to_base);
        assert_eq!(m.connected_target, None);
        assert!(store.get(p1).unwrap().is_connected);
        assert!(store.get(p2).unwrap().is_connected);
        assert!(store.get(base).unwrap().is_connected);
        assert_eq!(events.len(), 4);
    }

    // -----------------------------------------------------------------------
    // Test 2: Producers are terminals
    // -----------------------------------------------------------------------
    #[test]
    fn producer_does_not_pass_link_on() {
        let (mut grid, mut store, catalog) = test_world_parts(6, 1);
        place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        let pos = GridPosition::new(1, 0);
        grid.add_deposit(pos, ResourceKind::Gold, None);
        place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 1, 0);
        let pipe = place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 2, 0);

        TransportModule::new().tick(&mut store, 1);
        assert!(!store.get(pipe).unwrap().is_connected);
    }

    // -----------------------------------------------------------------------
    // Test 3: Storage hubs claim producers and link to the base
    // -----------------------------------------------------------------------
    #[test]
    fn storage_hub_claims_producer() {
        let (mut grid, mut store, catalog) = test_world_parts(8, 1);
        let hub = place(&mut grid, &mut store, &catalog, StructureKind::Storage, 0, 0);
        place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 1, 0);
        grid.add_deposit(GridPosition::new(2, 0), ResourceKind::Gold, None);
        let mine = place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 2, 0);

        TransportModule::new().tick(&mut store, 1);
        let m = store.get(mine).unwrap();
        assert_eq!(m.connected_target, Some(hub));
        assert!(!m.is_connected_to_base);
        assert!(store.get(hub).unwrap().is_connected);
        assert!(!store.get(hub).unwrap().is_connected_to_base);
    }

    #[test]
    fn storage_links_to_base_through_pipes() {
        let (mut grid, mut store, catalog) = test_world_parts(6, 1);
        place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 1, 0);
        let hub = place(&mut grid, &mut store, &catalog, StructureKind::Storage, 2, 0);

        TransportModule::new().tick(&mut store, 1);
        assert!(store.get(hub).unwrap().is_connected_to_base);
    }

    #[test]
    fn first_hub_keeps_shared_producer() {
        let (mut grid, mut store, catalog) = test_world_parts(5, 1);
        let first = place(&mut grid, &mut store, &catalog, StructureKind::Storage, 0, 0);
        place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 1, 0);
        grid.add_deposit(GridPosition::new(2, 0), ResourceKind::Gold, None);
        let mine = place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 2, 0);
        place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 3, 0);
        let second = place(&mut grid, &mut store, &catalog, StructureKind::Storage, 4, 0);

        let module = TransportModule::new();
        let state = module.solve(&store);
        assert_eq!(state.hub_links.get(&mine), Some(&first));
        assert!(state.connected.contains(&second));
    }

    // -----------------------------------------------------------------------
    // Test 4: Removing a pipe unlinks everything downstream
    // -----------------------------------------------------------------------
    #[test]
    fn removing_pipe_unlinks() {
        let (mut grid, mut store, catalog) = test_world_parts(5, 1);
        place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        let pipe = place(&mut grid, &mut store, &catalog, StructureKind::Pipeline, 1, 0);
        grid.add_deposit(GridPosition::new(2, 0), ResourceKind::Gold, None);
        let mine = place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 2, 0);

        let module = TransportModule::new();
        module.tick(&mut store, 1);
        assert!(store.get(mine).unwrap().is_connected_to_base);

        store.remove(pipe);
        grid.release(GridPosition::new(1, 0));
        let events = module.tick(&mut store, 2);
        let m = store.get(mine).unwrap();
        assert!(!m.is_connected && !m.is_connected_to_base);
        assert!(events.contains(&TransportEvent::Unlinked { structure: mine, tick: 2 }));
    }

    #[test]
    fn power_lines_do_not_carry_resources() {
        let (mut grid, mut store, catalog) = test_world_parts(4, 1);
        place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        place(&mut grid, &mut store, &catalog, StructureKind::PowerLine, 1, 0);
        grid.add_deposit(GridPosition::new(2, 0), ResourceKind::Gold, None);
        let mine = place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 2, 0);

        TransportModule::new().tick(&mut store, 1);
        assert!(!store.get(mine).unwrap().is_connected);
    }
}
