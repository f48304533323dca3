//! Resource distribution: moving extracted resources to where they belong.
//!
//! Runs after transport links are solved. Per tick:
//!
//! 1. Every completed, linked producer draws `output_per_tick` from its
//!    deposit (clipped to what the deposit has left). Producers that need
//!    power and lack it, or that have no link, produce nothing.
//! 2. Base-linked output goes to the global pool. Hub-linked output goes
//!    into the hub's buffer; whatever does not fit is discarded, but the
//!    deposit is still drawn.
//! 3. Every storage hub linked to a base hands `drain_per_tick` (total,
//!    split by kind in proportion to what it holds) to the pool.

use bastion_core::fixed::Fixed64;
use bastion_core::grid::TileGrid;
use bastion_core::id::{DepositId, StructureId};
use bastion_core::resource::{ResourceAmounts, ResourceKind};
use bastion_core::structure::{StructureKind, StructureStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Totals moved during one distribution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionReport {
    /// Drawn from deposits.
    pub produced: ResourceAmounts,
    /// Delivered straight to the pool by base-linked producers.
    pub to_pool: ResourceAmounts,
    /// Accepted into storage buffers.
    pub buffered: ResourceAmounts,
    /// Lost to full buffers.
    pub discarded: ResourceAmounts,
    /// Moved from storage buffers to the pool.
    pub drained: ResourceAmounts,
    /// Deposits that ran dry this pass.
    pub exhausted: Vec<DepositId>,
}

enum Destination {
    Pool,
    Hub(StructureId),
}

struct Draw {
    deposit: DepositId,
    kind: ResourceKind,
    amount: Fixed64,
    to: Destination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionModule {
    pub drain_per_tick: Fixed64,
}

impl DistributionModule {
    pub fn new(drain_per_tick: Fixed64) -> Self {
        Self { drain_per_tick }
    }

    pub fn tick(
        &self,
        grid: &mut TileGrid,
        structures: &mut StructureStore,
        pool: &mut ResourceAmounts,
    ) -> DistributionReport {
        let mut report = DistributionReport::default();

        let draws: Vec<Draw> = structures
            .iter()
            .filter_map(|(_, s)| {
                let producer = s.producer.as_ref()?;
                if !s.is_operational() || (producer.requires_power && !s.is_powered) {
                    return None;
                }
                let deposit = s.deposit?;
                if grid.deposit(deposit)?.is_depleted() {
                    return None;
                }
                let to = if s.is_connected_to_base {
                    Destination::Pool
                } else {
                    Destination::Hub(s.connected_target?)
                };
                Some(Draw {
                    deposit,
                    kind: producer.resource,
                    amount: producer.output_per_tick,
                    to,
                })
            })
            .collect();

        for draw in draws {
            let taken = grid.draw_from_deposit(draw.deposit, draw.amount);
            if grid.deposit(draw.deposit).is_some_and(|d| d.is_depleted()) {
                debug!(deposit = ?draw.deposit, "deposit exhausted");
                report.exhausted.push(draw.deposit);
            }
            if taken <= Fixed64::ZERO {
                continue;
            }
            let amount = ResourceAmounts::single(draw.kind, taken);
            report.produced.add(&amount);

            match draw.to {
                Destination::Pool => {
                    pool.add(&amount);
                    report.to_pool.add(&amount);
                }
                Destination::Hub(hub) => {
                    let Some(buffer) = structures.get_mut(hub).and_then(|h| h.storage.as_mut())
                    else {
                        report.discarded.add(&amount);
                        continue;
                    };
                    let (accepted, discarded) = buffer.accept(draw.kind, taken);
                    report.buffered.add(&ResourceAmounts::single(draw.kind, accepted));
                    report.discarded.add(&ResourceAmounts::single(draw.kind, discarded));
                }
            }
        }

        for (_, hub) in structures.iter_mut() {
            if hub.kind != StructureKind::Storage
                || !hub.is_operational()
                || !hub.is_connected_to_base
            {
                continue;
            }
            let Some(buffer) = hub.storage.as_mut() else {
                continue;
            };
            let out = buffer.drain(self.drain_per_tick);
            pool.add(&out);
            report.drained.add(&out);
        }

        trace!(
            produced = %report.produced.total(),
            drained = %report.drained.total(),
            discarded = %report.discarded.total(),
            "distribution pass"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportModule;
    use bastion_core::grid::GridPosition;
    use bastion_core::catalog::StructureCatalog;
    use bastion_core::test_utils::*;

    fn linked_mine(
        grid: &mut TileGrid,
        store: &mut StructureStore,
        catalog: &StructureCatalog,
        hub_kind: StructureKind,
        remaining: Option<Fixed64>,
    ) -> (StructureId, StructureId) {
        let hub = place(grid, store, catalog, hub_kind, 0, 0);
        place(grid, store, catalog, StructureKind::Pipeline, 1, 0);
        grid.add_deposit(GridPosition::new(2, 0), ResourceKind::Gold, remaining);
        let mine = place(grid, store, catalog, StructureKind::GoldMine, 2, 0);
        TransportModule::new().tick(store, 0);
        (hub, mine)
    }

    // -----------------------------------------------------------------------
    // Test 1: Base-linked output goes to the pool
    // -----------------------------------------------------------------------
    #[test]
    fn base_linked_output_reaches_pool() {
        let (mut grid, mut store, catalog) = test_world_parts(4, 1);
        linked_mine(&mut grid, &mut store, &catalog, StructureKind::Base, None);
        let mut pool = ResourceAmounts::ZERO;

        let report = DistributionModule::new(fixed(5.0)).tick(&mut grid, &mut store, &mut pool);
        assert_eq!(pool.gold, fixed(10.0));
        assert_eq!(report.to_pool.gold, fixed(10.0));
        assert_eq!(report.produced.gold, fixed(10.0));
    }

    // -----------------------------------------------------------------------
    // Test 2: Storage clips at capacity and still draws the deposit
    // -----------------------------------------------------------------------
    #[test]
    fn storage_overflow_is_discarded() {
        let (mut grid, mut store, catalog) = test_world_parts(4, 1);
        let (hub, mine) =
            linked_mine(&mut grid, &mut store, &catalog, StructureKind::Storage, Some(fixed(50.0)));
        store.get_mut(hub).unwrap().storage.as_mut().unwrap().stored.gold = fixed(95.0);
        let mut pool = ResourceAmounts::ZERO;

        let report = DistributionModule::new(fixed(5.0)).tick(&mut grid, &mut store, &mut pool);
        let buffer = store.get(hub).unwrap().storage.as_ref().unwrap();
        assert_eq!(buffer.stored.gold, fixed(100.0));
        assert_eq!(report.buffered.gold, fixed(5.0));
        assert_eq!(report.discarded.gold, fixed(5.0));
        assert_eq!(pool, ResourceAmounts::ZERO, "hub is not linked to a base");

        let deposit = store.get(mine).unwrap().deposit.unwrap();
        assert_eq!(grid.deposit(deposit).unwrap().remaining, Some(fixed(40.0)));
    }

    // -----------------------------------------------------------------------
    // Test 3: Unlinked and unpowered producers stay idle
    // -----------------------------------------------------------------------
    #[test]
    fn unlinked_producer_does_not_produce() {
        let (mut grid, mut store, catalog) = test_world_parts(4, 1);
        grid.add_deposit(GridPosition::new(3, 0), ResourceKind::Gold, Some(fixed(20.0)));
        let mine = place(&mut grid, &mut store, &catalog, StructureKind::GoldMine, 3, 0);
        let mut pool = ResourceAmounts::ZERO;

        let report = DistributionModule::new(fixed(5.0)).tick(&mut grid, &mut store, &mut pool);
        assert!(report.produced.is_zero());
        let deposit = store.get(mine).unwrap().deposit.unwrap();
        assert_eq!(grid.deposit(deposit).unwrap().remaining, Some(fixed(20.0)));
    }

    #[test]
    fn pump_needs_power() {
        let (mut grid, mut store, catalog) = test_world_parts(4, 1);
        place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        grid.add_deposit(GridPosition::new(1, 0), ResourceKind::Oil, None);
        let pump = place(&mut grid, &mut store, &catalog, StructureKind::OilPump, 1, 0);
        TransportModule::new().tick(&mut store, 0);
        let module = DistributionModule::new(fixed(5.0));
        let mut pool = ResourceAmounts::ZERO;

        module.tick(&mut grid, &mut store, &mut pool);
        assert!(pool.is_zero());

        store.get_mut(pump).unwrap().is_powered = true;
        module.tick(&mut grid, &mut store, &mut pool);
        assert_eq!(pool.oil, fixed(5.0));
    }

    // -----------------------------------------------------------------------
    // Test 4: Finite deposits run dry
    // -----------------------------------------------------------------------
    #[test]
    fn deposit_runs_dry() {
        let (mut grid, mut store, catalog) = test_world_parts(4, 1);
        let (_, mine) =
            linked_mine(&mut grid, &mut store, &catalog, StructureKind::Base, Some(fixed(15.0)));
        let module = DistributionModule::new(fixed(5.0));
        let mut pool = ResourceAmounts::ZERO;

        assert!(module.tick(&mut grid, &mut store, &mut pool).exhausted.is_empty());
        let report = module.tick(&mut grid, &mut store, &mut pool);
        assert_eq!(report.produced.gold, fixed(5.0));
        assert_eq!(report.exhausted, vec![store.get(mine).unwrap().deposit.unwrap()]);
        assert_eq!(pool.gold, fixed(15.0));

        let report = module.tick(&mut grid, &mut store, &mut pool);
        assert!(report.produced.is_zero());
        assert_eq!(pool.gold, fixed(15.0));
    }

    // -----------------------------------------------------------------------
    // Test 5: Base-linked storage drains proportionally
    // -----------------------------------------------------------------------
    #[test]
    fn linked_storage_drains_to_pool() {
        let (mut grid, mut store, catalog) = test_world_parts(3, 1);
        place(&mut grid, &mut store, &catalog, StructureKind::Base, 0, 0);
        let hub = place(&mut grid, &mut store, &catalog, StructureKind::Storage, 1, 0);
        TransportModule::new().tick(&mut store, 0);
        {
            let buffer = store.get_mut(hub).unwrap().storage.as_mut().unwrap();
            buffer.stored.gold = fixed(6.0);
            buffer.stored.oil = fixed(2.0);
        }
        let mut pool = ResourceAmounts::ZERO;

        let report = DistributionModule::new(fixed(4.0)).tick(&mut grid, &mut store, &mut pool);
        assert_eq!(report.drained.gold, fixed(3.0));
        assert_eq!(report.drained.oil, fixed(1.0));
        assert_eq!(pool.total(), fixed(4.0));

        DistributionModule::new(fixed(100.0)).tick(&mut grid, &mut store, &mut pool);
        let buffer = store.get(hub).unwrap().storage.as_ref().unwrap();
        assert!(buffer.stored.is_zero());
        assert_eq!(pool.total(), fixed(8.0));
    }
}
