//! Property-based tests for construction cancellation.
//!
//! Random placement gestures are reserved and then cancelled; the pool must
//! end exactly where it started and no reservation may survive.

use bastion_construction::{BuildContext, ConstructionController};
use bastion_core::catalog::StructureCatalog;
use bastion_core::grid::{Occupant, TileGrid, WorldPoint};
use bastion_core::resource::ResourceAmounts;
use bastion_core::structure::{StructureKind, StructureStore};
use bastion_core::test_utils::*;
use bastion_core::unit::{Unit, UnitCommand, UnitKind, UnitMap};
use proptest::prelude::*;

struct World {
    grid: TileGrid,
    structures: StructureStore,
    units: UnitMap,
    resources: ResourceAmounts,
    catalog: StructureCatalog,
}

impl World {
    fn ctx(&mut self) -> BuildContext<'_> {
        BuildContext {
            grid: &mut self.grid,
            structures: &mut self.structures,
            units: &mut self.units,
            resources: &mut self.resources,
            catalog: &self.catalog,
            ticks_per_second: 1,
            tick: 0,
        }
    }
}

fn arb_kind() -> impl Strategy<Value = StructureKind> {
    prop_oneof![
        Just(StructureKind::PowerLine),
        Just(StructureKind::Pipeline),
        Just(StructureKind::Turret),
        Just(StructureKind::Storage),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Cancelling a queue refunds exactly what was spent and frees every cell.
    #[test]
    fn cancel_refunds_everything(
        placements in proptest::collection::vec((arb_kind(), 0i32..10, 0i32..10), 1..20),
        starting_gold in 0.0f64..300.0,
    ) {
        let mut world = World {
            grid: test_grid(10, 10),
            structures: StructureStore::new(),
            units: UnitMap::with_key(),
            resources: gold(starting_gold),
            catalog: test_catalog(),
        };
        let builder = world.units.insert(Unit::new(
            UnitKind::Builder,
            WorldPoint::new(-50.0, -50.0),
            0.5,
            1.0,
            2,
        ));
        let start = world.resources;
        let mut controller = ConstructionController::new(0.25, fixed(0.5));

        controller.begin_gesture();
        let mut accepted = 0;
        for (kind, x, y) in placements {
            let point = WorldPoint::new(x as f32 + 0.5, y as f32 + 0.5);
            if controller.request_placement(&mut world.ctx(), kind, point, &[builder]).is_ok() {
                accepted += 1;
            }
        }
        controller.end_gesture();

        let spent = fixed(10.0) * fixed(accepted as f64);
        prop_assert_eq!(world.resources.gold, start.gold - spent);
        prop_assert_eq!(controller.pending_tasks(), accepted);

        controller.issue_command(&mut world.ctx(), builder, UnitCommand::Hold);
        prop_assert_eq!(world.resources, start);
        prop_assert_eq!(controller.pending_tasks(), 0);
        for (_, cell) in world.grid.cells() {
            prop_assert!(!matches!(cell.occupant, Some(Occupant::Reservation(_))));
            prop_assert_eq!(cell.occupied, cell.occupant.is_some());
        }
    }
}
