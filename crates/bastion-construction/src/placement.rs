//! Placement validation.
//!
//! Checks run in a fixed order and the first failure wins. Nothing here
//! mutates the world.

use bastion_core::grid::{Footprint, GridPosition, TileGrid};
use bastion_core::id::DepositId;
use bastion_core::structure::StructureKind;

/// Why a placement request was turned down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("no spec for structure kind {0:?}")]
    UnknownKind(StructureKind),
    #[error("no living builder selected")]
    NoBuilder,
    #[error("a task is already queued at ({}, {}) in this gesture", .0.x, .0.y)]
    DuplicateCell(GridPosition),
    #[error("insufficient resources")]
    InsufficientFunds,
    #[error("cell ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("cell ({}, {}) is not buildable", .0.x, .0.y)]
    NotBuildable(GridPosition),
    #[error("cell ({}, {}) is unexplored", .0.x, .0.y)]
    Unexplored(GridPosition),
    #[error("cell ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(GridPosition),
    #[error("no available deposit under the footprint")]
    NoDeposit,
}

/// Check every footprint cell for `kind` anchored at `anchor`.
///
/// An extractor may cover cells holding an available deposit of its own
/// resource, and must cover at least one. Returns the deposit it will
/// extract from.
pub fn check_footprint(
    grid: &TileGrid,
    kind: StructureKind,
    anchor: GridPosition,
    footprint: Footprint,
) -> Result<Option<DepositId>, PlacementError> {
    let extracts = kind.extracts();
    let mut deposit = None;

    for tile in footprint.tiles(anchor) {
        let cell = grid
            .cell_at(tile)
            .ok_or(PlacementError::OutOfBounds(tile))?;
        if !cell.buildable {
            return Err(PlacementError::NotBuildable(tile));
        }
        if !cell.visible {
            return Err(PlacementError::Unexplored(tile));
        }
        if cell.occupied {
            match extracts.and_then(|r| grid.extractable_deposit_at(tile, r)) {
                Some(d) => {
                    deposit.get_or_insert(d);
                }
                None => return Err(PlacementError::Occupied(tile)),
            }
        }
    }

    if extracts.is_some() && deposit.is_none() {
        return Err(PlacementError::NoDeposit);
    }
    Ok(deposit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::grid::{Occupant, TerrainDef};
    use bastion_core::id::{TaskId, TerrainId};
    use bastion_core::resource::ResourceKind;
    use bastion_core::test_utils::*;

    #[test]
    fn open_explored_ground_is_accepted() {
        let grid = test_grid(4, 4);
        let result = check_footprint(&grid, StructureKind::Turret, GridPosition::new(1, 2), Footprint::new(2, 2));
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn footprint_leaving_grid_is_rejected() {
        let grid = test_grid(4, 4);
        let result = check_footprint(&grid, StructureKind::Turret, GridPosition::new(3, 0), Footprint::new(2, 1));
        assert_eq!(result, Err(PlacementError::OutOfBounds(GridPosition::new(4, 0))));
        let result = check_footprint(&grid, StructureKind::Turret, GridPosition::new(0, 0), Footprint::new(1, 2));
        assert_eq!(result, Err(PlacementError::OutOfBounds(GridPosition::new(0, -1))));
    }

    #[test]
    fn unexplored_and_unbuildable_cells_are_rejected() {
        let mut grid = TileGrid::new(4, 4, 1.0);
        let pos = GridPosition::new(1, 1);
        assert_eq!(
            check_footprint(&grid, StructureKind::Turret, pos, Footprint::single()),
            Err(PlacementError::Unexplored(pos))
        );

        grid.reveal_all();
        let water = TerrainDef {
            name: "water".into(),
            buildable: false,
            passable: false,
            roofed: false,
        };
        grid.paint_terrain(pos, TerrainId(1), &water);
        assert_eq!(
            check_footprint(&grid, StructureKind::Turret, pos, Footprint::single()),
            Err(PlacementError::NotBuildable(pos))
        );
    }

    #[test]
    fn reserved_cell_is_occupied() {
        let mut grid = test_grid(4, 4);
        let pos = GridPosition::new(2, 2);
        grid.occupy(pos, Occupant::Reservation(TaskId(9)));
        assert_eq!(
            check_footprint(&grid, StructureKind::Pipeline, pos, Footprint::single()),
            Err(PlacementError::Occupied(pos))
        );
    }

    #[test]
    fn extractor_may_cover_matching_deposit_only() {
        let mut grid = test_grid(4, 4);
        let oil = GridPosition::new(1, 1);
        let gold_pos = GridPosition::new(2, 1);
        let dep = grid.add_deposit(oil, ResourceKind::Oil, None).unwrap();
        grid.add_deposit(gold_pos, ResourceKind::Gold, None).unwrap();

        assert_eq!(
            check_footprint(&grid, StructureKind::OilPump, oil, Footprint::single()),
            Ok(Some(dep))
        );
        assert_eq!(
            check_footprint(&grid, StructureKind::Turret, oil, Footprint::single()),
            Err(PlacementError::Occupied(oil))
        );
        assert_eq!(
            check_footprint(&grid, StructureKind::OilPump, gold_pos, Footprint::single()),
            Err(PlacementError::Occupied(gold_pos))
        );
        assert_eq!(
            check_footprint(&grid, StructureKind::OilPump, GridPosition::new(0, 0), Footprint::single()),
            Err(PlacementError::NoDeposit)
        );
    }

    #[test]
    fn multi_tile_extractor_needs_one_deposit() {
        let mut grid = test_grid(4, 4);
        let dep = grid
            .add_deposit(GridPosition::new(2, 2), ResourceKind::Gold, Some(fixed(50.0)))
            .unwrap();
        let result = check_footprint(&grid, StructureKind::GoldMine, GridPosition::new(1, 2), Footprint::new(2, 2));
        assert_eq!(result, Ok(Some(dep)));
    }
}
