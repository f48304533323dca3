//! Fog of war.
//!
//! Each tick `in_sight` is rebuilt from scratch: cleared everywhere, then
//! set on the disc around every living structure and unit. Anything marked
//! in sight is also marked explored (`visible`), and explored cells never
//! go back to unexplored.

use bastion_core::grid::{GridPosition, TileGrid};
use bastion_core::structure::StructureStore;
use bastion_core::unit::UnitMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A disc of vision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealSource {
    pub center: GridPosition,
    pub radius: u32,
}

/// Counts after a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityStats {
    pub sources: usize,
    pub in_sight: usize,
    pub explored: usize,
}

/// The in-bounds cells within `radius` of `center`. Squared distances are
/// compared in `i128`, so any `u32` radius is safe.
fn disc(
    grid: &TileGrid,
    center: GridPosition,
    radius: u32,
) -> impl Iterator<Item = GridPosition> + use<> {
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    let r = i64::from(radius);
    let r2 = i128::from(r) * i128::from(r);
    let xs = (cx - r).max(0)..=(cx + r).min(i64::from(grid.width()) - 1);
    let ys = (cy - r).max(0)..=(cy + r).min(i64::from(grid.height()) - 1);
    ys.flat_map(move |y| {
        let dy = i128::from(y - cy);
        xs.clone()
            .filter(move |&x| {
                let dx = i128::from(x - cx);
                dx * dx + dy * dy <= r2
            })
            .map(move |x| GridPosition::new(x as i32, y as i32))
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisibilityEngine;

impl VisibilityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Every structure with hit points left (finished or not) and every
    /// living unit, each with its own radius.
    pub fn sources(
        &self,
        grid: &TileGrid,
        structures: &StructureStore,
        units: &UnitMap,
    ) -> Vec<RevealSource> {
        let from_structures = structures
            .iter()
            .filter(|(_, s)| s.is_alive())
            .map(|(_, s)| RevealSource {
                center: s.center_tile(),
                radius: s.sight_radius,
            });
        let from_units = units
            .values()
            .filter(|u| u.is_alive())
            .map(|u| RevealSource {
                center: grid.world_to_grid(u.position),
                radius: u.sight_radius,
            });
        from_structures.chain(from_units).collect()
    }

    /// Rebuild `in_sight` for the whole grid.
    pub fn recompute(
        &self,
        grid: &mut TileGrid,
        structures: &StructureStore,
        units: &UnitMap,
    ) -> VisibilityStats {
        let sources = self.sources(grid, structures, units);
        grid.clear_in_sight();
        for source in &sources {
            for pos in disc(grid, source.center, source.radius) {
                grid.mark_in_sight(pos);
            }
        }
        let stats = VisibilityStats {
            sources: sources.len(),
            in_sight: grid.in_sight_count(),
            explored: grid.explored_count(),
        };
        trace!(
            sources = stats.sources,
            in_sight = stats.in_sight,
            explored = stats.explored,
            "visibility recomputed"
        );
        stats
    }

    /// Explore a disc without putting it in sight. Returns how many cells
    /// were newly explored.
    pub fn reveal_area(&self, grid: &mut TileGrid, center: GridPosition, radius: u32) -> usize {
        disc(grid, center, radius)
            .filter(|&pos| grid.reveal(pos))
            .count()
    }
}
