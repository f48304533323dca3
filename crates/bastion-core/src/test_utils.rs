//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. Everything here
//! uses 1x1 footprints and one tick per second so expected values can be
//! worked out by hand.

use crate::catalog::{GeneratorSpec, ProducerSpec, StorageSpec, StructureCatalog, StructureSpec};
use crate::config::{ConstructionConfig, GridConfig, SimConfig, UnitDefaults};
use crate::fixed::Fixed64;
use crate::grid::{GridPosition, TileGrid};
use crate::id::StructureId;
use crate::resource::ResourceAmounts;
use crate::structure::{StructureKind, StructureStore, spawn_structure};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn gold(v: f64) -> ResourceAmounts {
    ResourceAmounts::gold(fixed(v))
}

// ===========================================================================
// Catalog and config
// ===========================================================================

/// Every kind costs 10 gold (the base is free), has 100 hp, and takes
/// three ticks to build.
pub fn test_catalog() -> StructureCatalog {
    let mut catalog = StructureCatalog::new();
    for kind in StructureKind::all() {
        let mut spec = StructureSpec::basic(gold(10.0), 100, 3);
        match kind {
            StructureKind::Base => {
                spec.cost = ResourceAmounts::ZERO;
                spec.build_ticks = 0;
                spec.sight_radius = 3;
            }
            StructureKind::Generator => {
                spec.generator = Some(GeneratorSpec {
                    fuel: Some(fixed(100.0)),
                    burn_per_second: fixed(1.0),
                });
            }
            StructureKind::Storage => {
                spec.storage = Some(StorageSpec {
                    capacity: fixed(100.0),
                });
            }
            StructureKind::GoldMine => {
                spec.producer = Some(ProducerSpec {
                    output_per_second: fixed(10.0),
                    requires_power: false,
                });
            }
            StructureKind::OilPump => {
                spec.producer = Some(ProducerSpec {
                    output_per_second: fixed(5.0),
                    requires_power: true,
                });
            }
            _ => {}
        }
        catalog.insert(kind, spec);
    }
    catalog
}

/// A small config: tile size 1, one tick per second, 100 gold to spend.
pub fn test_config(width: u32, height: u32) -> SimConfig {
    SimConfig {
        grid: GridConfig {
            width,
            height,
            tile_size: 1.0,
        },
        ticks_per_second: 1,
        construction: ConstructionConfig {
            arrival_margin: 0.25,
            sell_refund_ratio: fixed(0.5),
        },
        storage_drain_per_second: fixed(5.0),
        units: UnitDefaults {
            sight_radius: 2,
            size: 0.5,
            speed: 1.0,
            hp: 10,
        },
        starting_resources: gold(100.0),
        catalog: test_catalog(),
        ..SimConfig::default()
    }
}

// ===========================================================================
// Grid and structures
// ===========================================================================

/// An open grid with tile size 1, fully explored.
pub fn test_grid(width: u32, height: u32) -> TileGrid {
    let mut grid = TileGrid::new(width, height, 1.0);
    grid.reveal_all();
    grid
}

pub fn test_world_parts(width: u32, height: u32) -> (TileGrid, StructureStore, StructureCatalog) {
    (test_grid(width, height), StructureStore::new(), test_catalog())
}

/// Spawn a completed structure, panicking if the cell is taken.
pub fn place(
    grid: &mut TileGrid,
    store: &mut StructureStore,
    catalog: &StructureCatalog,
    kind: StructureKind,
    x: i32,
    y: i32,
) -> StructureId {
    spawn_structure(grid, store, catalog, kind, GridPosition::new(x, y), 1)
        .unwrap_or_else(|e| panic!("failed to place {kind:?} at ({x}, {y}): {e}"))
}
