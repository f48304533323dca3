//! Simulation configuration.
//!
//! `SimConfig::default()` is a complete, playable setup. `bastion-data`
//! builds one of these from a RON/TOML/JSON file.

use serde::{Deserialize, Serialize};

use crate::catalog::StructureCatalog;
use crate::fixed::{Fixed64, per_tick};
use crate::grid::TerrainDef;
use crate::resource::ResourceAmounts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub tile_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            tile_size: 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Cells within this Chebyshev distance of a base are powered without
    /// a line.
    pub base_halo_radius: u32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self { base_halo_radius: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionConfig {
    /// Slack added to a builder's half-size when testing arrival.
    pub arrival_margin: f32,
    /// Fraction of the paid cost returned when selling.
    pub sell_refund_ratio: Fixed64,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            arrival_margin: 4.0,
            sell_refund_ratio: Fixed64::from_num(0.5),
        }
    }
}

/// Largest sight or halo radius a loaded config may set.
pub const MAX_RADIUS: u32 = 1024;

/// Defaults applied to spawned units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefaults {
    pub sight_radius: u32,
    pub size: f32,
    /// World units per tick.
    pub speed: f32,
    pub hp: u32,
}

impl Default for UnitDefaults {
    fn default() -> Self {
        Self {
            sight_radius: 5,
            size: 16.0,
            speed: 4.0,
            hp: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub grid: GridConfig,
    pub ticks_per_second: u32,
    /// Terrain palette. Index 0 is the default for every cell.
    pub terrains: Vec<TerrainDef>,
    pub power: PowerConfig,
    pub construction: ConstructionConfig,
    /// Total a base-connected storage hub hands to the pool each second.
    pub storage_drain_per_second: Fixed64,
    pub units: UnitDefaults,
    pub starting_resources: ResourceAmounts,
    pub catalog: StructureCatalog,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            ticks_per_second: 20,
            terrains: vec![TerrainDef::ground()],
            power: PowerConfig::default(),
            construction: ConstructionConfig::default(),
            storage_drain_per_second: Fixed64::from_num(10),
            units: UnitDefaults::default(),
            starting_resources: ResourceAmounts::gold(Fixed64::from_num(1000)),
            catalog: StructureCatalog::standard(),
        }
    }
}

impl SimConfig {
    pub fn storage_drain_per_tick(&self) -> Fixed64 {
        per_tick(self.storage_drain_per_second, self.ticks_per_second)
    }
}
