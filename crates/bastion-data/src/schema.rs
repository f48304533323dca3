//! Serde schema types for config files.
//!
//! These mirror the runtime config but use `f64` for quantities, which is
//! what people write by hand. The loader converts them to `Fixed64`.
//! Sections carry container-level `#[serde(default)]`, so any field left
//! out of a file takes the built-in default.

use bastion_core::config::SimConfig;
use bastion_core::fixed::fixed64_to_f64;
use bastion_core::structure::StructureKind;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    pub grid: GridData,
    pub ticks_per_second: Option<u32>,
    /// Palette replacement. Empty keeps the default single "ground" entry.
    pub terrains: Vec<TerrainData>,
    pub power: PowerData,
    pub construction: ConstructionData,
    pub storage_drain_per_second: Option<f64>,
    pub units: UnitData,
    pub starting_resources: Option<AmountsData>,
    pub structures: Vec<StructureData>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridData {
    pub width: u32,
    pub height: u32,
    pub tile_size: f64,
}

impl Default for GridData {
    fn default() -> Self {
        let grid = SimConfig::default().grid;
        Self {
            width: grid.width,
            height: grid.height,
            tile_size: grid.tile_size as f64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainData {
    pub name: String,
    #[serde(default = "default_true")]
    pub buildable: bool,
    #[serde(default = "default_true")]
    pub passable: bool,
    #[serde(default)]
    pub roofed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PowerData {
    pub base_halo_radius: u32,
}

impl Default for PowerData {
    fn default() -> Self {
        Self {
            base_halo_radius: SimConfig::default().power.base_halo_radius,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConstructionData {
    pub arrival_margin: f64,
    pub sell_refund_ratio: f64,
}

impl Default for ConstructionData {
    fn default() -> Self {
        let c = SimConfig::default().construction;
        Self {
            arrival_margin: c.arrival_margin as f64,
            sell_refund_ratio: fixed64_to_f64(c.sell_refund_ratio),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnitData {
    pub sight_radius: u32,
    pub size: f64,
    pub speed: f64,
    pub hp: u32,
}

impl Default for UnitData {
    fn default() -> Self {
        let u = SimConfig::default().units;
        Self {
            sight_radius: u.sight_radius,
            size: u.size as f64,
            speed: u.speed as f64,
            hp: u.hp,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AmountsData {
    pub gold: f64,
    pub oil: f64,
    pub crystal: f64,
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FootprintData {
    pub width: u32,
    pub height: u32,
}

impl Default for FootprintData {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

/// One structure kind. Replaces the standard spec for `kind` entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct StructureData {
    pub kind: StructureKind,
    #[serde(default)]
    pub footprint: FootprintData,
    #[serde(default)]
    pub cost: AmountsData,
    pub max_hp: u32,
    #[serde(default)]
    pub build_seconds: f64,
    #[serde(default = "default_sight")]
    pub sight_radius: u32,
    #[serde(default)]
    pub generator: Option<GeneratorData>,
    #[serde(default)]
    pub producer: Option<ProducerData>,
    #[serde(default)]
    pub storage: Option<StorageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorData {
    /// Omit for a source that never runs dry.
    #[serde(default)]
    pub fuel: Option<f64>,
    #[serde(default)]
    pub burn_per_second: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProducerData {
    pub output_per_second: f64,
    #[serde(default)]
    pub requires_power: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageData {
    pub capacity: f64,
}

fn default_true() -> bool {
    true
}

fn default_sight() -> u32 {
    1
}
