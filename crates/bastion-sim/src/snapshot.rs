//! Binary snapshots and determinism hashing.
//!
//! A snapshot holds the config and every piece of mutable world state.
//! Module instances are rebuilt from the config on restore, and buffered
//! events are not carried over.

use bastion_construction::ConstructionController;
use bastion_core::config::SimConfig;
use bastion_core::fixed::Ticks;
use bastion_core::grid::TileGrid;
use bastion_core::resource::ResourceAmounts;
use bastion_core::structure::StructureStore;
use bastion_core::unit::UnitMap;
use serde::{Deserialize, Serialize};

use crate::world::World;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) over a byte stream. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WorldSnapshot {
    tick: Ticks,
    config: SimConfig,
    grid: TileGrid,
    structures: StructureStore,
    units: UnitMap,
    resources: ResourceAmounts,
    construction: ConstructionController,
}

impl World {
    /// Encode the world state with bitcode.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = WorldSnapshot {
            tick: self.tick,
            config: self.config.clone(),
            grid: self.grid.clone(),
            structures: self.structures.clone(),
            units: self.units.clone(),
            resources: self.resources,
            construction: self.construction.clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Rebuild a world from [`snapshot`](Self::snapshot) output.
    pub fn restore(data: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        let mut world = World::from_parts(snapshot.config, snapshot.grid);
        world.tick = snapshot.tick;
        world.structures = snapshot.structures;
        world.units = snapshot.units;
        world.resources = snapshot.resources;
        world.construction = snapshot.construction;
        Ok(world)
    }

    /// Hash of the snapshot encoding. Two worlds built and driven the same
    /// way hash the same.
    pub fn state_hash(&self) -> Result<u64, SnapshotError> {
        let mut hash = StateHash::new();
        hash.write(&self.snapshot()?);
        Ok(hash.finish())
    }
}
