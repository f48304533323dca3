//! Structures placed on the grid and the store that owns them.
//!
//! Every structure carries explicit role tags for the two connectivity
//! networks. The propagators consult those tags instead of the structure
//! kind, and the tags are fixed when the structure is created.

use fixed::types::I64F64;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::debug;

use crate::catalog::{StructureCatalog, StructureSpec};
use crate::fixed::{Fixed64, Ticks, per_tick};
use crate::grid::{Footprint, GridPosition, Occupant, TileGrid, WorldPoint};
use crate::id::{DepositId, StructureId};
use crate::resource::{ResourceAmounts, ResourceKind};

// ---------------------------------------------------------------------------
// Kinds and roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Base,
    Generator,
    PowerLine,
    Pipeline,
    Turret,
    Storage,
    GoldMine,
    OilPump,
}

impl StructureKind {
    pub fn all() -> [StructureKind; 8] {
        [
            StructureKind::Base,
            StructureKind::Generator,
            StructureKind::PowerLine,
            StructureKind::Pipeline,
            StructureKind::Turret,
            StructureKind::Storage,
            StructureKind::GoldMine,
            StructureKind::OilPump,
        ]
    }

    pub fn power_role(&self) -> PowerRole {
        match self {
            StructureKind::Base | StructureKind::Generator => PowerRole::Source,
            StructureKind::PowerLine => PowerRole::Conduit,
            _ => PowerRole::Sink,
        }
    }

    pub fn transport_role(&self) -> TransportRole {
        match self {
            StructureKind::Base | StructureKind::Storage => TransportRole::Hub,
            StructureKind::Pipeline => TransportRole::Conduit,
            StructureKind::GoldMine | StructureKind::OilPump => TransportRole::Producer,
            _ => TransportRole::Opaque,
        }
    }

    /// The resource this kind extracts, for structures that must sit on a deposit.
    pub fn extracts(&self) -> Option<ResourceKind> {
        match self {
            StructureKind::GoldMine => Some(ResourceKind::Gold),
            StructureKind::OilPump => Some(ResourceKind::Oil),
            _ => None,
        }
    }
}

/// How a structure takes part in power propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerRole {
    /// Emits power (while fuelled).
    Source,
    /// Carries power onward.
    Conduit,
    /// Receives power but does not pass it on.
    Sink,
}

/// How a structure takes part in resource transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportRole {
    /// Collects output: the base or a storage structure.
    Hub,
    /// Carries resources onward.
    Conduit,
    /// Extracts from a deposit.
    Producer,
    /// Not part of the network.
    Opaque,
}

// ---------------------------------------------------------------------------
// Per-kind state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionProgress {
    pub elapsed: Ticks,
    pub duration: Ticks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorState {
    /// Remaining fuel. `None` means always active.
    pub fuel: Option<Fixed64>,
    pub capacity: Option<Fixed64>,
    pub burn_per_tick: Fixed64,
}

impl GeneratorState {
    pub fn is_active(&self) -> bool {
        self.fuel.is_none_or(|f| f > Fixed64::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerState {
    pub resource: ResourceKind,
    pub output_per_tick: Fixed64,
    pub requires_power: bool,
}

/// Buffered resources held by a storage hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBuffer {
    pub capacity: Fixed64,
    pub stored: ResourceAmounts,
}

impl StorageBuffer {
    pub fn new(capacity: Fixed64) -> Self {
        Self {
            capacity,
            stored: ResourceAmounts::ZERO,
        }
    }

    pub fn free_space(&self) -> Fixed64 {
        (self.capacity - self.stored.total()).max(Fixed64::ZERO)
    }

    /// Add `amount` of `kind`, clipping at capacity.
    ///
    /// Returns `(accepted, discarded)`.
    pub fn accept(&mut self, kind: ResourceKind, amount: Fixed64) -> (Fixed64, Fixed64) {
        let amount = amount.max(Fixed64::ZERO);
        let accepted = amount.min(self.free_space());
        *self.stored.get_mut(kind) += accepted;
        (accepted, amount - accepted)
    }

    /// Remove up to `max` in total, split across kinds in proportion to
    /// what is stored. No kind goes below zero.
    pub fn drain(&mut self, max: Fixed64) -> ResourceAmounts {
        let total = self.stored.total();
        if total <= Fixed64::ZERO || max <= Fixed64::ZERO {
            return ResourceAmounts::ZERO;
        }
        if max >= total {
            let out = self.stored;
            self.stored = ResourceAmounts::ZERO;
            return out;
        }

        let mut out = ResourceAmounts::ZERO;
        for kind in ResourceKind::all() {
            let held = self.stored.get(kind);
            let wide = I64F64::from_num(held) * I64F64::from_num(max) / I64F64::from_num(total);
            let part = Fixed64::saturating_from_num(wide).min(held).max(Fixed64::ZERO);
            *self.stored.get_mut(kind) -= part;
            *out.get_mut(kind) = part;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

/// A building, conduit, or hub placed on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub kind: StructureKind,
    pub anchor: GridPosition,
    pub footprint: Footprint,
    /// World-space centre of the footprint.
    pub position: WorldPoint,
    pub hp: u32,
    pub max_hp: u32,
    pub power_role: PowerRole,
    pub transport_role: TransportRole,
    pub is_powered: bool,
    pub is_connected: bool,
    pub is_connected_to_base: bool,
    pub connected_target: Option<StructureId>,
    pub construction: Option<ConstructionProgress>,
    pub sight_radius: u32,
    pub deposit: Option<DepositId>,
    /// What was paid for this structure.
    pub cost: ResourceAmounts,
    pub generator: Option<GeneratorState>,
    pub producer: Option<ProducerState>,
    pub storage: Option<StorageBuffer>,
}

impl Structure {
    /// Instantiate a completed structure from its spec.
    pub fn from_spec(
        kind: StructureKind,
        spec: &StructureSpec,
        anchor: GridPosition,
        position: WorldPoint,
        ticks_per_second: u32,
    ) -> Self {
        let generator = spec.generator.as_ref().map(|g| GeneratorState {
            fuel: g.fuel,
            capacity: g.fuel,
            burn_per_tick: per_tick(g.burn_per_second, ticks_per_second),
        });
        let producer = match (kind.extracts(), spec.producer.as_ref()) {
            (Some(resource), Some(p)) => Some(ProducerState {
                resource,
                output_per_tick: per_tick(p.output_per_second, ticks_per_second),
                requires_power: p.requires_power,
            }),
            _ => None,
        };

        Self {
            kind,
            anchor,
            footprint: spec.footprint,
            position,
            hp: spec.max_hp.max(1),
            max_hp: spec.max_hp.max(1),
            power_role: kind.power_role(),
            transport_role: kind.transport_role(),
            is_powered: false,
            is_connected: false,
            is_connected_to_base: false,
            connected_target: None,
            construction: None,
            sight_radius: spec.sight_radius,
            deposit: None,
            cost: spec.cost,
            generator,
            producer,
            storage: spec.storage.as_ref().map(|s| StorageBuffer::new(s.capacity)),
        }
    }

    /// Put the structure into its under-construction state: `hp = 1`,
    /// progress counting toward `duration`. A zero duration is a no-op.
    pub fn begin_construction(&mut self, duration: Ticks) {
        if duration == 0 {
            return;
        }
        self.hp = 1;
        self.construction = Some(ConstructionProgress {
            elapsed: 0,
            duration,
        });
    }

    /// Advance construction by one tick. Hit points rise with progress.
    /// Returns true on the tick construction completes.
    pub fn advance_construction(&mut self) -> bool {
        let Some(progress) = self.construction.as_mut() else {
            return false;
        };
        progress.elapsed += 1;
        if progress.elapsed >= progress.duration {
            self.construction = None;
            self.hp = self.max_hp;
            return true;
        }
        let scaled = self.max_hp as u64 * progress.elapsed / progress.duration.max(1);
        self.hp = self.hp.max((scaled as u32).max(1));
        false
    }

    pub fn is_under_construction(&self) -> bool {
        self.construction.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Alive and finished: takes part in networks and production.
    pub fn is_operational(&self) -> bool {
        self.is_alive() && !self.is_under_construction()
    }

    pub fn tiles(&self) -> impl Iterator<Item = GridPosition> + use<> {
        self.footprint.tiles(self.anchor)
    }

    pub fn center_tile(&self) -> GridPosition {
        self.footprint.center_tile(self.anchor)
    }

    /// Whether this structure currently emits power.
    pub fn is_active_source(&self) -> bool {
        if self.power_role != PowerRole::Source || !self.is_operational() {
            return false;
        }
        self.generator.as_ref().is_none_or(GeneratorState::is_active)
    }
}

// ---------------------------------------------------------------------------
// StructureStore
// ---------------------------------------------------------------------------

/// Owns every live structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureStore {
    items: SlotMap<StructureId, Structure>,
}

impl StructureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, structure: Structure) -> StructureId {
        self.items.insert(structure)
    }

    pub fn remove(&mut self, id: StructureId) -> Option<Structure> {
        self.items.remove(id)
    }

    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: StructureId) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &Structure)> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StructureId, &mut Structure)> {
        self.items.iter_mut()
    }

    pub fn ids(&self) -> Vec<StructureId> {
        self.items.keys().collect()
    }

    /// Structures of one kind, in store order.
    pub fn of_kind(&self, kind: StructureKind) -> impl Iterator<Item = (StructureId, &Structure)> {
        self.items.iter().filter(move |(_, s)| s.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Direct spawning
// ---------------------------------------------------------------------------

/// Errors from placing a finished structure directly (map setup).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("no spec for structure kind {0:?}")]
    UnknownKind(StructureKind),
    #[error("footprint leaves the grid at ({}, {})", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("cell ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(GridPosition),
    #[error("no available deposit under the footprint")]
    NoDeposit,
}

/// Place a completed structure on the grid, bypassing construction.
///
/// Fails without side effects when any footprint cell is out of bounds or
/// occupied, except that an extractor may cover a deposit of its resource.
pub fn spawn_structure(
    grid: &mut TileGrid,
    store: &mut StructureStore,
    catalog: &StructureCatalog,
    kind: StructureKind,
    anchor: GridPosition,
    ticks_per_second: u32,
) -> Result<StructureId, SpawnError> {
    let spec = catalog.get(kind).ok_or(SpawnError::UnknownKind(kind))?;
    let mut deposits = Vec::new();
    for tile in spec.footprint.tiles(anchor) {
        let cell = grid.cell_at(tile).ok_or(SpawnError::OutOfBounds(tile))?;
        if !cell.occupied {
            continue;
        }
        match kind.extracts().and_then(|r| grid.extractable_deposit_at(tile, r)) {
            Some(d) => deposits.push(d),
            None => return Err(SpawnError::Occupied(tile)),
        }
    }
    if kind.extracts().is_some() && deposits.is_empty() {
        return Err(SpawnError::NoDeposit);
    }

    let position = grid.footprint_center(anchor, spec.footprint);
    let mut structure = Structure::from_spec(kind, spec, anchor, position, ticks_per_second);
    // The first deposit in footprint order feeds the producer; the rest are
    // covered and linked so nothing under the footprint reads as bare.
    structure.deposit = deposits.first().copied();
    let id = store.insert(structure);
    for tile in spec.footprint.tiles(anchor) {
        grid.occupy(tile, Occupant::Structure(id));
    }
    for d in deposits {
        grid.cover_deposit(d, id);
    }
    debug!(?kind, x = anchor.x, y = anchor.y, "structure spawned");
    Ok(id)
}
