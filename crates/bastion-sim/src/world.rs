use std::path::Path;

use bastion_construction::{BuildContext, ConstructionController, PlacementError};
use bastion_core::config::SimConfig;
use bastion_core::fixed::{Fixed64, Ticks};
use bastion_core::grid::{GridPosition, TileGrid, WorldPoint};
use bastion_core::id::{DepositId, StructureId, TaskId, TerrainId, UnitId};
use bastion_core::resource::{ResourceAmounts, ResourceKind};
use bastion_core::structure::{self, SpawnError, Structure, StructureKind, StructureStore};
use bastion_core::unit::{Unit, UnitCommand, UnitKind, UnitMap};
use bastion_data::DataLoadError;
use bastion_fog::{VisibilityEngine, VisibilityStats};
use bastion_pipeline::{DistributionModule, TransportModule};
use bastion_power::PowerModule;
use tracing::{debug, debug_span};

use crate::event::SimEvent;

pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) grid: TileGrid,
    pub(crate) structures: StructureStore,
    pub(crate) units: UnitMap,
    pub(crate) resources: ResourceAmounts,
    pub(crate) construction: ConstructionController,
    power: PowerModule,
    transport: TransportModule,
    distribution: DistributionModule,
    visibility: VisibilityEngine,
    pub(crate) tick: Ticks,
    events: Vec<SimEvent>,
    last_visibility: VisibilityStats,
}

impl World {
    /// A fresh world: every cell painted with terrain 0, nothing explored,
    /// the pool holding the configured starting resources.
    pub fn new(config: SimConfig) -> Self {
        let mut grid = TileGrid::new(
            config.grid.width,
            config.grid.height,
            config.grid.tile_size,
        );
        if let Some(ground) = config.terrains.first() {
            for y in 0..config.grid.height as i32 {
                for x in 0..config.grid.width as i32 {
                    grid.paint_terrain(GridPosition::new(x, y), TerrainId(0), ground);
                }
            }
            grid.rebuild_rooms();
        }
        let mut world = Self::from_parts(config, grid);
        world.resources = world.config.starting_resources;
        world
    }

    /// Load a config file (RON, TOML or JSON) and build a world from it.
    pub fn from_file(path: &Path) -> Result<Self, DataLoadError> {
        Ok(Self::new(bastion_data::load_config(path)?))
    }

    /// Modules built from `config` around an existing grid, with no
    /// structures, units or resources.
    pub(crate) fn from_parts(config: SimConfig, grid: TileGrid) -> Self {
        Self {
            construction: ConstructionController::new(
                config.construction.arrival_margin,
                config.construction.sell_refund_ratio,
            ),
            power: PowerModule::new(config.power.base_halo_radius),
            transport: TransportModule::new(),
            distribution: DistributionModule::new(config.storage_drain_per_tick()),
            visibility: VisibilityEngine::new(),
            grid,
            structures: StructureStore::new(),
            units: UnitMap::with_key(),
            resources: ResourceAmounts::ZERO,
            tick: 0,
            events: Vec::new(),
            last_visibility: VisibilityStats::default(),
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn structures(&self) -> &StructureStore {
        &self.structures
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id)
    }

    /// Direct mutable access for scripted setups.
    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(id)
    }

    pub fn units(&self) -> &UnitMap {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn resources(&self) -> &ResourceAmounts {
        &self.resources
    }

    pub fn construction(&self) -> &ConstructionController {
        &self.construction
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Counts from the most recent visibility pass.
    pub fn visibility_stats(&self) -> VisibilityStats {
        self.last_visibility
    }

    // -----------------------------------------------------------------------
    // Map setup
    // -----------------------------------------------------------------------

    /// Place a completed structure with no cost and no builder.
    pub fn spawn_structure(
        &mut self,
        kind: StructureKind,
        anchor: GridPosition,
    ) -> Result<StructureId, SpawnError> {
        structure::spawn_structure(
            &mut self.grid,
            &mut self.structures,
            &self.config.catalog,
            kind,
            anchor,
            self.config.ticks_per_second,
        )
    }

    /// Add a unit using the configured defaults for size, speed, sight and
    /// hit points.
    pub fn spawn_unit(&mut self, kind: UnitKind, position: WorldPoint) -> UnitId {
        let d = &self.config.units;
        let mut unit = Unit::new(kind, position, d.size, d.speed, d.sight_radius);
        unit.hp = d.hp;
        let id = self.units.insert(unit);
        debug!(?id, ?kind, "unit spawned");
        id
    }

    pub fn add_deposit(
        &mut self,
        pos: GridPosition,
        kind: ResourceKind,
        remaining: Option<Fixed64>,
    ) -> Option<DepositId> {
        self.grid.add_deposit(pos, kind, remaining)
    }

    pub fn place_wall(&mut self, pos: GridPosition, hp: u32) -> bool {
        self.grid.place_wall(pos, hp)
    }

    /// Repaint one cell from the terrain palette. Returns false for an
    /// unknown terrain or a cell off the grid.
    pub fn paint_terrain(&mut self, pos: GridPosition, terrain: TerrainId) -> bool {
        let Some(def) = self.config.terrains.get(terrain.0 as usize) else {
            return false;
        };
        if !self.grid.in_bounds(pos) {
            return false;
        }
        self.grid.paint_terrain(pos, terrain, def);
        self.grid.rebuild_rooms();
        true
    }

    /// Mark every cell explored.
    pub fn reveal_all(&mut self) {
        self.grid.reveal_all();
    }

    /// Explore a disc without putting it in sight.
    pub fn reveal_area(&mut self, center: GridPosition, radius: u32) -> usize {
        self.visibility.reveal_area(&mut self.grid, center, radius)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn with_builder<R>(
        &mut self,
        f: impl FnOnce(&mut ConstructionController, &mut BuildContext<'_>) -> R,
    ) -> R {
        let mut ctx = BuildContext {
            grid: &mut self.grid,
            structures: &mut self.structures,
            units: &mut self.units,
            resources: &mut self.resources,
            catalog: &self.config.catalog,
            ticks_per_second: self.config.ticks_per_second,
            tick: self.tick,
        };
        let out = f(&mut self.construction, &mut ctx);
        self.events
            .extend(self.construction.drain_events().into_iter().map(SimEvent::from));
        out
    }

    pub fn begin_gesture(&mut self) {
        self.construction.begin_gesture();
    }

    pub fn end_gesture(&mut self) {
        self.construction.end_gesture();
    }

    /// Queue a structure at `point` for the selected builders.
    pub fn request_placement(
        &mut self,
        kind: StructureKind,
        point: WorldPoint,
        selected: &[UnitId],
    ) -> Result<TaskId, PlacementError> {
        self.with_builder(|c, ctx| c.request_placement(ctx, kind, point, selected))
    }

    pub fn issue_command(&mut self, unit: UnitId, command: UnitCommand) {
        self.with_builder(|c, ctx| c.issue_command(ctx, unit, command));
    }

    /// Remove a unit. A builder's queue is cancelled and refunded first.
    pub fn kill_unit(&mut self, unit: UnitId) -> bool {
        if !self.units.contains_key(unit) {
            return false;
        }
        if let Some(u) = self.units.get_mut(unit) {
            u.hp = 0;
        }
        self.with_builder(|c, ctx| c.on_builder_died(ctx, unit));
        self.units.remove(unit).is_some()
    }

    /// Apply damage. A structure at zero hit points is removed during the
    /// next construction phase.
    pub fn damage_structure(&mut self, id: StructureId, amount: u32) -> bool {
        let Some(s) = self.structures.get_mut(id) else {
            return false;
        };
        s.hp = s.hp.saturating_sub(amount);
        true
    }

    /// Damage wall content. Returns true when the wall was destroyed.
    pub fn damage_wall(&mut self, pos: GridPosition, amount: u32) -> bool {
        self.grid.damage(pos, amount)
    }

    /// Demolish a structure for a partial refund.
    pub fn sell(&mut self, id: StructureId) -> Option<ResourceAmounts> {
        self.with_builder(|c, ctx| c.sell(ctx, id))
    }

    /// Top up a generator's fuel. Returns the amount accepted.
    pub fn refuel(&mut self, id: StructureId, amount: Fixed64) -> Fixed64 {
        self.power.refuel(&mut self.structures, id, amount)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance one tick.
    pub fn step(&mut self) {
        let span = debug_span!("tick", tick = self.tick);
        let _enter = span.enter();
        let tick = self.tick;

        self.with_builder(|c, ctx| c.step(ctx));

        let power = self.power.tick(&self.grid, &mut self.structures, tick);
        self.events.extend(power.into_iter().map(SimEvent::from));

        let transport = self.transport.tick(&mut self.structures, tick);
        self.events.extend(transport.into_iter().map(SimEvent::from));

        let report = self
            .distribution
            .tick(&mut self.grid, &mut self.structures, &mut self.resources);
        self.events.extend(
            report
                .exhausted
                .into_iter()
                .map(|deposit| SimEvent::DepositExhausted { deposit, tick }),
        );
        let burned = self.power.burn_fuel(&mut self.structures, tick);
        self.events.extend(burned.into_iter().map(SimEvent::from));

        self.last_visibility = self
            .visibility
            .recompute(&mut self.grid, &self.structures, &self.units);

        self.tick += 1;
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Take everything that happened since the last call.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}
