//! Construction: reserving ground, walking builders to it, and putting
//! structures up.
//!
//! # Lifecycle
//!
//! 1. **Validate** -- [`ConstructionController::request_placement`] runs the
//!    checks in [`placement`]. A rejection changes nothing.
//! 2. **Reserve** -- the cost is paid, the footprint is marked
//!    `Reservation(task)`, and the task joins the current gesture's
//!    [`BuilderGroup`]. Every selected builder is put on that group.
//! 3. **Execute** -- when a member reaches the front task, the structure is
//!    created under construction and the task leaves the shared queue.
//!    An empty group dissolves and its builders go idle.
//! 4. **Cancel** -- a non-build order, a builder's death, or an explicit
//!    cancel drains the whole group: each task is refunded once and its
//!    reservation released.
//!
//! Groups live in an arena; builders only hold a [`GroupId`].

pub mod placement;
pub mod task;

pub use placement::PlacementError;
pub use task::{BuildTask, BuilderGroup};

use bastion_core::catalog::StructureCatalog;
use bastion_core::fixed::{Fixed64, Ticks};
use bastion_core::grid::{GridPosition, Occupant, TileGrid, WorldPoint};
use bastion_core::id::{DepositId, GroupId, StructureId, TaskId, UnitId};
use bastion_core::resource::ResourceAmounts;
use bastion_core::structure::{Structure, StructureKind, StructureStore};
use bastion_core::unit::{UnitCommand, UnitMap};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConstructionEvent {
    TaskQueued {
        task: TaskId,
        kind: StructureKind,
        anchor: GridPosition,
        tick: Ticks,
    },
    TaskExecuted {
        task: TaskId,
        structure: StructureId,
        builder: UnitId,
        tick: Ticks,
    },
    TasksRefunded {
        group: GroupId,
        tasks: usize,
        refund: ResourceAmounts,
        tick: Ticks,
    },
    StructureCompleted {
        structure: StructureId,
        tick: Ticks,
    },
    StructureRemoved {
        structure: StructureId,
        kind: StructureKind,
        tick: Ticks,
    },
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything the controller reads or writes, borrowed for one call.
pub struct BuildContext<'a> {
    pub grid: &'a mut TileGrid,
    pub structures: &'a mut StructureStore,
    pub units: &'a mut UnitMap,
    pub resources: &'a mut ResourceAmounts,
    pub catalog: &'a StructureCatalog,
    pub ticks_per_second: u32,
    pub tick: Ticks,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Gesture {
    group: Option<GroupId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionController {
    groups: SlotMap<GroupId, BuilderGroup>,
    gesture: Option<Gesture>,
    next_task_id: u64,
    pub arrival_margin: f32,
    pub sell_refund_ratio: Fixed64,
    #[serde(skip)]
    events: Vec<ConstructionEvent>,
}

impl Default for ConstructionController {
    fn default() -> Self {
        Self::new(4.0, Fixed64::from_num(0.5))
    }
}

impl ConstructionController {
    pub fn new(arrival_margin: f32, sell_refund_ratio: Fixed64) -> Self {
        Self {
            groups: SlotMap::with_key(),
            gesture: None,
            next_task_id: 0,
            arrival_margin,
            sell_refund_ratio,
            events: Vec::new(),
        }
    }

    // -- Queries --

    pub fn group(&self, id: GroupId) -> Option<&BuilderGroup> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &BuilderGroup)> {
        self.groups.iter()
    }

    pub fn pending_tasks(&self) -> usize {
        self.groups.values().map(BuilderGroup::len).sum()
    }

    pub fn drain_events(&mut self) -> Vec<ConstructionEvent> {
        std::mem::take(&mut self.events)
    }

    // -- Gestures --

    /// Start a placement gesture. Placements until [`end_gesture`](Self::end_gesture)
    /// share one group.
    pub fn begin_gesture(&mut self) {
        self.gesture = Some(Gesture::default());
    }

    pub fn end_gesture(&mut self) {
        self.gesture = None;
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    fn gesture_group(&self) -> Option<GroupId> {
        self.gesture
            .as_ref()
            .and_then(|g| g.group)
            .filter(|g| self.groups.contains_key(*g))
    }

    // -- Placement --

    /// Validate and reserve a placement at `point`.
    ///
    /// Opens a gesture if none is open. On success the cost is paid, the
    /// footprint reserved, and every living builder in `selected` assigned
    /// to the gesture's group.
    pub fn request_placement(
        &mut self,
        ctx: &mut BuildContext<'_>,
        kind: StructureKind,
        point: WorldPoint,
        selected: &[UnitId],
    ) -> Result<TaskId, PlacementError> {
        let result = self.try_reserve(ctx, kind, point, selected);
        if let Err(err) = &result {
            debug!(?kind, %err, "placement rejected");
        }
        result
    }

    fn try_reserve(
        &mut self,
        ctx: &mut BuildContext<'_>,
        kind: StructureKind,
        point: WorldPoint,
        selected: &[UnitId],
    ) -> Result<TaskId, PlacementError> {
        let spec = ctx
            .catalog
            .get(kind)
            .ok_or(PlacementError::UnknownKind(kind))?;

        let builders: Vec<UnitId> = selected
            .iter()
            .copied()
            .filter(|id| ctx.units.get(*id).is_some_and(|u| u.can_build()))
            .collect();
        if builders.is_empty() {
            return Err(PlacementError::NoBuilder);
        }

        let anchor = ctx.grid.world_to_grid(point);
        if let Some(g) = self.gesture_group() {
            if self.groups[g].has_task_at(anchor) {
                return Err(PlacementError::DuplicateCell(anchor));
            }
        }
        if !ctx.resources.covers(&spec.cost) {
            return Err(PlacementError::InsufficientFunds);
        }
        placement::check_footprint(ctx.grid, kind, anchor, spec.footprint)?;

        // Everything below succeeds.
        ctx.resources.try_spend(&spec.cost);
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        for tile in spec.footprint.tiles(anchor) {
            ctx.grid.occupy(tile, Occupant::Reservation(id));
        }

        let group = match self.gesture_group() {
            Some(g) => g,
            None => {
                let g = self.groups.insert(BuilderGroup::new());
                self.gesture = Some(Gesture { group: Some(g) });
                g
            }
        };
        self.groups[group].tasks.push_back(BuildTask {
            id,
            kind,
            target: ctx.grid.footprint_center(anchor, spec.footprint),
            anchor,
            footprint: spec.footprint,
            cost: spec.cost,
            assigned_builder: builders.first().copied(),
        });

        for builder in builders {
            let current = ctx.units.get(builder).and_then(|u| u.build_group);
            if let Some(old) = current.filter(|&old| old != group) {
                self.cancel_group(ctx, old);
            }
            if let Some(unit) = ctx.units.get_mut(builder) {
                unit.build_group = Some(group);
                unit.command = UnitCommand::Build;
            }
            if let Some(g) = self.groups.get_mut(group) {
                g.members.insert(builder);
            }
        }

        debug!(task = id.0, ?kind, x = anchor.x, y = anchor.y, "placement reserved");
        self.events.push(ConstructionEvent::TaskQueued {
            task: id,
            kind,
            anchor,
            tick: ctx.tick,
        });
        Ok(id)
    }

    // -- Execution --

    fn has_arrived(&self, grid: &TileGrid, task: &BuildTask, position: WorldPoint, size: f32) -> bool {
        let (min, max) = grid.footprint_bounds(task.anchor, task.footprint);
        let slack = size / 2.0 + self.arrival_margin;
        position.x >= min.x - slack
            && position.x <= max.x + slack
            && position.y >= min.y - slack
            && position.y <= max.y + slack
    }

    /// Execute the front task of `builder`'s group if the builder has
    /// reached it. Returns the new structure.
    pub fn execute(&mut self, ctx: &mut BuildContext<'_>, builder: UnitId) -> Option<StructureId> {
        let unit = ctx.units.get(builder).filter(|u| u.can_build())?;
        let (position, size) = (unit.position, unit.size);
        let group_id = unit.build_group?;
        let task = self.groups.get(group_id)?.front()?;
        if !self.has_arrived(ctx.grid, task, position, size) {
            return None;
        }
        let spec = ctx.catalog.get(task.kind)?;

        let mut structure =
            Structure::from_spec(task.kind, spec, task.anchor, task.target, ctx.ticks_per_second);
        structure.cost = task.cost;
        structure.begin_construction(spec.build_ticks);
        let extracts = task.kind.extracts();
        let deposits: Vec<DepositId> = task
            .tiles()
            .filter_map(|tile| {
                let (id, deposit) = ctx.grid.deposit_at(tile)?;
                (Some(deposit.kind) == extracts && deposit.is_available()).then_some(id)
            })
            .collect();
        structure.deposit = deposits.first().copied();

        let id = ctx.structures.insert(structure);
        let task = self.groups.get_mut(group_id)?.tasks.pop_front()?;
        for tile in task.tiles() {
            ctx.grid.occupy(tile, Occupant::Structure(id));
        }
        for d in deposits {
            ctx.grid.cover_deposit(d, id);
        }

        debug!(task = task.id.0, kind = ?task.kind, "task executed");
        self.events.push(ConstructionEvent::TaskExecuted {
            task: task.id,
            structure: id,
            builder,
            tick: ctx.tick,
        });

        if self.groups.get(group_id).is_some_and(BuilderGroup::is_empty) {
            self.dissolve(ctx.units, group_id);
        }
        Some(id)
    }

    /// Remove a group and idle its members.
    fn dissolve(&mut self, units: &mut UnitMap, group_id: GroupId) -> Option<BuilderGroup> {
        let group = self.groups.remove(group_id)?;
        for member in &group.members {
            if let Some(unit) = units.get_mut(*member) {
                if unit.build_group == Some(group_id) {
                    unit.build_group = None;
                    if unit.command.is_build() {
                        unit.command = UnitCommand::Idle;
                    }
                }
            }
        }
        Some(group)
    }

    // -- Cancellation --

    /// Drain a whole group: refund every task, release every reservation,
    /// and idle the members. Returns the total refunded.
    pub fn cancel_group(&mut self, ctx: &mut BuildContext<'_>, group_id: GroupId) -> ResourceAmounts {
        let Some(group) = self.dissolve(ctx.units, group_id) else {
            return ResourceAmounts::ZERO;
        };
        let refund = group.pending_cost();
        for task in &group.tasks {
            for tile in task.tiles() {
                let reserved = ctx
                    .grid
                    .cell_at(tile)
                    .is_some_and(|c| c.occupant == Some(Occupant::Reservation(task.id)));
                if reserved {
                    ctx.grid.release(tile);
                }
            }
        }
        ctx.resources.add(&refund);

        debug!(tasks = group.tasks.len(), refund = %refund.total(), "queue refunded");
        self.events.push(ConstructionEvent::TasksRefunded {
            group: group_id,
            tasks: group.tasks.len(),
            refund,
            tick: ctx.tick,
        });
        refund
    }

    /// Cancel the group `builder` is working for, if any.
    pub fn clear_queue(&mut self, ctx: &mut BuildContext<'_>, builder: UnitId) -> ResourceAmounts {
        match ctx.units.get(builder).and_then(|u| u.build_group) {
            Some(g) => self.cancel_group(ctx, g),
            None => ResourceAmounts::ZERO,
        }
    }

    /// Give a unit a new order. Anything other than `Build` cancels the
    /// builder's whole group first.
    pub fn issue_command(&mut self, ctx: &mut BuildContext<'_>, unit: UnitId, command: UnitCommand) {
        if command.is_build() {
            return;
        }
        self.clear_queue(ctx, unit);
        if let Some(u) = ctx.units.get_mut(unit) {
            u.command = command;
        }
    }

    /// A builder died: its group is cancelled.
    pub fn on_builder_died(&mut self, ctx: &mut BuildContext<'_>, builder: UnitId) -> ResourceAmounts {
        self.clear_queue(ctx, builder)
    }

    // -- Demolition --

    /// Remove a structure and free its footprint.
    pub fn demolish(&mut self, ctx: &mut BuildContext<'_>, id: StructureId) -> Option<Structure> {
        let structure = ctx.structures.remove(id)?;
        for tile in structure.tiles() {
            let owned = ctx
                .grid
                .cell_at(tile)
                .is_some_and(|c| c.structure() == Some(id));
            if owned {
                ctx.grid.release(tile);
            }
        }
        debug!(?id, kind = ?structure.kind, "structure removed");
        self.events.push(ConstructionEvent::StructureRemoved {
            structure: id,
            kind: structure.kind,
            tick: ctx.tick,
        });
        Some(structure)
    }

    /// Demolish and refund `sell_refund_ratio` of what was paid.
    pub fn sell(&mut self, ctx: &mut BuildContext<'_>, id: StructureId) -> Option<ResourceAmounts> {
        let structure = self.demolish(ctx, id)?;
        let refund = structure.cost.scaled(self.sell_refund_ratio);
        ctx.resources.add(&refund);
        Some(refund)
    }

    /// Demolish every structure at zero hit points.
    pub fn reap_destroyed(&mut self, ctx: &mut BuildContext<'_>) -> Vec<StructureId> {
        let dead: Vec<StructureId> = ctx
            .structures
            .iter()
            .filter(|(_, s)| !s.is_alive())
            .map(|(id, _)| id)
            .collect();
        for &id in &dead {
            self.demolish(ctx, id);
        }
        dead
    }

    // -- Per-tick --

    /// One construction phase: reap the destroyed, advance building
    /// progress, steer builders, and execute on arrival.
    pub fn step(&mut self, ctx: &mut BuildContext<'_>) {
        self.reap_destroyed(ctx);

        for (id, s) in ctx.structures.iter_mut() {
            if s.advance_construction() {
                self.events.push(ConstructionEvent::StructureCompleted {
                    structure: id,
                    tick: ctx.tick,
                });
            }
        }

        let group_ids: Vec<GroupId> = self.groups.keys().collect();
        for group_id in group_ids {
            let Some(group) = self.groups.get(group_id) else {
                continue;
            };
            let lost_member = group
                .members
                .iter()
                .any(|m| !ctx.units.get(*m).is_some_and(|u| u.is_alive()));
            if lost_member {
                self.cancel_group(ctx, group_id);
                continue;
            }

            let members: Vec<UnitId> = group.members.iter().copied().collect();
            for member in members {
                let Some(target) = self
                    .groups
                    .get(group_id)
                    .and_then(|g| g.front())
                    .map(|t| t.target)
                else {
                    break;
                };
                if self.execute(ctx, member).is_some() {
                    continue;
                }
                if let Some(unit) = ctx.units.get_mut(member) {
                    unit.step_toward(target);
                }
                self.execute(ctx, member);
            }
        }

        trace!(
            groups = self.groups.len(),
            pending = self.pending_tasks(),
            "construction step"
        );
    }
}
