//! Pending build tasks and the shared queues builders work through.

use std::collections::{BTreeSet, VecDeque};

use bastion_core::grid::{Footprint, GridPosition, WorldPoint};
use bastion_core::id::{TaskId, UnitId};
use bastion_core::resource::ResourceAmounts;
use bastion_core::structure::StructureKind;
use serde::{Deserialize, Serialize};

/// A structure waiting for a builder. Its footprint is reserved and its
/// cost has already been paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTask {
    pub id: TaskId,
    pub kind: StructureKind,
    /// World-space centre of the footprint; builders walk here.
    pub target: WorldPoint,
    pub anchor: GridPosition,
    pub footprint: Footprint,
    pub cost: ResourceAmounts,
    /// The lead builder when the task was queued.
    pub assigned_builder: Option<UnitId>,
}

impl BuildTask {
    pub fn tiles(&self) -> impl Iterator<Item = GridPosition> + use<> {
        self.footprint.tiles(self.anchor)
    }
}

/// A task queue shared by every builder assigned to it.
///
/// Builders hold the group's id, never a copy of the queue, so a task
/// executed by one member is gone for all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuilderGroup {
    pub tasks: VecDeque<BuildTask>,
    pub members: BTreeSet<UnitId>,
}

impl BuilderGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn front(&self) -> Option<&BuildTask> {
        self.tasks.front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn has_task_at(&self, anchor: GridPosition) -> bool {
        self.tasks.iter().any(|t| t.anchor == anchor)
    }

    /// Sum of the costs of every queued task.
    pub fn pending_cost(&self) -> ResourceAmounts {
        let mut total = ResourceAmounts::ZERO;
        for task in &self.tasks {
            total.add(&task.cost);
        }
        total
    }
}
