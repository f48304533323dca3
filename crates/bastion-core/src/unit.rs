//! Mobile units: builders and soldiers.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::grid::WorldPoint;
use crate::id::{GroupId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Builder,
    Soldier,
}

/// The order a unit is currently carrying out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum UnitCommand {
    #[default]
    Idle,
    Move(WorldPoint),
    /// Working through its builder group's task queue.
    Build,
    Hold,
}

impl UnitCommand {
    pub fn is_build(&self) -> bool {
        matches!(self, UnitCommand::Build)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub kind: UnitKind,
    pub position: WorldPoint,
    /// Collision diameter in world units.
    pub size: f32,
    /// World units per tick.
    pub speed: f32,
    pub sight_radius: u32,
    pub hp: u32,
    pub command: UnitCommand,
    pub build_group: Option<GroupId>,
}

impl Unit {
    pub fn new(kind: UnitKind, position: WorldPoint, size: f32, speed: f32, sight_radius: u32) -> Self {
        Self {
            kind,
            position,
            size,
            speed,
            sight_radius,
            hp: 100,
            command: UnitCommand::Idle,
            build_group: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn can_build(&self) -> bool {
        self.kind == UnitKind::Builder && self.is_alive()
    }

    /// Move straight toward `target` by at most `speed`. Returns true once
    /// the unit stands on the target.
    pub fn step_toward(&mut self, target: WorldPoint) -> bool {
        let dist = self.position.distance(&target);
        if dist <= self.speed || dist == 0.0 {
            self.position = target;
            return true;
        }
        let t = self.speed / dist;
        self.position.x += (target.x - self.position.x) * t;
        self.position.y += (target.y - self.position.y) * t;
        false
    }
}

pub type UnitMap = SlotMap<UnitId, Unit>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_toward_clamps_at_target() {
        let mut u = Unit::new(UnitKind::Builder, WorldPoint::new(0.0, 0.0), 1.0, 2.0, 4);
        assert!(!u.step_toward(WorldPoint::new(5.0, 0.0)));
        assert_eq!(u.position, WorldPoint::new(2.0, 0.0));
        assert!(!u.step_toward(WorldPoint::new(5.0, 0.0)));
        assert!(u.step_toward(WorldPoint::new(5.0, 0.0)));
        assert_eq!(u.position, WorldPoint::new(5.0, 0.0));
    }

    #[test]
    fn only_living_builders_build() {
        let mut u = Unit::new(UnitKind::Builder, WorldPoint::default(), 1.0, 1.0, 4);
        assert!(u.can_build());
        u.hp = 0;
        assert!(!u.can_build());
        let s = Unit::new(UnitKind::Soldier, WorldPoint::default(), 1.0, 1.0, 4);
        assert!(!s.can_build());
    }
}
