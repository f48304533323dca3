use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a structure (building, conduit, base) placed on the grid.
    pub struct StructureId;

    /// Identifies a resource deposit owned by the tile grid.
    pub struct DepositId;

    /// Identifies a mobile unit (builder, soldier).
    pub struct UnitId;

    /// Identifies a shared builder task queue.
    pub struct GroupId;
}

/// Identifies a pending build task. Assigned monotonically by the
/// construction controller and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Index into the terrain palette.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TerrainId(pub u16);

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn task_ids_order_by_value() {
        assert!(TaskId(1) < TaskId(2));
        assert_eq!(TaskId(7), TaskId(7));
    }

    #[test]
    fn terrain_id_defaults_to_zero() {
        assert_eq!(TerrainId::default(), TerrainId(0));
    }

    #[test]
    fn removed_keys_are_not_revived() {
        let mut sm = SlotMap::<StructureId, ()>::with_key();
        let a = sm.insert(());
        sm.remove(a);
        let b = sm.insert(());
        assert_ne!(a, b);
        assert!(!sm.contains_key(a));
    }
}
