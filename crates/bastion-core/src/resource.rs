//! Resource kinds, quantity bundles, and grid-bound deposits.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::grid::GridPosition;
use crate::id::StructureId;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The extractable resource kinds. Every deposit carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Gold,
    Oil,
    Crystal,
}

impl ResourceKind {
    /// All resource kinds in a fixed order.
    pub fn all() -> [ResourceKind; 3] {
        [ResourceKind::Gold, ResourceKind::Oil, ResourceKind::Crystal]
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// A bundle of quantities, one per resource kind.
///
/// Used for the global pool, structure costs, and storage buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmounts {
    #[serde(default)]
    pub gold: Fixed64,
    #[serde(default)]
    pub oil: Fixed64,
    #[serde(default)]
    pub crystal: Fixed64,
}

impl ResourceAmounts {
    pub const ZERO: ResourceAmounts = ResourceAmounts {
        gold: Fixed64::ZERO,
        oil: Fixed64::ZERO,
        crystal: Fixed64::ZERO,
    };

    pub fn new(gold: Fixed64, oil: Fixed64, crystal: Fixed64) -> Self {
        Self { gold, oil, crystal }
    }

    /// A bundle holding only gold.
    pub fn gold(amount: Fixed64) -> Self {
        Self {
            gold: amount,
            ..Self::ZERO
        }
    }

    /// A bundle holding a single kind.
    pub fn single(kind: ResourceKind, amount: Fixed64) -> Self {
        let mut out = Self::ZERO;
        *out.get_mut(kind) = amount;
        out
    }

    pub fn get(&self, kind: ResourceKind) -> Fixed64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Oil => self.oil,
            ResourceKind::Crystal => self.crystal,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Fixed64 {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Oil => &mut self.oil,
            ResourceKind::Crystal => &mut self.crystal,
        }
    }

    /// Sum across all kinds, saturating at the fixed-point limit.
    pub fn total(&self) -> Fixed64 {
        self.gold.saturating_add(self.oil).saturating_add(self.crystal)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == Fixed64::ZERO
    }

    /// Whether every kind in `self` is at least the matching kind in `cost`.
    pub fn covers(&self, cost: &ResourceAmounts) -> bool {
        ResourceKind::all()
            .into_iter()
            .all(|k| self.get(k) >= cost.get(k))
    }

    /// Add `other` kind by kind. Each kind saturates instead of wrapping.
    pub fn add(&mut self, other: &ResourceAmounts) {
        for k in ResourceKind::all() {
            let sum = self.get(k).saturating_add(other.get(k));
            *self.get_mut(k) = sum;
        }
    }

    /// Deduct `cost` if affordable. Returns false and leaves `self`
    /// untouched otherwise.
    pub fn try_spend(&mut self, cost: &ResourceAmounts) -> bool {
        if !self.covers(cost) {
            return false;
        }
        for k in ResourceKind::all() {
            *self.get_mut(k) -= cost.get(k);
        }
        true
    }

    /// Multiply every kind by `factor`.
    pub fn scaled(&self, factor: Fixed64) -> ResourceAmounts {
        ResourceAmounts {
            gold: self.gold.saturating_mul(factor),
            oil: self.oil.saturating_mul(factor),
            crystal: self.crystal.saturating_mul(factor),
        }
    }
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

/// An extractable node bound to one grid cell.
///
/// Building a matching producer on the deposit covers it; removing the
/// producer uncovers it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub kind: ResourceKind,
    pub position: GridPosition,
    pub covered: bool,
    /// Remaining reserves. `None` means inexhaustible.
    pub remaining: Option<Fixed64>,
    /// The producer currently built on this deposit.
    pub extractor: Option<StructureId>,
}

impl ResourceDeposit {
    pub fn new(kind: ResourceKind, position: GridPosition, remaining: Option<Fixed64>) -> Self {
        Self {
            kind,
            position,
            covered: false,
            remaining,
            extractor: None,
        }
    }

    pub fn is_depleted(&self) -> bool {
        matches!(self.remaining, Some(r) if r <= Fixed64::ZERO)
    }

    /// Uncovered and not depleted: a new extractor may claim it.
    pub fn is_available(&self) -> bool {
        !self.covered && !self.is_depleted()
    }

    /// Take up to `amount` from the reserves, returning what was taken.
    pub fn draw(&mut self, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        match self.remaining.as_mut() {
            None => amount,
            Some(left) => {
                let taken = amount.min(*left).max(Fixed64::ZERO);
                *left -= taken;
                taken
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    #[test]
    fn covers_checks_every_kind() {
        let pool = ResourceAmounts::new(fixed(100.0), fixed(5.0), fixed(0.0));
        assert!(pool.covers(&ResourceAmounts::gold(fixed(100.0))));
        assert!(!pool.covers(&ResourceAmounts::single(ResourceKind::Oil, fixed(6.0))));
        assert!(!pool.covers(&ResourceAmounts::single(ResourceKind::Crystal, fixed(1.0))));
    }

    #[test]
    fn try_spend_is_all_or_nothing() {
        let mut pool = ResourceAmounts::new(fixed(50.0), fixed(10.0), fixed(0.0));
        let cost = ResourceAmounts::new(fixed(20.0), fixed(20.0), fixed(0.0));
        assert!(!pool.try_spend(&cost));
        assert_eq!(pool.gold, fixed(50.0));
        assert_eq!(pool.oil, fixed(10.0));

        let cheap = ResourceAmounts::new(fixed(20.0), fixed(5.0), fixed(0.0));
        assert!(pool.try_spend(&cheap));
        assert_eq!(pool.gold, fixed(30.0));
        assert_eq!(pool.oil, fixed(5.0));
    }

    #[test]
    fn scaled_and_total() {
        let cost = ResourceAmounts::new(fixed(40.0), fixed(10.0), fixed(0.0));
        let half = cost.scaled(fixed(0.5));
        assert_eq!(half.gold, fixed(20.0));
        assert_eq!(half.total(), fixed(25.0));
    }

    #[test]
    fn arithmetic_saturates_near_the_limit() {
        let mut pool = ResourceAmounts::gold(Fixed64::MAX - fixed(1.0));
        pool.add(&ResourceAmounts::gold(fixed(10.0)));
        assert_eq!(pool.gold, Fixed64::MAX);

        let full = ResourceAmounts::new(Fixed64::MAX, Fixed64::MAX, fixed(5.0));
        assert_eq!(full.total(), Fixed64::MAX);
        assert_eq!(full.scaled(fixed(2.0)).oil, Fixed64::MAX);
        assert_eq!(full.scaled(fixed(2.0)).crystal, fixed(10.0));
    }

    #[test]
    fn finite_deposit_draw_clips_to_remaining() {
        let mut d = ResourceDeposit::new(ResourceKind::Gold, GridPosition::new(0, 0), Some(fixed(15.0)));
        assert_eq!(d.draw(fixed(10.0)), fixed(10.0));
        assert_eq!(d.draw(fixed(10.0)), fixed(5.0));
        assert!(d.is_depleted());
        assert!(!d.is_available());
        assert_eq!(d.draw(fixed(10.0)), fixed(0.0));
    }

    #[test]
    fn infinite_deposit_never_depletes() {
        let mut d = ResourceDeposit::new(ResourceKind::Oil, GridPosition::new(0, 0), None);
        assert_eq!(d.draw(fixed(1000.0)), fixed(1000.0));
        assert!(d.is_available());
        d.covered = true;
        assert!(!d.is_available());
    }
}
