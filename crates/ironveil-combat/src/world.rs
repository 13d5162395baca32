//! Positional query seam.
//!
//! Range, line-of-sight, and facing checks belong to the world/region
//! manager; the engine consults them through [`WorldQuery`] and never
//! computes positions itself.

use ahash::AHashSet;
use ironveil_common::CombatantId;
use parking_lot::RwLock;

/// Interface to the world/region manager.
pub trait WorldQuery: Send + Sync {
    /// Whether `b` is within `range` world units of `a`.
    fn is_in_range(&self, a: CombatantId, b: CombatantId, range: f32) -> bool;
    /// Whether `a` has line of sight to `b`.
    fn has_line_of_sight(&self, a: CombatantId, b: CombatantId) -> bool;
    /// Whether `b` is within `a`'s frontal cone of `cone_degrees`.
    fn is_facing(&self, a: CombatantId, b: CombatantId, cone_degrees: f32) -> bool;
}

/// Reference world with per-pair overrides.
///
/// Everything is in range, visible, and faced unless a pair is explicitly
/// marked otherwise. Used by the engine tests and as a headless default.
#[derive(Debug, Default)]
pub struct OpenField {
    out_of_range: RwLock<AHashSet<(CombatantId, CombatantId)>>,
    occluded: RwLock<AHashSet<(CombatantId, CombatantId)>>,
    turned_away: RwLock<AHashSet<(CombatantId, CombatantId)>>,
}

impl OpenField {
    /// Creates an empty open field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a pair as out of range (or back in range).
    pub fn set_out_of_range(&self, a: CombatantId, b: CombatantId, out: bool) {
        let mut set = self.out_of_range.write();
        if out {
            set.insert((a, b));
        } else {
            set.remove(&(a, b));
        }
    }

    /// Marks a pair as occluded (or visible again).
    pub fn set_occluded(&self, a: CombatantId, b: CombatantId, occluded: bool) {
        let mut set = self.occluded.write();
        if occluded {
            set.insert((a, b));
        } else {
            set.remove(&(a, b));
        }
    }

    /// Marks `a` as turned away from `b` (or facing again).
    pub fn set_turned_away(&self, a: CombatantId, b: CombatantId, away: bool) {
        let mut set = self.turned_away.write();
        if away {
            set.insert((a, b));
        } else {
            set.remove(&(a, b));
        }
    }
}

impl WorldQuery for OpenField {
    fn is_in_range(&self, a: CombatantId, b: CombatantId, _range: f32) -> bool {
        !self.out_of_range.read().contains(&(a, b))
    }

    fn has_line_of_sight(&self, a: CombatantId, b: CombatantId) -> bool {
        !self.occluded.read().contains(&(a, b))
    }

    fn is_facing(&self, a: CombatantId, b: CombatantId, _cone_degrees: f32) -> bool {
        !self.turned_away.read().contains(&(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_field_defaults() {
        let world = OpenField::new();
        let a = CombatantId::from_raw(1);
        let b = CombatantId::from_raw(2);
        assert!(world.is_in_range(a, b, 2.0));
        assert!(world.has_line_of_sight(a, b));
        assert!(world.is_facing(a, b, 90.0));
    }

    #[test]
    fn test_overrides_are_directional() {
        let world = OpenField::new();
        let a = CombatantId::from_raw(1);
        let b = CombatantId::from_raw(2);
        world.set_occluded(a, b, true);
        assert!(!world.has_line_of_sight(a, b));
        assert!(world.has_line_of_sight(b, a));
        world.set_occluded(a, b, false);
        assert!(world.has_line_of_sight(a, b));
    }
}
