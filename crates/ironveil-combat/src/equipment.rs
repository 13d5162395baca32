//! Weapon, armor, and ammunition descriptors.
//!
//! The equipment system is an external collaborator; the engine consumes
//! immutable descriptors through the [`EquipmentProvider`] seam. The one
//! piece of equipment state the engine is allowed to write is armor
//! condition, via [`EquipmentProvider::degrade_condition`].

use ahash::AHashMap;
use dashmap::DashMap;
use ironveil_common::CombatantId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Slots
// ============================================================================

/// Weapon slot on a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponSlot {
    /// Primary melee hand.
    MainHand,
    /// Secondary melee hand.
    OffHand,
    /// Ranged weapon slot.
    Ranged,
}

/// Armor slot on a combatant's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmorSlot {
    /// Head.
    Head,
    /// Torso.
    Torso,
    /// Arms.
    Arms,
    /// Hands.
    Hands,
    /// Legs.
    Legs,
    /// Feet.
    Feet,
}

impl ArmorSlot {
    /// All armor slots, in struck-location roll order.
    pub const ALL: [Self; 6] = [
        Self::Torso,
        Self::Legs,
        Self::Arms,
        Self::Head,
        Self::Hands,
        Self::Feet,
    ];

    /// Relative weight used when rolling the struck location.
    #[must_use]
    pub const fn strike_weight(self) -> u32 {
        match self {
            Self::Torso => 40,
            Self::Legs => 25,
            Self::Arms => 15,
            Self::Head => 10,
            Self::Hands | Self::Feet => 5,
        }
    }
}

// ============================================================================
// Weapons
// ============================================================================

/// Damage type dealt by a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Slashing damage.
    Slash,
    /// Crushing damage.
    Crush,
    /// Thrusting damage.
    Thrust,
    /// Elemental damage.
    Elemental,
}

impl DamageType {
    /// Damage multiplier for this type.
    #[must_use]
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Slash | Self::Crush | Self::Thrust => 1.0,
            Self::Elemental => 1.1,
        }
    }
}

/// Hand requirement of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    /// One-handed weapon.
    OneHand,
    /// Two-handed weapon.
    TwoHand,
}

/// Class of a ranged weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangedClass {
    /// Bow (longbow, shortbow, recurve).
    Bow,
    /// Crossbow.
    Crossbow,
    /// Thrown weapon (javelin, axe, stone).
    Thrown,
}

impl RangedClass {
    /// Ammunition class this weapon fires.
    #[must_use]
    pub const fn ammo_class(self) -> AmmoClass {
        match self {
            Self::Bow => AmmoClass::Arrow,
            Self::Crossbow => AmmoClass::Bolt,
            Self::Thrown => AmmoClass::Stone,
        }
    }

    /// Whether this class is exempt from the aim hold ceiling.
    #[must_use]
    pub const fn exempt_from_hold_ceiling(self) -> bool {
        matches!(self, Self::Crossbow)
    }
}

/// Immutable weapon descriptor, replaced wholesale on weapon switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDescriptor {
    /// Damage rating.
    pub rating: f32,
    /// Base speed in seconds per swing.
    pub speed: f32,
    /// Damage type.
    pub damage_type: DamageType,
    /// Hand requirement.
    pub handedness: Handedness,
    /// Ranged class, if this is a ranged weapon.
    pub ranged: Option<RangedClass>,
    /// Maximum effective range in world units.
    pub range: f32,
}

impl Default for WeaponDescriptor {
    fn default() -> Self {
        Self {
            rating: 10.0,
            speed: 3.0,
            damage_type: DamageType::Slash,
            handedness: Handedness::OneHand,
            ranged: None,
            range: 2.0,
        }
    }
}

impl WeaponDescriptor {
    /// Set damage rating.
    #[must_use]
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = rating;
        self
    }

    /// Set base speed in seconds.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set damage type.
    #[must_use]
    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    /// Mark as two-handed.
    #[must_use]
    pub fn two_handed(mut self) -> Self {
        self.handedness = Handedness::TwoHand;
        self
    }

    /// Mark as ranged with the given class.
    #[must_use]
    pub fn ranged(mut self, class: RangedClass) -> Self {
        self.ranged = Some(class);
        self.range = 40.0;
        self
    }

    /// Set maximum effective range.
    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    /// Whether this weapon is ranged.
    #[must_use]
    pub const fn is_ranged(&self) -> bool {
        self.ranged.is_some()
    }

    /// Ammunition class this weapon requires, if any.
    #[must_use]
    pub fn required_ammo(&self) -> Option<AmmoClass> {
        self.ranged.map(RangedClass::ammo_class)
    }
}

// ============================================================================
// Armor
// ============================================================================

/// Per-slot armor descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorDescriptor {
    /// Base armor rating.
    pub rating: f32,
    /// Quality, 0–100 percent.
    pub quality: f32,
    /// Condition (wear), 0–100 percent. Decreases with use.
    pub condition: f32,
    /// Absorption fraction, 0.0–1.0.
    pub absorption: f32,
}

impl Default for ArmorDescriptor {
    fn default() -> Self {
        Self {
            rating: 0.0,
            quality: 100.0,
            condition: 100.0,
            absorption: 0.0,
        }
    }
}

impl ArmorDescriptor {
    /// Set base rating.
    #[must_use]
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = rating;
        self
    }

    /// Set quality percent.
    #[must_use]
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality.clamp(0.0, 100.0);
        self
    }

    /// Set condition percent.
    #[must_use]
    pub fn with_condition(mut self, condition: f32) -> Self {
        self.condition = condition.clamp(0.0, 100.0);
        self
    }

    /// Set absorption fraction.
    #[must_use]
    pub fn with_absorption(mut self, absorption: f32) -> Self {
        self.absorption = absorption.clamp(0.0, 1.0);
        self
    }
}

// ============================================================================
// Ammunition
// ============================================================================

/// Class of ammunition, matched against the weapon's ranged class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmmoClass {
    /// Arrows, fired by bows.
    Arrow,
    /// Bolts, fired by crossbows.
    Bolt,
    /// Stones and thrown projectiles.
    Stone,
}

/// Weight class of ammunition, keying the damage multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmmoWeight {
    /// Light ammunition, reduced damage.
    Light,
    /// Standard ammunition.
    Standard,
    /// Heavy ammunition, increased damage.
    Heavy,
}

/// Ammunition descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoDescriptor {
    /// Ammunition class.
    pub class: AmmoClass,
    /// Weight class.
    pub weight: AmmoWeight,
}

impl AmmoDescriptor {
    /// Creates a standard-weight descriptor of the given class.
    #[must_use]
    pub const fn standard(class: AmmoClass) -> Self {
        Self {
            class,
            weight: AmmoWeight::Standard,
        }
    }

    /// Set weight class.
    #[must_use]
    pub const fn with_weight(mut self, weight: AmmoWeight) -> Self {
        self.weight = weight;
        self
    }
}

// ============================================================================
// Provider seam
// ============================================================================

/// Interface to the equipment/inventory system.
pub trait EquipmentProvider: Send + Sync {
    /// Weapon descriptor in a slot, if one is equipped.
    fn weapon(&self, owner: CombatantId, slot: WeaponSlot) -> Option<WeaponDescriptor>;
    /// Armor descriptor for a body slot, if one is equipped.
    fn armor(&self, owner: CombatantId, slot: ArmorSlot) -> Option<ArmorDescriptor>;
    /// Next ammunition unit available, without consuming it.
    fn ammunition(&self, owner: CombatantId) -> Option<AmmoDescriptor>;
    /// Consumes one ammunition unit. Returns false if none remained.
    fn consume_ammunition(&self, owner: CombatantId) -> bool;
    /// Degrades a worn armor slot's condition. Returns the new condition.
    fn degrade_condition(&self, owner: CombatantId, slot: ArmorSlot, amount: f32) -> Option<f32>;
}

/// In-memory equipment provider backed by concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryEquipment {
    weapons: DashMap<(CombatantId, WeaponSlot), WeaponDescriptor>,
    armor: DashMap<CombatantId, AHashMap<ArmorSlot, ArmorDescriptor>>,
    ammo: DashMap<CombatantId, (AmmoDescriptor, u32)>,
}

impl InMemoryEquipment {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Equips a weapon in a slot.
    pub fn equip_weapon(&self, owner: CombatantId, slot: WeaponSlot, weapon: WeaponDescriptor) {
        self.weapons.insert((owner, slot), weapon);
    }

    /// Removes the weapon from a slot.
    pub fn unequip_weapon(&self, owner: CombatantId, slot: WeaponSlot) {
        self.weapons.remove(&(owner, slot));
    }

    /// Equips armor in a body slot.
    pub fn equip_armor(&self, owner: CombatantId, slot: ArmorSlot, armor: ArmorDescriptor) {
        self.armor.entry(owner).or_default().insert(slot, armor);
    }

    /// Stocks ammunition for a combatant.
    pub fn stock_ammunition(&self, owner: CombatantId, ammo: AmmoDescriptor, count: u32) {
        self.ammo.insert(owner, (ammo, count));
    }

    /// Remaining ammunition count.
    #[must_use]
    pub fn ammunition_count(&self, owner: CombatantId) -> u32 {
        self.ammo.get(&owner).map_or(0, |entry| entry.1)
    }

    /// Removes all equipment for a combatant.
    pub fn remove_owner(&self, owner: CombatantId) {
        for slot in [WeaponSlot::MainHand, WeaponSlot::OffHand, WeaponSlot::Ranged] {
            self.weapons.remove(&(owner, slot));
        }
        self.armor.remove(&owner);
        self.ammo.remove(&owner);
    }
}

impl EquipmentProvider for InMemoryEquipment {
    fn weapon(&self, owner: CombatantId, slot: WeaponSlot) -> Option<WeaponDescriptor> {
        self.weapons.get(&(owner, slot)).map(|w| w.clone())
    }

    fn armor(&self, owner: CombatantId, slot: ArmorSlot) -> Option<ArmorDescriptor> {
        self.armor.get(&owner)?.get(&slot).cloned()
    }

    fn ammunition(&self, owner: CombatantId) -> Option<AmmoDescriptor> {
        let entry = self.ammo.get(&owner)?;
        (entry.1 > 0).then_some(entry.0)
    }

    fn consume_ammunition(&self, owner: CombatantId) -> bool {
        if let Some(mut entry) = self.ammo.get_mut(&owner) {
            if entry.1 > 0 {
                entry.1 -= 1;
                return true;
            }
        }
        false
    }

    fn degrade_condition(&self, owner: CombatantId, slot: ArmorSlot, amount: f32) -> Option<f32> {
        let mut armor = self.armor.get_mut(&owner)?;
        let piece = armor.get_mut(&slot)?;
        piece.condition = (piece.condition - amount).max(0.0);
        Some(piece.condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> CombatantId {
        CombatantId::from_raw(11)
    }

    #[test]
    fn test_weapon_builder() {
        let weapon = WeaponDescriptor::default()
            .with_rating(16.5)
            .with_speed(4.2)
            .two_handed();
        assert_eq!(weapon.handedness, Handedness::TwoHand);
        assert!(!weapon.is_ranged());
        assert_eq!(weapon.required_ammo(), None);
    }

    #[test]
    fn test_ranged_ammo_compatibility() {
        let bow = WeaponDescriptor::default().ranged(RangedClass::Bow);
        assert_eq!(bow.required_ammo(), Some(AmmoClass::Arrow));

        let crossbow = WeaponDescriptor::default().ranged(RangedClass::Crossbow);
        assert_eq!(crossbow.required_ammo(), Some(AmmoClass::Bolt));
        assert!(RangedClass::Crossbow.exempt_from_hold_ceiling());
        assert!(!RangedClass::Bow.exempt_from_hold_ceiling());
    }

    #[test]
    fn test_ammo_consumption() {
        let equipment = InMemoryEquipment::new();
        equipment.stock_ammunition(owner(), AmmoDescriptor::standard(AmmoClass::Arrow), 2);

        assert!(equipment.ammunition(owner()).is_some());
        assert!(equipment.consume_ammunition(owner()));
        assert!(equipment.consume_ammunition(owner()));
        assert!(!equipment.consume_ammunition(owner()));
        assert!(equipment.ammunition(owner()).is_none());
    }

    #[test]
    fn test_condition_degrades_and_floors() {
        let equipment = InMemoryEquipment::new();
        equipment.equip_armor(
            owner(),
            ArmorSlot::Torso,
            ArmorDescriptor::default().with_rating(40.0).with_condition(1.0),
        );

        let after = equipment.degrade_condition(owner(), ArmorSlot::Torso, 0.4);
        assert_eq!(after, Some(0.6));
        let floored = equipment.degrade_condition(owner(), ArmorSlot::Torso, 5.0);
        assert_eq!(floored, Some(0.0));
    }

    #[test]
    fn test_strike_weights_cover_all_slots() {
        let total: u32 = ArmorSlot::ALL.iter().map(|s| s.strike_weight()).sum();
        assert_eq!(total, 100);
    }
}
