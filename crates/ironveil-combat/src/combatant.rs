//! Combatant capability interface and concrete records.
//!
//! The engine depends only on the [`Combatant`] trait; players, NPCs, and
//! pets are distinct records implementing it. Health and endurance are
//! interior-mutable behind per-object locks so damage application is a
//! single atomic read-modify-write even when several attackers strike in
//! the same tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ahash::AHashMap;
use ironveil_common::CombatantId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Stats and specializations
// ============================================================================

/// Base attribute kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Physical power, feeds melee damage.
    Strength,
    /// Hardiness, feeds maximum health.
    Constitution,
    /// Precision, feeds ranged damage and draw speed.
    Dexterity,
    /// Reaction speed, feeds attack interval.
    Quickness,
}

/// Weapon specialization lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecLine {
    /// One-handed weapons.
    OneHand,
    /// Two-handed weapons.
    TwoHand,
    /// Fighting with a weapon in each hand.
    DualWield,
    /// Bows.
    Bow,
    /// Crossbows.
    Crossbow,
    /// Thrown weapons.
    Thrown,
}

/// What kind of combatant a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    /// Player character.
    Player,
    /// Non-player character.
    Npc,
    /// Player-controlled pet.
    Pet,
}

impl CombatantKind {
    /// Whether critical bounds use the player-defender cap.
    #[must_use]
    pub const fn is_player_class(self) -> bool {
        matches!(self, Self::Player)
    }
}

// ============================================================================
// Health and endurance
// ============================================================================

/// Result of applying damage to a health pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthChange {
    /// Health remaining after the change, clamped at zero.
    pub remaining: f32,
    /// Whether this change dropped health to zero.
    pub died: bool,
}

#[derive(Debug, Clone, Copy)]
struct HealthState {
    current: f32,
    max: f32,
}

/// Interior-mutable health pool with atomic read-modify-write.
#[derive(Debug)]
pub struct Health {
    state: Mutex<HealthState>,
}

impl Health {
    /// Creates a full health pool.
    #[must_use]
    pub fn new(max: f32) -> Self {
        Self {
            state: Mutex::new(HealthState { current: max, max }),
        }
    }

    /// Current health.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.state.lock().current
    }

    /// Maximum health.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.state.lock().max
    }

    /// Whether health is zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current() <= 0.0
    }

    /// Applies damage as one atomic read-modify-write. Overkill is
    /// allowed; remaining health is clamped at zero.
    pub fn apply_damage(&self, amount: f32) -> HealthChange {
        let mut state = self.state.lock();
        let was_alive = state.current > 0.0;
        state.current = (state.current - amount.max(0.0)).max(0.0);
        HealthChange {
            remaining: state.current,
            died: was_alive && state.current <= 0.0,
        }
    }

    /// Heals up to the maximum.
    pub fn heal(&self, amount: f32) {
        let mut state = self.state.lock();
        state.current = (state.current + amount.max(0.0)).min(state.max);
    }
}

/// Interior-mutable endurance pool.
#[derive(Debug)]
pub struct Endurance {
    state: Mutex<HealthState>,
}

impl Endurance {
    /// Creates a full endurance pool.
    #[must_use]
    pub fn new(max: f32) -> Self {
        Self {
            state: Mutex::new(HealthState { current: max, max }),
        }
    }

    /// Current endurance.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.state.lock().current
    }

    /// Consumes endurance if enough remains. Returns false otherwise,
    /// leaving the pool unchanged.
    pub fn consume(&self, amount: f32) -> bool {
        let mut state = self.state.lock();
        if state.current >= amount {
            state.current -= amount;
            true
        } else {
            false
        }
    }

    /// Whether at least `amount` endurance remains.
    #[must_use]
    pub fn has(&self, amount: f32) -> bool {
        self.state.lock().current >= amount
    }

    /// Regenerates toward the maximum.
    pub fn regen(&self, amount: f32) {
        let mut state = self.state.lock();
        state.current = (state.current + amount.max(0.0)).min(state.max);
    }
}

// ============================================================================
// Capability trait
// ============================================================================

/// Capability interface every combatant record implements.
///
/// The engine never inspects the concrete type; player/NPC/pet behavior
/// differences surface only through these accessors.
pub trait Combatant: Send + Sync {
    /// Unique id.
    fn id(&self) -> CombatantId;
    /// Display name (not localized here).
    fn name(&self) -> &str;
    /// Record kind.
    fn kind(&self) -> CombatantKind;
    /// Level.
    fn level(&self) -> u8;
    /// Base value of an attribute, before items and buffs.
    fn base_stat(&self, stat: StatKind) -> f32;
    /// Trained specialization level in a line.
    fn specialization(&self, line: SpecLine) -> u8;
    /// Health pool.
    fn health(&self) -> &Health;
    /// Endurance pool.
    fn endurance(&self) -> &Endurance;
    /// Whether the combatant is currently in combat.
    fn in_combat(&self) -> bool;
    /// Sets the in-combat flag.
    fn set_in_combat(&self, in_combat: bool);
    /// Current attack target, if any.
    fn target(&self) -> Option<CombatantId>;
    /// Sets or clears the attack target.
    fn set_target(&self, target: Option<CombatantId>);
}

// ============================================================================
// Shared record body
// ============================================================================

#[derive(Debug)]
struct CombatantCore {
    id: CombatantId,
    name: String,
    level: u8,
    stats: AHashMap<StatKind, f32>,
    specs: AHashMap<SpecLine, u8>,
    health: Health,
    endurance: Endurance,
    in_combat: AtomicBool,
    target: AtomicU64,
}

impl CombatantCore {
    fn new(name: &str, level: u8, max_health: f32, max_endurance: f32) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.to_owned(),
            level,
            stats: AHashMap::new(),
            specs: AHashMap::new(),
            health: Health::new(max_health),
            endurance: Endurance::new(max_endurance),
            in_combat: AtomicBool::new(false),
            target: AtomicU64::new(CombatantId::NULL.raw()),
        }
    }

    fn base_stat(&self, stat: StatKind) -> f32 {
        self.stats.get(&stat).copied().unwrap_or(60.0)
    }

    fn specialization(&self, line: SpecLine) -> u8 {
        self.specs.get(&line).copied().unwrap_or(1)
    }

    fn target(&self) -> Option<CombatantId> {
        let raw = self.target.load(Ordering::Acquire);
        let id = CombatantId::from_raw(raw);
        id.is_valid().then_some(id)
    }

    fn set_target(&self, target: Option<CombatantId>) {
        let raw = target.unwrap_or(CombatantId::NULL).raw();
        self.target.store(raw, Ordering::Release);
    }
}

macro_rules! impl_combatant {
    ($record:ty, $kind:expr) => {
        impl Combatant for $record {
            fn id(&self) -> CombatantId {
                self.core.id
            }
            fn name(&self) -> &str {
                &self.core.name
            }
            fn kind(&self) -> CombatantKind {
                $kind
            }
            fn level(&self) -> u8 {
                self.core.level
            }
            fn base_stat(&self, stat: StatKind) -> f32 {
                self.core.base_stat(stat)
            }
            fn specialization(&self, line: SpecLine) -> u8 {
                self.core.specialization(line)
            }
            fn health(&self) -> &Health {
                &self.core.health
            }
            fn endurance(&self) -> &Endurance {
                &self.core.endurance
            }
            fn in_combat(&self) -> bool {
                self.core.in_combat.load(Ordering::Acquire)
            }
            fn set_in_combat(&self, in_combat: bool) {
                self.core.in_combat.store(in_combat, Ordering::Release);
            }
            fn target(&self) -> Option<CombatantId> {
                self.core.target()
            }
            fn set_target(&self, target: Option<CombatantId>) {
                self.core.set_target(target);
            }
        }
    };
}

// ============================================================================
// Concrete records
// ============================================================================

/// A player character.
#[derive(Debug)]
pub struct PlayerCombatant {
    core: CombatantCore,
}

impl PlayerCombatant {
    /// Creates a player at the given level.
    #[must_use]
    pub fn new(name: &str, level: u8) -> Self {
        let max_health = 40.0 + f32::from(level) * 16.0;
        Self {
            core: CombatantCore::new(name, level, max_health, 100.0),
        }
    }

    /// Sets a base stat.
    #[must_use]
    pub fn with_stat(mut self, stat: StatKind, value: f32) -> Self {
        self.core.stats.insert(stat, value);
        self
    }

    /// Sets a specialization level.
    #[must_use]
    pub fn with_spec(mut self, line: SpecLine, level: u8) -> Self {
        self.core.specs.insert(line, level);
        self
    }
}

impl_combatant!(PlayerCombatant, CombatantKind::Player);

/// A non-player character.
#[derive(Debug)]
pub struct NpcCombatant {
    core: CombatantCore,
}

impl NpcCombatant {
    /// Creates an NPC at the given level.
    #[must_use]
    pub fn new(name: &str, level: u8) -> Self {
        let max_health = 30.0 + f32::from(level) * 20.0;
        Self {
            core: CombatantCore::new(name, level, max_health, 100.0),
        }
    }

    /// Sets a base stat.
    #[must_use]
    pub fn with_stat(mut self, stat: StatKind, value: f32) -> Self {
        self.core.stats.insert(stat, value);
        self
    }

    /// Sets a specialization level.
    #[must_use]
    pub fn with_spec(mut self, line: SpecLine, level: u8) -> Self {
        self.core.specs.insert(line, level);
        self
    }
}

impl_combatant!(NpcCombatant, CombatantKind::Npc);

/// A player-controlled pet.
#[derive(Debug)]
pub struct PetCombatant {
    core: CombatantCore,
    owner: CombatantId,
}

impl PetCombatant {
    /// Creates a pet owned by another combatant.
    #[must_use]
    pub fn new(name: &str, level: u8, owner: CombatantId) -> Self {
        let max_health = 20.0 + f32::from(level) * 12.0;
        Self {
            core: CombatantCore::new(name, level, max_health, 100.0),
            owner,
        }
    }

    /// The owning combatant.
    #[must_use]
    pub const fn owner(&self) -> CombatantId {
        self.owner
    }

    /// Sets a base stat.
    #[must_use]
    pub fn with_stat(mut self, stat: StatKind, value: f32) -> Self {
        self.core.stats.insert(stat, value);
        self
    }
}

impl_combatant!(PetCombatant, CombatantKind::Pet);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_at_zero() {
        let health = Health::new(50.0);
        let change = health.apply_damage(80.0);
        assert_eq!(change.remaining, 0.0);
        assert!(change.died);
        assert!(health.is_dead());
    }

    #[test]
    fn test_death_signaled_once() {
        let health = Health::new(10.0);
        assert!(health.apply_damage(20.0).died);
        assert!(!health.apply_damage(5.0).died);
    }

    #[test]
    fn test_negative_damage_is_ignored() {
        let health = Health::new(40.0);
        let change = health.apply_damage(-15.0);
        assert_eq!(change.remaining, 40.0);
        assert!(!change.died);
    }

    #[test]
    fn test_endurance_consume() {
        let endurance = Endurance::new(10.0);
        assert!(endurance.consume(6.0));
        assert!(!endurance.consume(6.0));
        assert!((endurance.current() - 4.0).abs() < f32::EPSILON);
        endurance.regen(100.0);
        assert!((endurance.current() - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_records_share_the_capability_interface() {
        let player = PlayerCombatant::new("Aldric", 50);
        let npc = NpcCombatant::new("bandit", 45);
        let pet = PetCombatant::new("wolf", 40, player.id());

        let all: Vec<&dyn Combatant> = vec![&player, &npc, &pet];
        assert_eq!(all[0].kind(), CombatantKind::Player);
        assert_eq!(all[1].kind(), CombatantKind::Npc);
        assert_eq!(all[2].kind(), CombatantKind::Pet);
        assert!(all[0].kind().is_player_class());
        assert!(!all[1].kind().is_player_class());
        assert_eq!(pet.owner(), player.id());
    }

    #[test]
    fn test_target_handle_round_trip() {
        let npc = NpcCombatant::new("bandit", 10);
        assert_eq!(npc.target(), None);
        let other = CombatantId::from_raw(99);
        npc.set_target(Some(other));
        assert_eq!(npc.target(), Some(other));
        npc.set_target(None);
        assert_eq!(npc.target(), None);
    }

    #[test]
    fn test_default_spec_is_one() {
        let npc = NpcCombatant::new("bandit", 10);
        assert_eq!(npc.specialization(SpecLine::TwoHand), 1);
    }
}
