//! Hit resolution.
//!
//! Turns an attack attempt into an outcome category through a strict
//! precedence pipeline: target checks, positional checks, defender
//! avoidance, attacker fumble, miss, hit. The pipeline itself is pure —
//! the engine gathers the inputs, this module decides.

use ironveil_common::{CombatantId, StyleId};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::HitConfig;
use crate::equipment::{ArmorSlot, WeaponSlot};
use crate::rng::CombatRng;

// ============================================================================
// Outcome
// ============================================================================

/// Categorical result of an attack attempt, in resolution precedence
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// The target handle no longer resolves.
    NoTarget,
    /// The target resolves but cannot be attacked.
    NoValidTarget,
    /// Target beyond the weapon's effective range.
    OutOfRange,
    /// No line of sight to the target.
    TargetNotVisible,
    /// The target was already dead.
    TargetDead,
    /// Defender evaded.
    Evaded,
    /// Defender parried.
    Parried,
    /// Defender blocked.
    Blocked,
    /// Attacker fumbled; the cycle is consumed.
    Fumbled,
    /// Plain miss from relative skill.
    Missed,
    /// The attack lands.
    Hit {
        /// Whether a requested style's prerequisites held.
        styled: bool,
    },
}

impl AttackOutcome {
    /// Whether the defender avoided the attack outright.
    #[must_use]
    pub const fn is_avoidance(self) -> bool {
        matches!(self, Self::Evaded | Self::Parried | Self::Blocked)
    }

    /// Whether the attack connects and damage resolution follows.
    #[must_use]
    pub const fn connects(self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Whether the attempt consumed the attack cycle. Target and
    /// positional failures leave the cycle unspent; everything from
    /// avoidance onward spends it.
    #[must_use]
    pub const fn consumes_cycle(self) -> bool {
        !matches!(
            self,
            Self::NoTarget
                | Self::NoValidTarget
                | Self::OutOfRange
                | Self::TargetNotVisible
                | Self::TargetDead
        )
    }

    /// Whether this outcome qualifies as an interrupting hit on the
    /// defender.
    #[must_use]
    pub const fn interrupts_defender(self) -> bool {
        matches!(self, Self::Hit { .. } | Self::Blocked | Self::Parried)
    }
}

// ============================================================================
// Attack event and result
// ============================================================================

/// A style (technique) modifier requested for a swing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackStyle {
    /// Style identity.
    pub id: StyleId,
    /// Endurance cost when the style executes.
    pub endurance_cost: f32,
    /// Damage bonus fraction when the style executes.
    pub damage_bonus: f32,
    /// Prerequisite opening.
    pub opening: StyleOpening,
}

/// What must have just happened for a style to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleOpening {
    /// No prerequisite.
    Any,
    /// The attacker's previous incoming swing was evaded.
    AfterEvade,
    /// The attacker's previous incoming swing was parried.
    AfterParry,
    /// The attacker's previous incoming swing was blocked.
    AfterBlock,
}

impl StyleOpening {
    /// Whether `last` satisfies this opening.
    #[must_use]
    pub fn satisfied_by(self, last: Option<AttackOutcome>) -> bool {
        match self {
            Self::Any => true,
            Self::AfterEvade => matches!(last, Some(AttackOutcome::Evaded)),
            Self::AfterParry => matches!(last, Some(AttackOutcome::Parried)),
            Self::AfterBlock => matches!(last, Some(AttackOutcome::Blocked)),
        }
    }
}

/// One attack attempt, constructed per swing and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackEvent {
    /// Attacking combatant.
    pub attacker: CombatantId,
    /// Intended target.
    pub target: CombatantId,
    /// Weapon slot swinging.
    pub slot: WeaponSlot,
    /// Requested style, if any.
    pub style: Option<AttackStyle>,
    /// Attack timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Fully resolved attack, returned to the caller and published on the
/// event bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackResult {
    /// Outcome category.
    pub outcome: AttackOutcome,
    /// Damage before mitigation.
    pub raw_damage: f32,
    /// Critical bonus component of the raw damage.
    pub critical_damage: f32,
    /// Damage after mitigation, as applied to health.
    pub final_damage: f32,
    /// Struck armor slot, for connecting melee/ranged hits.
    pub armor_slot: Option<ArmorSlot>,
}

impl AttackResult {
    /// A result that dealt no damage.
    #[must_use]
    pub const fn without_damage(outcome: AttackOutcome) -> Self {
        Self {
            outcome,
            raw_damage: 0.0,
            critical_damage: 0.0,
            final_damage: 0.0,
            armor_slot: None,
        }
    }

    /// Whether the result was a critical hit.
    #[must_use]
    pub fn was_critical(&self) -> bool {
        self.critical_damage > 0.0
    }
}

// ============================================================================
// Pipeline inputs
// ============================================================================

/// State of the target handle at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Handle does not resolve (despawned, disconnected).
    Missing,
    /// Handle resolves to something that cannot be attacked.
    NotAttackable,
    /// Handle resolves to an attackable combatant.
    Attackable {
        /// Whether the target's health is already zero.
        dead: bool,
    },
}

/// Everything hit resolution needs, gathered by the engine beforehand so
/// the pipeline itself stays deterministic and side-effect-free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInputs {
    /// Target handle state.
    pub target: TargetState,
    /// Whether the target is within weapon range.
    pub in_range: bool,
    /// Whether the target is visible.
    pub visible: bool,
    /// Defender evade chance.
    pub evade_chance: f32,
    /// Defender parry chance.
    pub parry_chance: f32,
    /// Defender block chance.
    pub block_chance: f32,
    /// Attacker fumble chance.
    pub fumble_chance: f32,
    /// Base miss chance from relative skill.
    pub miss_chance: f32,
    /// Whether a style was requested for this swing.
    pub style_requested: bool,
    /// Whether the requested style's prerequisites held.
    pub style_ready: bool,
}

/// Miss chance from the level difference between attacker and defender.
#[must_use]
pub fn miss_chance(attacker_level: u8, defender_level: u8, config: &HitConfig) -> f32 {
    let delta = f32::from(defender_level) - f32::from(attacker_level);
    (config.base_miss_chance + delta * config.miss_per_level)
        .clamp(config.min_miss_chance, config.max_miss_chance)
}

/// Whether the off-hand swings at all this cycle.
#[must_use]
pub fn offhand_swings(dual_wield_spec: u8, rng: &mut CombatRng, config: &HitConfig) -> bool {
    let chance = (config.offhand_base_chance
        + f32::from(dual_wield_spec) * config.offhand_per_spec)
        .min(config.offhand_max_chance);
    rng.chance(chance)
}

/// Resolves the outcome category. First match wins; the order is the
/// contract.
///
/// When more than one avoidance roll succeeds the priority is
/// Evade > Parry > Block.
#[must_use]
pub fn resolve_outcome(inputs: &HitInputs, rng: &mut CombatRng) -> AttackOutcome {
    let outcome = resolve_inner(inputs, rng);
    trace!(?outcome, "attack outcome resolved");
    outcome
}

fn resolve_inner(inputs: &HitInputs, rng: &mut CombatRng) -> AttackOutcome {
    let dead = match inputs.target {
        TargetState::Missing => return AttackOutcome::NoTarget,
        TargetState::NotAttackable => return AttackOutcome::NoValidTarget,
        TargetState::Attackable { dead } => dead,
    };

    if !inputs.in_range {
        return AttackOutcome::OutOfRange;
    }
    if !inputs.visible {
        return AttackOutcome::TargetNotVisible;
    }
    if dead {
        return AttackOutcome::TargetDead;
    }

    // Each avoidance rolls independently; ties resolve by priority.
    let evaded = rng.chance(inputs.evade_chance);
    let parried = rng.chance(inputs.parry_chance);
    let blocked = rng.chance(inputs.block_chance);
    if evaded {
        return AttackOutcome::Evaded;
    }
    if parried {
        return AttackOutcome::Parried;
    }
    if blocked {
        return AttackOutcome::Blocked;
    }

    if rng.chance(inputs.fumble_chance) {
        return AttackOutcome::Fumbled;
    }

    if rng.chance(inputs.miss_chance) {
        return AttackOutcome::Missed;
    }

    AttackOutcome::Hit {
        styled: inputs.style_requested && inputs.style_ready,
    }
}
