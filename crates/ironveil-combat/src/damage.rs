//! Damage resolution.
//!
//! Given a connecting hit: base damage from the weapon, an independent
//! critical roll, then mitigation through effective armor factor and
//! absorption. Armor wear on the struck slot is the resolver's one side
//! effect, applied by the engine through the equipment provider.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::combatant::CombatantKind;
use crate::config::DamageConfig;
use crate::equipment::{AmmoDescriptor, AmmoWeight, ArmorDescriptor, ArmorSlot, Handedness, WeaponDescriptor};
use crate::rng::CombatRng;

// ============================================================================
// Breakdown
// ============================================================================

/// Damage numbers for one connecting hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    /// Base damage before the critical component.
    pub base: f32,
    /// Critical bonus component.
    pub critical: f32,
    /// Raw damage (base + critical).
    pub raw: f32,
    /// Effective armor factor of the struck location.
    pub effective_armor: f32,
    /// Absorption fraction of the struck location.
    pub absorption: f32,
    /// Final damage after mitigation, floored at zero.
    pub final_damage: f32,
    /// Struck armor slot.
    pub slot: ArmorSlot,
}

// ============================================================================
// Resolver
// ============================================================================

/// Computes damage numbers from descriptors and configuration.
#[derive(Debug, Clone, Default)]
pub struct DamageResolver {
    /// Damage tunables.
    pub config: DamageConfig,
}

impl DamageResolver {
    /// Creates a resolver with default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with explicit tunables.
    #[must_use]
    pub fn with_config(config: DamageConfig) -> Self {
        Self { config }
    }

    /// Handedness multiplier. Two-handed weapons gain a flat bonus plus a
    /// per-specialization-level ramp above level 1.
    #[must_use]
    pub fn handedness_multiplier(&self, handedness: Handedness, spec_level: u8) -> f32 {
        match handedness {
            Handedness::OneHand => 1.0,
            Handedness::TwoHand => {
                1.0 + self.config.two_hand_bonus
                    + self.config.two_hand_per_spec * f32::from(spec_level.saturating_sub(1))
            }
        }
    }

    /// Ammunition weight multiplier.
    #[must_use]
    pub fn ammo_multiplier(&self, ammo: Option<AmmoDescriptor>) -> f32 {
        match ammo.map(|a| a.weight) {
            Some(AmmoWeight::Light) => self.config.ammo_light_multiplier,
            Some(AmmoWeight::Heavy) => self.config.ammo_heavy_multiplier,
            Some(AmmoWeight::Standard) | None => 1.0,
        }
    }

    /// Base damage for a swing:
    /// `rating × speed × scale × handedness × type × ammo`.
    #[must_use]
    pub fn base_damage(
        &self,
        weapon: &WeaponDescriptor,
        spec_level: u8,
        ammo: Option<AmmoDescriptor>,
        style_bonus: f32,
    ) -> f32 {
        let damage = weapon.rating
            * weapon.speed
            * self.config.base_damage_scale
            * self.handedness_multiplier(weapon.handedness, spec_level)
            * weapon.damage_type.multiplier()
            * self.ammo_multiplier(ammo);
        damage * (1.0 + style_bonus.max(0.0))
    }

    /// Critical bonus damage. An independent roll gated by the critical
    /// chance; on success the bonus is uniform within bounds that depend
    /// on the defender kind, widened while berserk is active.
    #[must_use]
    pub fn critical_bonus(
        &self,
        base: f32,
        crit_chance: f32,
        defender: CombatantKind,
        berserk_rank: Option<u8>,
        rng: &mut CombatRng,
    ) -> f32 {
        if !rng.chance(crit_chance) {
            return 0.0;
        }
        let (low, high) = match berserk_rank {
            Some(rank) => {
                let cap = f32::from(self.config.berserk_rank_cap.max(1));
                let reach = (f32::from(rank) / cap).clamp(0.0, 1.0);
                let span = self.config.berserk_max_fraction - self.config.berserk_min_fraction;
                (
                    self.config.berserk_min_fraction,
                    self.config.berserk_min_fraction + span * reach,
                )
            }
            None => {
                let high = if defender.is_player_class() {
                    self.config.crit_max_vs_player
                } else {
                    self.config.crit_max_vs_npc
                };
                (self.config.crit_min_fraction, high)
            }
        };
        base * rng.uniform(low, high)
    }

    /// Effective armor factor of a worn piece:
    /// `min(rating, level × cap) × quality × condition × multiplier`,
    /// plus buff armor factor capped by the level-derived ceiling.
    #[must_use]
    pub fn effective_armor_factor(
        &self,
        armor: Option<&ArmorDescriptor>,
        defender_level: u8,
        buff_armor_factor: f32,
    ) -> f32 {
        let level = f32::from(defender_level);
        let item = armor.map_or(0.0, |piece| {
            piece.rating.min(level * self.config.armor_rating_cap_per_level)
                * (piece.quality / 100.0)
                * (piece.condition / 100.0)
                * self.config.eaf_multiplier
        });
        let buff_cap = level * self.config.armor_buff_cap_per_level;
        item + buff_armor_factor.clamp(0.0, buff_cap)
    }

    /// Mitigation blend. Absorption applies multiplicatively, then the
    /// armor factor through diminishing returns:
    /// `raw × (1 − absorption) × (1 − eAF / (eAF + scaling))`.
    /// Strictly decreasing in both inputs, floored at zero.
    #[must_use]
    pub fn mitigate(&self, raw: f32, effective_armor: f32, absorption: f32) -> f32 {
        let absorption = absorption.clamp(0.0, 1.0);
        let eaf = effective_armor.max(0.0);
        let armor_factor = 1.0 - eaf / (eaf + self.config.eaf_scaling);
        (raw * (1.0 - absorption) * armor_factor).max(0.0)
    }

    /// Armor condition loss for one damaging hit, scaled inversely with
    /// the defender's level advantage, never negative.
    #[must_use]
    pub fn wear_amount(&self, attacker_level: u8, defender_level: u8) -> f32 {
        let advantage =
            (f32::from(defender_level) - f32::from(attacker_level)).max(0.0);
        self.config.wear_per_hit / (1.0 + advantage / 10.0)
    }

    /// Condition thresholds crossed when condition moves from `before`
    /// down to `after`. Condition only decreases, so each threshold fires
    /// at most once over a piece's lifetime.
    #[must_use]
    pub fn crossed_thresholds(&self, before: f32, after: f32) -> Vec<f32> {
        self.config
            .wear_thresholds
            .iter()
            .copied()
            .filter(|&threshold| before > threshold && after <= threshold)
            .collect()
    }

    /// Rolls the struck armor slot from the location weights.
    #[must_use]
    pub fn roll_struck_slot(&self, rng: &mut CombatRng) -> ArmorSlot {
        let weights: Vec<u32> = ArmorSlot::ALL.iter().map(|s| s.strike_weight()).collect();
        ArmorSlot::ALL[rng.weighted_index(&weights)]
    }

    /// Full damage resolution for a connecting hit. The caller rolls the
    /// struck slot first and passes that slot's worn armor.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn resolve(
        &self,
        weapon: &WeaponDescriptor,
        spec_level: u8,
        ammo: Option<AmmoDescriptor>,
        style_bonus: f32,
        crit_chance: f32,
        berserk_rank: Option<u8>,
        defender: CombatantKind,
        defender_level: u8,
        slot: ArmorSlot,
        armor: Option<&ArmorDescriptor>,
        buff_armor_factor: f32,
        buff_absorption: f32,
        rng: &mut CombatRng,
    ) -> DamageBreakdown {
        let base = self.base_damage(weapon, spec_level, ammo, style_bonus);
        let critical = self.critical_bonus(base, crit_chance, defender, berserk_rank, rng);
        let raw = base + critical;

        let effective_armor =
            self.effective_armor_factor(armor, defender_level, buff_armor_factor);
        let absorption =
            (armor.map_or(0.0, |piece| piece.absorption) + buff_absorption).clamp(0.0, 1.0);
        let final_damage = self.mitigate(raw, effective_armor, absorption);

        trace!(raw, critical, final_damage, "damage resolved");

        DamageBreakdown {
            base,
            critical,
            raw,
            effective_armor,
            absorption,
            final_damage,
            slot,
        }
    }
}
