//! Engine configuration.
//!
//! Every tunable constant of the combat model lives here as injected,
//! read-only configuration. Nothing in the engine reads a process-wide
//! table; callers construct (or load from RON) a [`CombatConfig`] and hand
//! it to the engine once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// File contents were not valid RON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

// ============================================================================
// Timing
// ============================================================================

/// Attack interval and draw-time tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Quickness value below which no speed bonus applies.
    pub quickness_pivot: f32,
    /// Interval reduction per point of quickness above the pivot.
    pub quickness_scale: f32,
    /// Upper clamp on effective quickness.
    pub quickness_cap: f32,
    /// Minimum interval between swings, in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            quickness_pivot: 60.0,
            quickness_scale: 0.002,
            quickness_cap: 250.0,
            min_interval_ms: 1500,
        }
    }
}

// ============================================================================
// Hit resolution
// ============================================================================

/// Hit/miss/avoidance tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitConfig {
    /// Base chance for an attack to miss an equal-level defender.
    pub base_miss_chance: f32,
    /// Additional miss chance per level of defender advantage.
    pub miss_per_level: f32,
    /// Lower clamp on miss chance.
    pub min_miss_chance: f32,
    /// Upper clamp on miss chance.
    pub max_miss_chance: f32,
    /// Flat chance for the attacker to fumble.
    pub fumble_chance: f32,
    /// Off-hand swing chance at zero dual-wield specialization.
    pub offhand_base_chance: f32,
    /// Off-hand swing chance gained per point of dual-wield specialization.
    pub offhand_per_spec: f32,
    /// Upper clamp on off-hand swing chance.
    pub offhand_max_chance: f32,
}

impl Default for HitConfig {
    fn default() -> Self {
        Self {
            base_miss_chance: 0.18,
            miss_per_level: 0.04,
            min_miss_chance: 0.02,
            max_miss_chance: 0.50,
            fumble_chance: 0.02,
            offhand_base_chance: 0.25,
            offhand_per_spec: 0.0068,
            offhand_max_chance: 0.90,
        }
    }
}

// ============================================================================
// Damage
// ============================================================================

/// Damage and mitigation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageConfig {
    /// Multiplier applied to `rating × speed` when computing base damage.
    pub base_damage_scale: f32,
    /// Flat bonus multiplier for two-handed weapons.
    pub two_hand_bonus: f32,
    /// Additional two-handed bonus per specialization level above 1.
    pub two_hand_per_spec: f32,
    /// Damage multiplier for light ammunition.
    pub ammo_light_multiplier: f32,
    /// Damage multiplier for heavy ammunition.
    pub ammo_heavy_multiplier: f32,
    /// Lower bound of the critical bonus range, as a fraction of base.
    pub crit_min_fraction: f32,
    /// Upper bound of the critical bonus vs player-class defenders.
    pub crit_max_vs_player: f32,
    /// Upper bound of the critical bonus vs non-player defenders.
    pub crit_max_vs_npc: f32,
    /// Lower bound of the critical bonus while berserk is active.
    pub berserk_min_fraction: f32,
    /// Upper bound of the critical bonus while berserk is active.
    pub berserk_max_fraction: f32,
    /// Berserk rank at which the widened bounds reach full width.
    pub berserk_rank_cap: u8,
    /// Armor rating cap per defender level.
    pub armor_rating_cap_per_level: f32,
    /// Buff armor-factor ceiling per defender level.
    pub armor_buff_cap_per_level: f32,
    /// Effective armor factor multiplier.
    pub eaf_multiplier: f32,
    /// Scaling constant in the eAF diminishing-returns blend.
    pub eaf_scaling: f32,
    /// Base armor condition loss per damaging hit.
    pub wear_per_hit: f32,
    /// Condition percentages that fire a one-time notification.
    pub wear_thresholds: Vec<f32>,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            base_damage_scale: 0.1,
            two_hand_bonus: 0.10,
            two_hand_per_spec: 0.005,
            ammo_light_multiplier: 0.85,
            ammo_heavy_multiplier: 1.25,
            crit_min_fraction: 0.10,
            crit_max_vs_player: 0.50,
            crit_max_vs_npc: 1.00,
            berserk_min_fraction: 0.01,
            berserk_max_fraction: 0.99,
            berserk_rank_cap: 5,
            armor_rating_cap_per_level: 2.0,
            armor_buff_cap_per_level: 1.875,
            eaf_multiplier: 4.67,
            eaf_scaling: 100.0,
            wear_per_hit: 0.07,
            wear_thresholds: vec![90.0, 80.0, 70.0],
        }
    }
}

// ============================================================================
// Ranged
// ============================================================================

/// Ranged charge cycle tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedConfig {
    /// Maximum hold time after the draw completes, in milliseconds.
    pub hold_ceiling_ms: u64,
    /// Facing cone required at fire time, in degrees.
    pub facing_cone_degrees: f32,
    /// Endurance cost of a normal shot.
    pub fire_endurance_cost: f32,
    /// Endurance cost of a critical shot.
    pub critical_endurance_cost: f32,
    /// Endurance cost of a rapid shot.
    pub rapid_endurance_cost: f32,
    /// Draw-time multiplier for rapid shots.
    pub rapid_draw_multiplier: f32,
}

impl Default for RangedConfig {
    fn default() -> Self {
        Self {
            hold_ceiling_ms: 15_000,
            facing_cone_degrees: 90.0,
            fire_endurance_cost: 5.0,
            critical_endurance_cost: 10.0,
            rapid_endurance_cost: 7.5,
            rapid_draw_multiplier: 0.5,
        }
    }
}

// ============================================================================
// Interrupts
// ============================================================================

/// Interrupt propagation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptConfig {
    /// Flat chance that a qualifying hit interrupts a cast.
    pub cast_interrupt_chance: f32,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            cast_interrupt_chance: 0.65,
        }
    }
}

// ============================================================================
// Endurance
// ============================================================================

/// Endurance regeneration tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnduranceConfig {
    /// Endurance regained per second while not holding a draw.
    pub regen_per_second: f32,
}

impl Default for EnduranceConfig {
    fn default() -> Self {
        Self {
            regen_per_second: 2.0,
        }
    }
}

// ============================================================================
// Aggregate
// ============================================================================

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Attack timing tunables.
    pub timing: TimingConfig,
    /// Hit resolution tunables.
    pub hit: HitConfig,
    /// Damage resolution tunables.
    pub damage: DamageConfig,
    /// Ranged cycle tunables.
    pub ranged: RangedConfig,
    /// Interrupt tunables.
    pub interrupt: InterruptConfig,
    /// Endurance tunables.
    pub endurance: EnduranceConfig,
}

impl CombatConfig {
    /// Loads configuration from a RON string.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Loads configuration from a RON file on disk.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_model_constants() {
        let config = CombatConfig::default();
        assert_eq!(config.timing.min_interval_ms, 1500);
        assert!((config.timing.quickness_scale - 0.002).abs() < f32::EPSILON);
        assert!((config.damage.eaf_multiplier - 4.67).abs() < f32::EPSILON);
        assert_eq!(config.ranged.hold_ceiling_ms, 15_000);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = CombatConfig::default();
        let text = ron::to_string(&config).expect("serialize");
        let parsed = CombatConfig::from_ron(&text).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_bad_ron_is_an_error() {
        assert!(CombatConfig::from_ron("not ron at all {{{").is_err());
    }
}
