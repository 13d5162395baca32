//! Attribute aggregation.
//!
//! Resolves a combatant's effective stats and derived combat ratings from
//! base values plus layered modifier providers (item bonuses first, then
//! buffs/debuffs). Aggregation is recomputed on demand and is
//! side-effect-free; callers never observe partial state.

use std::sync::Arc;

use ironveil_common::CombatantId;
use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, StatKind};

// ============================================================================
// Properties
// ============================================================================

/// A property the aggregator can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// A base attribute.
    Stat(StatKind),
    /// Melee/ranged attack speed bonus, in percent.
    AttackSpeedPercent,
    /// Armor factor contributed by buffs.
    ArmorFactor,
    /// Absorption contributed by buffs, as a fraction.
    Absorption,
    /// Chance to block, as a fraction.
    BlockChance,
    /// Chance to parry, as a fraction.
    ParryChance,
    /// Chance to evade, as a fraction.
    EvadeChance,
    /// Chance to land a critical hit, as a fraction.
    CriticalChance,
}

/// One additive-and-multiplicative modifier term.
///
/// The aggregate over a layer is `(value + Σ additive) × Π multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Flat term added before multipliers.
    pub additive: f32,
    /// Multiplicative term applied after all additive terms.
    pub multiplier: f32,
}

impl Modifier {
    /// A flat additive term.
    #[must_use]
    pub const fn flat(additive: f32) -> Self {
        Self {
            additive,
            multiplier: 1.0,
        }
    }

    /// A pure multiplier.
    #[must_use]
    pub const fn percent(multiplier: f32) -> Self {
        Self {
            additive: 0.0,
            multiplier,
        }
    }
}

/// Interface to the buff/effect (or item-bonus) system.
pub trait ModifierProvider: Send + Sync {
    /// Active modifier terms for a property of a combatant.
    fn modifiers(&self, owner: CombatantId, property: Property) -> Vec<Modifier>;
}

/// A provider with no active modifiers.
#[derive(Debug, Default)]
pub struct NoModifiers;

impl ModifierProvider for NoModifiers {
    fn modifiers(&self, _owner: CombatantId, _property: Property) -> Vec<Modifier> {
        Vec::new()
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Resolves effective stats and ratings across modifier layers.
///
/// Layer order is significant: earlier layers (item bonuses) are folded
/// before later layers (buffs/debuffs), each as
/// `(value + Σ additive) × Π multiplier`.
pub struct AttributeAggregator {
    layers: Vec<Arc<dyn ModifierProvider>>,
}

impl std::fmt::Debug for AttributeAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeAggregator")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl Default for AttributeAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeAggregator {
    /// Creates an aggregator with no modifier layers.
    #[must_use]
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Adds a modifier layer. Layers fold in insertion order.
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn ModifierProvider>) -> Self {
        self.layers.push(layer);
        self
    }

    fn fold(&self, owner: CombatantId, property: Property, base: f32) -> f32 {
        let mut value = base;
        for layer in &self.layers {
            let terms = layer.modifiers(owner, property);
            let additive: f32 = terms.iter().map(|t| t.additive).sum();
            let multiplier: f32 = terms.iter().map(|t| t.multiplier).product();
            value = (value + additive) * multiplier;
        }
        value
    }

    /// Effective value of a base attribute.
    #[must_use]
    pub fn effective_stat(&self, combatant: &dyn Combatant, stat: StatKind) -> f32 {
        self.fold(
            combatant.id(),
            Property::Stat(stat),
            combatant.base_stat(stat),
        )
    }

    /// Effective value of a derived rating. Non-stat properties start
    /// from zero and are built entirely from modifier terms.
    #[must_use]
    pub fn effective_rating(&self, combatant: &dyn Combatant, property: Property) -> f32 {
        let base = match property {
            Property::Stat(stat) => combatant.base_stat(stat),
            _ => 0.0,
        };
        self.fold(combatant.id(), property, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::NpcCombatant;

    struct FixedLayer(Vec<Modifier>);

    impl ModifierProvider for FixedLayer {
        fn modifiers(&self, _owner: CombatantId, property: Property) -> Vec<Modifier> {
            if property == Property::Stat(StatKind::Strength) {
                self.0.clone()
            } else {
                Vec::new()
            }
        }
    }

    fn npc() -> NpcCombatant {
        NpcCombatant::new("training dummy", 10).with_stat(StatKind::Strength, 60.0)
    }

    #[test]
    fn test_no_layers_returns_base() {
        let aggregator = AttributeAggregator::new();
        let npc = npc();
        assert!((aggregator.effective_stat(&npc, StatKind::Strength) - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_additive_before_multiplicative() {
        let aggregator = AttributeAggregator::new().with_layer(Arc::new(FixedLayer(vec![
            Modifier::flat(20.0),
            Modifier::percent(1.5),
        ])));
        let npc = npc();
        // (60 + 20) * 1.5
        assert!((aggregator.effective_stat(&npc, StatKind::Strength) - 120.0).abs() < 0.001);
    }

    #[test]
    fn test_layer_ordering() {
        let items = Arc::new(FixedLayer(vec![Modifier::flat(40.0)]));
        let buffs = Arc::new(FixedLayer(vec![Modifier::percent(2.0)]));
        let aggregator = AttributeAggregator::new().with_layer(items).with_layer(buffs);
        let npc = npc();
        // (60 + 40) folded first, then doubled.
        assert!((aggregator.effective_stat(&npc, StatKind::Strength) - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_rating_starts_from_zero() {
        let aggregator = AttributeAggregator::new();
        let npc = npc();
        assert!(aggregator
            .effective_rating(&npc, Property::CriticalChance)
            .abs()
            < f32::EPSILON);
    }

    #[test]
    fn test_aggregation_is_pure() {
        let aggregator = AttributeAggregator::new()
            .with_layer(Arc::new(FixedLayer(vec![Modifier::flat(5.0)])));
        let npc = npc();
        let first = aggregator.effective_stat(&npc, StatKind::Strength);
        let second = aggregator.effective_stat(&npc, StatKind::Strength);
        assert!((first - second).abs() < f32::EPSILON);
    }
}
