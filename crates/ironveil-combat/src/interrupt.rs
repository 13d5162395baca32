//! Interrupt coordination.
//!
//! Reacts to incoming hits and to movement, deciding whether an
//! in-progress ranged charge or cast is cancelled. Ranged interrupts are
//! unconditional on a qualifying hit; cast interruption is a flat
//! configured probability, independent of damage amount, evaluated once
//! per qualifying hit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InterruptConfig;
use crate::hit::AttackOutcome;
use crate::ranged::ChargePhase;
use crate::rng::CombatRng;

/// What an interrupt check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptDecision {
    /// Cancel the defender's ranged charge.
    pub cancel_charge: bool,
    /// Interrupt the defender's cast.
    pub interrupt_cast: bool,
}

impl InterruptDecision {
    /// A decision that changes nothing.
    pub const NONE: Self = Self {
        cancel_charge: false,
        interrupt_cast: false,
    };
}

/// Decides interruption in response to hits and movement.
#[derive(Debug, Clone, Default)]
pub struct InterruptCoordinator {
    /// Interrupt tunables.
    pub config: InterruptConfig,
}

impl InterruptCoordinator {
    /// Creates a coordinator with default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a coordinator with explicit tunables.
    #[must_use]
    pub fn with_config(config: InterruptConfig) -> Self {
        Self { config }
    }

    /// Reaction to an incoming resolved attack against `defender`.
    ///
    /// A qualifying hit unconditionally cancels a charge in an
    /// interruptible phase; the cast check rolls the flat probability
    /// once, regardless of damage dealt.
    #[must_use]
    pub fn on_incoming_hit(
        &self,
        outcome: AttackOutcome,
        charge_phase: ChargePhase,
        casting: bool,
        rng: &mut CombatRng,
    ) -> InterruptDecision {
        if !outcome.interrupts_defender() {
            return InterruptDecision::NONE;
        }
        let cancel_charge = charge_phase.interruptible();
        let interrupt_cast = casting && rng.chance(self.config.cast_interrupt_chance);
        if cancel_charge || interrupt_cast {
            debug!(cancel_charge, interrupt_cast, "incoming hit interrupts");
        }
        InterruptDecision {
            cancel_charge,
            interrupt_cast,
        }
    }

    /// Reaction to the combatant itself moving (or sitting). Movement
    /// always breaks an interruptible charge and any cast.
    #[must_use]
    pub fn on_mover_moved(&self, charge_phase: ChargePhase, casting: bool) -> InterruptDecision {
        InterruptDecision {
            cancel_charge: charge_phase.interruptible(),
            interrupt_cast: casting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> InterruptCoordinator {
        InterruptCoordinator::new()
    }

    #[test]
    fn test_qualifying_hit_cancels_interruptible_charge() {
        let mut rng = CombatRng::with_seed(1);
        let decision = coordinator().on_incoming_hit(
            AttackOutcome::Hit { styled: false },
            ChargePhase::Aiming,
            false,
            &mut rng,
        );
        assert!(decision.cancel_charge);
        assert!(!decision.interrupt_cast);
    }

    #[test]
    fn test_miss_does_not_interrupt() {
        let mut rng = CombatRng::with_seed(1);
        let decision = coordinator().on_incoming_hit(
            AttackOutcome::Missed,
            ChargePhase::ReadyToFire,
            true,
            &mut rng,
        );
        assert_eq!(decision, InterruptDecision::NONE);
    }

    #[test]
    fn test_evade_does_not_interrupt() {
        let mut rng = CombatRng::with_seed(1);
        let decision = coordinator().on_incoming_hit(
            AttackOutcome::Evaded,
            ChargePhase::Aiming,
            true,
            &mut rng,
        );
        assert_eq!(decision, InterruptDecision::NONE);
    }

    #[test]
    fn test_non_interruptible_phase_survives() {
        let mut rng = CombatRng::with_seed(1);
        let decision = coordinator().on_incoming_hit(
            AttackOutcome::Hit { styled: false },
            ChargePhase::Reloading,
            false,
            &mut rng,
        );
        assert!(!decision.cancel_charge);
    }

    #[test]
    fn test_cast_interrupt_is_probabilistic() {
        let coordinator = InterruptCoordinator::with_config(InterruptConfig {
            cast_interrupt_chance: 0.5,
        });
        let mut interrupted = 0;
        for seed in 0..400 {
            let mut rng = CombatRng::with_seed(seed);
            let decision = coordinator.on_incoming_hit(
                AttackOutcome::Hit { styled: false },
                ChargePhase::Idle,
                true,
                &mut rng,
            );
            if decision.interrupt_cast {
                interrupted += 1;
            }
        }
        // A flat coin, not certain and not impossible.
        assert!(interrupted > 100);
        assert!(interrupted < 300);
    }

    #[test]
    fn test_movement_breaks_charge_and_cast() {
        let decision = coordinator().on_mover_moved(ChargePhase::ReadyToFire, true);
        assert!(decision.cancel_charge);
        assert!(decision.interrupt_cast);

        let idle = coordinator().on_mover_moved(ChargePhase::Idle, false);
        assert_eq!(idle, InterruptDecision::NONE);
    }
}
