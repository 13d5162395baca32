//! Typed precondition failures.
//!
//! These are "attack not performed" results, not gameplay outcomes: they
//! never consume the attack cycle and leave engine state unchanged except
//! for the state machine reverting to a safe state.

use ironveil_common::CombatantId;
use thiserror::Error;

/// Why an attack or charge could not begin or proceed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttackDenied {
    /// The combatant is not in the engine arena.
    #[error("combatant not in arena: {0:?}")]
    NotInArena(CombatantId),
    /// No weapon equipped in the required slot.
    #[error("no weapon equipped")]
    NoWeapon,
    /// The weapon in the slot is not ranged.
    #[error("weapon is not ranged")]
    NotRanged,
    /// No target selected or target handle no longer resolves.
    #[error("no valid target")]
    NoTarget,
    /// No ammunition available.
    #[error("no ammunition")]
    NoAmmunition,
    /// Ammunition class does not match the weapon.
    #[error("ammunition incompatible with weapon")]
    IncompatibleAmmunition,
    /// Not enough endurance for the action.
    #[error("insufficient endurance: need {required}")]
    InsufficientEndurance {
        /// Endurance the action requires.
        required: f32,
    },
    /// A charge cycle is already in progress.
    #[error("charge already in progress")]
    AlreadyCharging,
    /// The charge is not ready to fire yet.
    #[error("still drawing")]
    StillDrawing,
    /// No charge cycle is in progress.
    #[error("no charge in progress")]
    NoCharge,
    /// The fire command is holding on a recoverable check failure.
    #[error("holding: {0}")]
    Holding(&'static str),
}

/// Result alias for attack preconditions.
pub type AttackAttempt<T> = Result<T, AttackDenied>;
