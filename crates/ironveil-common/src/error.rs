//! Error types for Project Ironveil.

use thiserror::Error;

use crate::ids::CombatantId;

/// Top-level error type for Ironveil operations.
#[derive(Debug, Error)]
pub enum IronveilError {
    /// A combatant referenced by ID is not present in the world.
    #[error("unknown combatant: {0:?}")]
    UnknownCombatant(CombatantId),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for Ironveil operations.
pub type IronveilResult<T> = Result<T, IronveilError>;
