//! ID types for Project Ironveil.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for combatant IDs.
static COMBATANT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a combatant in the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(u64);

impl CombatantId {
    /// Creates a new unique combatant ID.
    #[must_use]
    pub fn new() -> Self {
        Self(COMBATANT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a combatant ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid combatant ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) combatant ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an attack style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleId(u32);

impl StyleId {
    /// Creates a style ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}
