//! # Ironveil Combat
//!
//! The combat resolution engine for Project Ironveil.
//!
//! This crate decides, for every attack one combatant makes against
//! another, whether it lands, how much damage it inflicts, and how that
//! outcome interacts with timing, interruption, and ranged charge state:
//! - Attribute aggregation across item and buff modifier layers
//! - Attack timing (quickness model, dual-wield, draw times)
//! - Hit resolution (avoidance, fumble, miss, styled hits)
//! - Damage resolution (criticals, armor factor, absorption, wear)
//! - Ranged draw/aim/fire/reload state machine
//! - Interrupt propagation
//! - Outbound event bus for presentation/loot/experience systems

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod attributes;
pub mod combatant;
pub mod config;
pub mod damage;
pub mod engine;
pub mod equipment;
pub mod error;
pub mod events;
pub mod hit;
pub mod interrupt;
pub mod ranged;
pub mod rng;
pub mod timing;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::attributes::*;
    pub use crate::combatant::*;
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::engine::*;
    pub use crate::equipment::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::hit::*;
    pub use crate::interrupt::*;
    pub use crate::ranged::*;
    pub use crate::rng::*;
    pub use crate::timing::*;
    pub use crate::world::*;
}

pub use prelude::*;
