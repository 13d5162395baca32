//! Outbound event bus.
//!
//! The engine reports what happened; presentation, loot, and experience
//! systems subscribe and decide what to do with it. No formatting or
//! localization happens here.

use crossbeam_channel::{bounded, Receiver, Sender};
use ironveil_common::CombatantId;
use serde::{Deserialize, Serialize};

use crate::equipment::ArmorSlot;
use crate::hit::AttackResult;

/// Why a ranged charge was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeAbortReason {
    /// Held at full draw past the ceiling.
    TooTired,
    /// The reserved target left the world or died.
    TargetLost,
    /// Ammunition ran out.
    NoAmmunition,
    /// The attacker moved.
    Moved,
    /// The attacker took a qualifying hit.
    Interrupted,
    /// The weapon was switched or combat stopped.
    Cancelled,
}

/// Event types emitted by the combat engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An attack fully resolved against a defender.
    AttackResolved {
        /// Attacking combatant.
        attacker: CombatantId,
        /// Defending combatant.
        defender: CombatantId,
        /// Resolved outcome and damage breakdown.
        result: AttackResult,
    },
    /// A combatant's health reached zero.
    Defeated {
        /// The combatant that died.
        victim: CombatantId,
        /// The combatant credited with the kill.
        killer: CombatantId,
    },
    /// A worn armor slot crossed a condition threshold.
    ArmorConditionThreshold {
        /// Wearer.
        combatant: CombatantId,
        /// Armor slot.
        slot: ArmorSlot,
        /// Threshold percentage crossed.
        threshold: f32,
    },
    /// A ranged charge cycle was aborted.
    ChargeAborted {
        /// The charging combatant.
        combatant: CombatantId,
        /// Why the cycle ended.
        reason: ChargeAbortReason,
    },
}

/// Event bus for broadcasting combat events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: CombatEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<CombatEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish(CombatEvent::Defeated {
            victim: CombatantId::from_raw(1),
            killer: CombatantId::from_raw(2),
        });
        assert_eq!(bus.pending_count(), 1);
        let events = bus.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_instead_of_blocking() {
        let bus = EventBus::new(1);
        for _ in 0..3 {
            bus.publish(CombatEvent::ChargeAborted {
                combatant: CombatantId::from_raw(1),
                reason: ChargeAbortReason::Moved,
            });
        }
        assert_eq!(bus.pending_count(), 1);
    }
}
