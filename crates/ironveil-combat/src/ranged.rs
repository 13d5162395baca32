//! Ranged charge state machine.
//!
//! Governs the draw/aim/fire/reload lifecycle for projectile and thrown
//! weapons. The machine owns phase bookkeeping and reservation state; the
//! engine performs the world-facing checks and resource consumption and
//! tells the machine what happened. Every cancellation path lands back in
//! `Idle` — no phase is a trap.

use ironveil_common::CombatantId;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::equipment::{AmmoDescriptor, RangedClass};
use crate::error::AttackDenied;
use crate::events::ChargeAbortReason;

// ============================================================================
// Phases
// ============================================================================

/// Phase of a ranged charge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargePhase {
    /// No cycle in progress.
    Idle,
    /// Drawing toward the minimum draw time.
    Aiming,
    /// Draw complete, holding for the fire command.
    ReadyToFire,
    /// Fire command accepted; resolution in progress.
    Firing,
    /// Reloading before the next automatic cycle.
    Reloading,
}

impl ChargePhase {
    /// Whether an incoming hit or movement can cancel this phase.
    #[must_use]
    pub const fn interruptible(self) -> bool {
        matches!(self, Self::Aiming | Self::ReadyToFire)
    }
}

/// Shot variant being charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotKind {
    /// Standard shot.
    Normal,
    /// Critical shot: longer draw, larger endurance cost.
    Critical {
        /// Trained rank of the critical-shot ability.
        rank: u8,
    },
    /// Rapid shot: shorter draw, larger endurance cost.
    Rapid,
}

/// Observable transition produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeTick {
    /// Nothing changed.
    None,
    /// Draw completed; now holding.
    Ready,
    /// Reload finished; the engine may start the next cycle.
    ReloadComplete,
    /// The cycle aborted.
    Aborted(ChargeAbortReason),
}

// ============================================================================
// Charge state
// ============================================================================

/// Per-combatant ranged charge state.
///
/// Owned exclusively by the attacking combatant's engine entry; reset to
/// `Idle` whenever the weapon is switched or combat stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedCharge {
    phase: ChargePhase,
    weapon_class: RangedClass,
    shot: ShotKind,
    auto_repeat: bool,
    aim_started_ms: u64,
    ready_at_ms: u64,
    reload_until_ms: u64,
    reserved_ammo: Option<AmmoDescriptor>,
    target: Option<CombatantId>,
}

impl Default for RangedCharge {
    fn default() -> Self {
        Self {
            phase: ChargePhase::Idle,
            weapon_class: RangedClass::Bow,
            shot: ShotKind::Normal,
            auto_repeat: false,
            aim_started_ms: 0,
            ready_at_ms: 0,
            reload_until_ms: 0,
            reserved_ammo: None,
            target: None,
        }
    }
}

impl RangedCharge {
    /// Creates an idle charge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ChargePhase {
        self.phase
    }

    /// Reserved target, if a cycle is in progress.
    #[must_use]
    pub const fn target(&self) -> Option<CombatantId> {
        self.target
    }

    /// Reserved ammunition, if a cycle is in progress.
    #[must_use]
    pub const fn reserved_ammo(&self) -> Option<AmmoDescriptor> {
        self.reserved_ammo
    }

    /// Shot variant of the current cycle.
    #[must_use]
    pub const fn shot(&self) -> ShotKind {
        self.shot
    }

    /// Enters `Aiming`. Requires the machine to be idle, ammunition to be
    /// present, and the ammunition class to match the weapon.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_aim(
        &mut self,
        now_ms: u64,
        draw_ms: u64,
        weapon_class: RangedClass,
        ammo: Option<AmmoDescriptor>,
        target: CombatantId,
        shot: ShotKind,
        auto_repeat: bool,
    ) -> Result<(), AttackDenied> {
        if self.phase != ChargePhase::Idle {
            return Err(AttackDenied::AlreadyCharging);
        }
        let ammo = ammo.ok_or(AttackDenied::NoAmmunition)?;
        if ammo.class != weapon_class.ammo_class() {
            return Err(AttackDenied::IncompatibleAmmunition);
        }

        self.phase = ChargePhase::Aiming;
        self.weapon_class = weapon_class;
        self.shot = shot;
        self.auto_repeat = auto_repeat;
        self.aim_started_ms = now_ms;
        self.ready_at_ms = now_ms + draw_ms;
        self.reserved_ammo = Some(ammo);
        self.target = Some(target);
        trace!(?shot, draw_ms, "charge aiming");
        Ok(())
    }

    /// Advances timers. The hold ceiling counts from the start of the
    /// aim; crossbow-class weapons are exempt.
    pub fn tick(&mut self, now_ms: u64, hold_ceiling_ms: u64) -> ChargeTick {
        match self.phase {
            ChargePhase::Aiming | ChargePhase::ReadyToFire => {
                if !self.weapon_class.exempt_from_hold_ceiling()
                    && now_ms.saturating_sub(self.aim_started_ms) > hold_ceiling_ms
                {
                    self.reset();
                    return ChargeTick::Aborted(ChargeAbortReason::TooTired);
                }
                if self.phase == ChargePhase::Aiming && now_ms >= self.ready_at_ms {
                    self.phase = ChargePhase::ReadyToFire;
                    return ChargeTick::Ready;
                }
                ChargeTick::None
            }
            ChargePhase::Reloading => {
                if now_ms >= self.reload_until_ms {
                    self.phase = ChargePhase::Idle;
                    return ChargeTick::ReloadComplete;
                }
                ChargeTick::None
            }
            ChargePhase::Idle | ChargePhase::Firing => ChargeTick::None,
        }
    }

    /// Accepts the fire command: `ReadyToFire` moves to `Firing`. Callers
    /// run the fire-time validity checks first; a recoverable failure
    /// simply never calls this and the machine keeps holding.
    pub fn begin_firing(&mut self) -> Result<(), AttackDenied> {
        match self.phase {
            ChargePhase::ReadyToFire => {
                self.phase = ChargePhase::Firing;
                Ok(())
            }
            ChargePhase::Aiming => Err(AttackDenied::StillDrawing),
            _ => Err(AttackDenied::NoCharge),
        }
    }

    /// Completes the shot after resolution. Panics if the machine is not
    /// `Firing` or no ammunition was reserved — both mean the caller and
    /// machine have desynchronized.
    ///
    /// In auto-repeat mode the target stays reserved for the next cycle.
    pub fn complete_firing(&mut self, now_ms: u64, reload_ms: u64) -> ChargePhase {
        assert_eq!(self.phase, ChargePhase::Firing, "complete_firing outside Firing");
        assert!(
            self.reserved_ammo.is_some(),
            "fired with no reserved ammunition"
        );
        self.reserved_ammo = None;
        if self.auto_repeat {
            self.phase = ChargePhase::Reloading;
            self.reload_until_ms = now_ms + reload_ms;
        } else {
            self.reset();
        }
        self.phase
    }

    /// Cancels the cycle from any phase back to `Idle`.
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Aborts a firing attempt whose unrecoverable check failed
    /// (ammunition gone, target lost): straight to `Idle`.
    pub fn abort(&mut self, reason: ChargeAbortReason) -> ChargeAbortReason {
        trace!(?reason, "charge aborted");
        self.reset();
        reason
    }

    /// Reverts an accepted fire command whose recoverable check failed:
    /// back to holding.
    pub fn revert_to_hold(&mut self) {
        if self.phase == ChargePhase::Firing {
            self.phase = ChargePhase::ReadyToFire;
        }
    }

    fn reset(&mut self) {
        self.phase = ChargePhase::Idle;
        self.reserved_ammo = None;
        self.target = None;
        self.aim_started_ms = 0;
        self.ready_at_ms = 0;
        self.reload_until_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::AmmoClass;

    const DRAW_MS: u64 = 2000;
    const CEILING_MS: u64 = 15_000;

    fn target() -> CombatantId {
        CombatantId::from_raw(7)
    }

    fn arrow() -> Option<AmmoDescriptor> {
        Some(AmmoDescriptor::standard(AmmoClass::Arrow))
    }

    fn aiming_bow() -> RangedCharge {
        let mut charge = RangedCharge::new();
        charge
            .begin_aim(0, DRAW_MS, RangedClass::Bow, arrow(), target(), ShotKind::Normal, false)
            .expect("aim");
        charge
    }

    #[test]
    fn test_begin_aim_requires_ammo() {
        let mut charge = RangedCharge::new();
        let denied = charge
            .begin_aim(0, DRAW_MS, RangedClass::Bow, None, target(), ShotKind::Normal, false)
            .unwrap_err();
        assert_eq!(denied, AttackDenied::NoAmmunition);
        assert_eq!(charge.phase(), ChargePhase::Idle);
    }

    #[test]
    fn test_begin_aim_checks_compatibility() {
        let mut charge = RangedCharge::new();
        let bolts = Some(AmmoDescriptor::standard(AmmoClass::Bolt));
        let denied = charge
            .begin_aim(0, DRAW_MS, RangedClass::Bow, bolts, target(), ShotKind::Normal, false)
            .unwrap_err();
        assert_eq!(denied, AttackDenied::IncompatibleAmmunition);
        assert_eq!(charge.phase(), ChargePhase::Idle);

        // Bolts do fit a crossbow.
        assert!(charge
            .begin_aim(
                0,
                DRAW_MS,
                RangedClass::Crossbow,
                Some(AmmoDescriptor::standard(AmmoClass::Bolt)),
                target(),
                ShotKind::Normal,
                false,
            )
            .is_ok());
    }

    #[test]
    fn test_double_aim_denied() {
        let mut charge = aiming_bow();
        let denied = charge
            .begin_aim(10, DRAW_MS, RangedClass::Bow, arrow(), target(), ShotKind::Normal, false)
            .unwrap_err();
        assert_eq!(denied, AttackDenied::AlreadyCharging);
    }

    #[test]
    fn test_draw_completes_automatically() {
        let mut charge = aiming_bow();
        assert_eq!(charge.tick(DRAW_MS - 1, CEILING_MS), ChargeTick::None);
        assert_eq!(charge.phase(), ChargePhase::Aiming);
        assert_eq!(charge.tick(DRAW_MS, CEILING_MS), ChargeTick::Ready);
        assert_eq!(charge.phase(), ChargePhase::ReadyToFire);
    }

    #[test]
    fn test_fire_before_ready_is_still_drawing() {
        let mut charge = aiming_bow();
        assert_eq!(charge.begin_firing().unwrap_err(), AttackDenied::StillDrawing);
    }

    #[test]
    fn test_hold_ceiling_aborts() {
        let mut charge = aiming_bow();
        charge.tick(DRAW_MS, CEILING_MS);
        let tick = charge.tick(CEILING_MS + 1, CEILING_MS);
        assert_eq!(tick, ChargeTick::Aborted(ChargeAbortReason::TooTired));
        assert_eq!(charge.phase(), ChargePhase::Idle);
        assert_eq!(charge.reserved_ammo(), None);
    }

    #[test]
    fn test_crossbow_exempt_from_ceiling() {
        let mut charge = RangedCharge::new();
        charge
            .begin_aim(
                0,
                DRAW_MS,
                RangedClass::Crossbow,
                Some(AmmoDescriptor::standard(AmmoClass::Bolt)),
                target(),
                ShotKind::Normal,
                false,
            )
            .expect("aim");
        charge.tick(DRAW_MS, CEILING_MS);
        assert_eq!(charge.tick(CEILING_MS * 10, CEILING_MS), ChargeTick::None);
        assert_eq!(charge.phase(), ChargePhase::ReadyToFire);
    }

    #[test]
    fn test_fire_and_single_shot_returns_to_idle() {
        let mut charge = aiming_bow();
        charge.tick(DRAW_MS, CEILING_MS);
        charge.begin_firing().expect("fire");
        assert_eq!(charge.phase(), ChargePhase::Firing);
        let phase = charge.complete_firing(DRAW_MS + 10, 1000);
        assert_eq!(phase, ChargePhase::Idle);
        assert_eq!(charge.reserved_ammo(), None);
        assert_eq!(charge.target(), None);
    }

    #[test]
    fn test_auto_repeat_reloads_then_idles() {
        let mut charge = RangedCharge::new();
        charge
            .begin_aim(0, DRAW_MS, RangedClass::Bow, arrow(), target(), ShotKind::Normal, true)
            .expect("aim");
        charge.tick(DRAW_MS, CEILING_MS);
        charge.begin_firing().expect("fire");
        assert_eq!(charge.complete_firing(DRAW_MS, 1000), ChargePhase::Reloading);
        assert_eq!(charge.tick(DRAW_MS + 999, CEILING_MS), ChargeTick::None);
        assert_eq!(charge.tick(DRAW_MS + 1000, CEILING_MS), ChargeTick::ReloadComplete);
        assert_eq!(charge.phase(), ChargePhase::Idle);
    }

    #[test]
    fn test_revert_to_hold() {
        let mut charge = aiming_bow();
        charge.tick(DRAW_MS, CEILING_MS);
        charge.begin_firing().expect("fire");
        charge.revert_to_hold();
        assert_eq!(charge.phase(), ChargePhase::ReadyToFire);
        // The reservation survives a hold.
        assert!(charge.reserved_ammo().is_some());
    }

    #[test]
    fn test_abort_clears_everything() {
        let mut charge = aiming_bow();
        charge.tick(DRAW_MS, CEILING_MS);
        charge.begin_firing().expect("fire");
        charge.abort(ChargeAbortReason::NoAmmunition);
        assert_eq!(charge.phase(), ChargePhase::Idle);
        assert_eq!(charge.reserved_ammo(), None);
    }

    #[test]
    fn test_cancel_from_every_phase_reaches_idle() {
        // Aiming.
        let mut charge = aiming_bow();
        charge.cancel();
        assert_eq!(charge.phase(), ChargePhase::Idle);

        // ReadyToFire.
        let mut charge = aiming_bow();
        charge.tick(DRAW_MS, CEILING_MS);
        charge.cancel();
        assert_eq!(charge.phase(), ChargePhase::Idle);

        // Firing.
        let mut charge = aiming_bow();
        charge.tick(DRAW_MS, CEILING_MS);
        charge.begin_firing().expect("fire");
        charge.cancel();
        assert_eq!(charge.phase(), ChargePhase::Idle);

        // Reloading.
        let mut charge = RangedCharge::new();
        charge
            .begin_aim(0, DRAW_MS, RangedClass::Bow, arrow(), target(), ShotKind::Normal, true)
            .expect("aim");
        charge.tick(DRAW_MS, CEILING_MS);
        charge.begin_firing().expect("fire");
        charge.complete_firing(DRAW_MS, 1000);
        charge.cancel();
        assert_eq!(charge.phase(), ChargePhase::Idle);
    }

    #[test]
    #[should_panic(expected = "complete_firing outside Firing")]
    fn test_complete_without_firing_panics() {
        let mut charge = RangedCharge::new();
        charge.complete_firing(0, 0);
    }

    #[test]
    fn test_interruptible_phases() {
        assert!(ChargePhase::Aiming.interruptible());
        assert!(ChargePhase::ReadyToFire.interruptible());
        assert!(!ChargePhase::Idle.interruptible());
        assert!(!ChargePhase::Firing.interruptible());
        assert!(!ChargePhase::Reloading.interruptible());
    }
}
