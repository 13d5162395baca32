//! Combat engine orchestration.
//!
//! Owns the combatant arena and the per-combatant attack machinery:
//! schedules, ranged charges, interrupt flags. Each combatant's cycle is
//! logically single-threaded — the engine never runs two resolutions for
//! the same attacker concurrently — while attacks across combatants are
//! independent. Removing a combatant cancels its timers before the entry
//! is dropped, so no resolution can run against something that has left
//! the world.

use std::sync::Arc;

use dashmap::DashMap;
use ironveil_common::CombatantId;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::attributes::{AttributeAggregator, Property};
use crate::combatant::{Combatant, SpecLine, StatKind};
use crate::config::CombatConfig;
use crate::damage::DamageResolver;
use crate::equipment::{
    AmmoDescriptor, EquipmentProvider, Handedness, RangedClass, WeaponDescriptor, WeaponSlot,
};
use crate::error::{AttackAttempt, AttackDenied};
use crate::events::{ChargeAbortReason, CombatEvent, EventBus};
use crate::hit::{
    self, AttackEvent, AttackOutcome, AttackResult, AttackStyle, HitInputs, TargetState,
};
use crate::interrupt::InterruptCoordinator;
use crate::ranged::{ChargePhase, ChargeTick, RangedCharge, ShotKind};
use crate::rng::CombatRng;
use crate::timing::{self, AttackSchedule};
use crate::world::WorldQuery;

// ============================================================================
// Per-combatant entry
// ============================================================================

/// Attack machinery owned by the engine for one combatant.
#[derive(Debug, Default)]
struct CombatantEntry {
    schedule: AttackSchedule,
    charge: RangedCharge,
    casting: bool,
    berserk_rank: Option<u8>,
    queued_style: Option<AttackStyle>,
    /// Outcome of the most recent attack made against this combatant,
    /// feeding style openings.
    last_incoming: Option<AttackOutcome>,
    last_regen_ms: u64,
}

// ============================================================================
// Engine
// ============================================================================

/// The combat resolution engine.
pub struct CombatEngine {
    combatants: DashMap<CombatantId, Arc<dyn Combatant>>,
    entries: DashMap<CombatantId, CombatantEntry>,
    equipment: Arc<dyn EquipmentProvider>,
    world: Arc<dyn WorldQuery>,
    attributes: AttributeAggregator,
    damage: DamageResolver,
    interrupts: InterruptCoordinator,
    events: EventBus,
    rng: Mutex<CombatRng>,
    config: CombatConfig,
}

impl std::fmt::Debug for CombatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatEngine")
            .field("combatants", &self.combatants.len())
            .finish()
    }
}

impl CombatEngine {
    /// Creates an engine over the external seams.
    #[must_use]
    pub fn new(
        equipment: Arc<dyn EquipmentProvider>,
        world: Arc<dyn WorldQuery>,
        attributes: AttributeAggregator,
        config: CombatConfig,
        seed: u64,
    ) -> Self {
        Self {
            combatants: DashMap::new(),
            entries: DashMap::new(),
            equipment,
            world,
            attributes,
            damage: DamageResolver::with_config(config.damage.clone()),
            interrupts: InterruptCoordinator::with_config(config.interrupt.clone()),
            events: EventBus::default(),
            rng: Mutex::new(CombatRng::with_seed(seed)),
            config,
        }
    }

    /// Outbound event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    /// Adds a combatant to the arena.
    pub fn add_combatant(&self, combatant: Arc<dyn Combatant>) {
        let id = combatant.id();
        self.entries.insert(id, CombatantEntry::default());
        self.combatants.insert(id, combatant);
        debug!(?id, "combatant entered arena");
    }

    /// Removes a combatant, cancelling its timers first. No resolution
    /// runs for it afterwards.
    pub fn remove_combatant(&self, id: CombatantId) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.schedule.stop();
            entry.charge.cancel();
        }
        self.entries.remove(&id);
        if let Some((_, combatant)) = self.combatants.remove(&id) {
            combatant.set_in_combat(false);
            debug!(?id, "combatant left arena");
        }
    }

    /// Resolves a target handle. `None` once the combatant has left the
    /// world.
    #[must_use]
    pub fn resolve(&self, id: CombatantId) -> Option<Arc<dyn Combatant>> {
        self.combatants.get(&id).map(|c| Arc::clone(&c))
    }

    /// Whether a combatant's melee cycle is running.
    #[must_use]
    pub fn is_attacking(&self, id: CombatantId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|entry| entry.schedule.is_active())
    }

    /// Current ranged charge phase.
    #[must_use]
    pub fn charge_phase(&self, id: CombatantId) -> Option<ChargePhase> {
        self.entries.get(&id).map(|entry| entry.charge.phase())
    }

    /// Flags a combatant as casting; the external casting system opts in
    /// to the flat interrupt check with this.
    pub fn set_casting(&self, id: CombatantId, casting: bool) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.casting = casting;
        }
    }

    /// Whether the combatant is flagged as casting.
    #[must_use]
    pub fn is_casting(&self, id: CombatantId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.casting)
    }

    /// Sets or clears the berserk modifier rank.
    pub fn set_berserk(&self, id: CombatantId, rank: Option<u8>) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.berserk_rank = rank;
        }
    }

    /// Queues a style for the next swing.
    pub fn queue_style(&self, id: CombatantId, style: AttackStyle) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.queued_style = Some(style);
        }
    }

    // ------------------------------------------------------------------
    // Melee cycle
    // ------------------------------------------------------------------

    /// Starts the repeating melee cycle against a target. Cancels any
    /// pending swing and recomputes the interval from zero.
    pub fn start_attacks(
        &self,
        id: CombatantId,
        target: CombatantId,
        now_ms: u64,
    ) -> AttackAttempt<()> {
        let combatant = self.resolve(id).ok_or(AttackDenied::NotInArena(id))?;
        let main = self
            .equipment
            .weapon(id, WeaponSlot::MainHand)
            .ok_or(AttackDenied::NoWeapon)?;

        let interval = self.melee_interval_ms(&combatant, &main);
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(AttackDenied::NotInArena(id))?;
        entry.schedule.start(now_ms, interval);
        drop(entry);

        combatant.set_target(Some(target));
        combatant.set_in_combat(true);
        debug!(?id, ?target, interval, "melee cycle started");
        Ok(())
    }

    /// Stops all attacking: cancels the melee cycle and any ranged
    /// charge.
    pub fn stop_attacks(&self, id: CombatantId) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.schedule.stop();
            if entry.charge.phase() != ChargePhase::Idle {
                entry.charge.cancel();
                self.events.publish(CombatEvent::ChargeAborted {
                    combatant: id,
                    reason: ChargeAbortReason::Cancelled,
                });
            }
        }
        if let Some(combatant) = self.resolve(id) {
            combatant.set_in_combat(false);
            combatant.set_target(None);
        }
    }

    /// Reacts to a weapon switch: cancels the pending swing and ranged
    /// charge and, if the cycle was running, recomputes from zero.
    pub fn switch_weapon(&self, id: CombatantId, now_ms: u64) {
        let Some(combatant) = self.resolve(id) else {
            return;
        };
        let was_active = self
            .entries
            .get(&id)
            .is_some_and(|entry| entry.schedule.is_active());

        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.schedule.stop();
            if entry.charge.phase() != ChargePhase::Idle {
                entry.charge.cancel();
                self.events.publish(CombatEvent::ChargeAborted {
                    combatant: id,
                    reason: ChargeAbortReason::Cancelled,
                });
            }
        }

        if was_active {
            if let Some(main) = self.equipment.weapon(id, WeaponSlot::MainHand) {
                let interval = self.melee_interval_ms(&combatant, &main);
                if let Some(mut entry) = self.entries.get_mut(&id) {
                    entry.schedule.start(now_ms, interval);
                }
            }
        }
    }

    fn melee_interval_ms(&self, combatant: &Arc<dyn Combatant>, main: &WeaponDescriptor) -> u64 {
        let quickness = self.attributes.effective_stat(combatant.as_ref(), StatKind::Quickness);
        let bonus = self
            .attributes
            .effective_rating(combatant.as_ref(), Property::AttackSpeedPercent);
        let off = self.equipment.weapon(combatant.id(), WeaponSlot::OffHand);
        match off {
            Some(off) => timing::dual_interval_ms(
                &[main.speed, off.speed],
                quickness,
                bonus,
                &self.config.timing,
            ),
            None => timing::effective_interval_ms(main.speed, quickness, bonus, &self.config.timing),
        }
    }

    // ------------------------------------------------------------------
    // Ranged cycle
    // ------------------------------------------------------------------

    /// Begins a ranged charge: the combatant readies the weapon and
    /// starts drawing. Precondition failures leave everything unchanged.
    pub fn begin_ranged(
        &self,
        id: CombatantId,
        target: CombatantId,
        shot: ShotKind,
        auto_repeat: bool,
        now_ms: u64,
    ) -> AttackAttempt<()> {
        let combatant = self.resolve(id).ok_or(AttackDenied::NotInArena(id))?;
        let weapon = self
            .equipment
            .weapon(id, WeaponSlot::Ranged)
            .ok_or(AttackDenied::NoWeapon)?;
        let class = weapon.ranged.ok_or(AttackDenied::NotRanged)?;
        let ammo = self.equipment.ammunition(id);

        let draw_ms = self.draw_time_ms(&combatant, &weapon, shot);
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(AttackDenied::NotInArena(id))?;
        entry
            .charge
            .begin_aim(now_ms, draw_ms, class, ammo, target, shot, auto_repeat)?;
        drop(entry);

        combatant.set_target(Some(target));
        combatant.set_in_combat(true);
        debug!(?id, ?target, draw_ms, "ranged charge started");
        Ok(())
    }

    fn draw_time_ms(
        &self,
        combatant: &Arc<dyn Combatant>,
        weapon: &WeaponDescriptor,
        shot: ShotKind,
    ) -> u64 {
        let speed = match shot {
            ShotKind::Normal => weapon.speed,
            ShotKind::Critical { rank } => timing::critical_shot_speed(weapon.speed, rank),
            ShotKind::Rapid => weapon.speed * self.config.ranged.rapid_draw_multiplier,
        };
        let quickness = self.attributes.effective_stat(combatant.as_ref(), StatKind::Quickness);
        let bonus = self
            .attributes
            .effective_rating(combatant.as_ref(), Property::AttackSpeedPercent);
        timing::effective_interval_ms(speed, quickness, bonus, &self.config.timing)
    }

    /// Explicit fire command. Runs the fire-time validity checks; a
    /// recoverable failure holds at `ReadyToFire`, a lost target or empty
    /// quiver aborts to `Idle`. On success the shot resolves exactly
    /// once, consuming one ammunition unit and the shot's endurance cost.
    pub fn command_fire(&self, id: CombatantId, now_ms: u64) -> AttackAttempt<AttackResult> {
        let combatant = self.resolve(id).ok_or(AttackDenied::NotInArena(id))?;
        let weapon = self
            .equipment
            .weapon(id, WeaponSlot::Ranged)
            .ok_or(AttackDenied::NoWeapon)?;

        // Advance the draw before judging readiness, so a fire command
        // issued after the minimum draw time succeeds without a tick.
        let (target_id, shot) = {
            let mut entry = self
                .entries
                .get_mut(&id)
                .ok_or(AttackDenied::NotInArena(id))?;
            let tick = entry.charge.tick(now_ms, self.config.ranged.hold_ceiling_ms);
            if let ChargeTick::Aborted(reason) = tick {
                self.events
                    .publish(CombatEvent::ChargeAborted { combatant: id, reason });
                return Err(AttackDenied::NoCharge);
            }
            match entry.charge.phase() {
                ChargePhase::Aiming => return Err(AttackDenied::StillDrawing),
                ChargePhase::ReadyToFire => {}
                _ => return Err(AttackDenied::NoCharge),
            }
            let target = entry.charge.target().ok_or(AttackDenied::NoTarget)?;
            (target, entry.charge.shot())
        };

        // Unrecoverable checks: target and ammunition abort to Idle.
        if self.resolve(target_id).is_none() {
            self.abort_charge(id, ChargeAbortReason::TargetLost);
            return Err(AttackDenied::NoTarget);
        }
        if self.equipment.ammunition(id).is_none() {
            self.abort_charge(id, ChargeAbortReason::NoAmmunition);
            return Err(AttackDenied::NoAmmunition);
        }

        // Recoverable checks hold at ReadyToFire.
        if !self.world.is_in_range(id, target_id, weapon.range) {
            return Err(AttackDenied::Holding("out of range"));
        }
        if !self.world.has_line_of_sight(id, target_id) {
            return Err(AttackDenied::Holding("no line of sight"));
        }
        if !self
            .world
            .is_facing(id, target_id, self.config.ranged.facing_cone_degrees)
        {
            return Err(AttackDenied::Holding("not facing target"));
        }
        let endurance_cost = match shot {
            ShotKind::Normal => self.config.ranged.fire_endurance_cost,
            ShotKind::Critical { .. } => self.config.ranged.critical_endurance_cost,
            ShotKind::Rapid => self.config.ranged.rapid_endurance_cost,
        };
        if !combatant.endurance().has(endurance_cost) {
            return Err(AttackDenied::InsufficientEndurance {
                required: endurance_cost,
            });
        }

        // Commit: Firing. Consumption happens exactly once, before the
        // roll, so a miss still spends the arrow and the effort.
        let ammo = {
            let mut entry = self
                .entries
                .get_mut(&id)
                .ok_or(AttackDenied::NotInArena(id))?;
            entry.charge.begin_firing()?;
            entry.charge.reserved_ammo()
        };
        if !self.equipment.consume_ammunition(id) {
            self.abort_charge(id, ChargeAbortReason::NoAmmunition);
            return Err(AttackDenied::NoAmmunition);
        }
        combatant.endurance().consume(endurance_cost);

        let event = AttackEvent {
            attacker: id,
            target: target_id,
            slot: WeaponSlot::Ranged,
            style: None,
            timestamp_ms: now_ms,
        };
        let result = self.resolve_attack_event(&combatant, &weapon, ammo, &event);

        let reload_ms = self.draw_time_ms(&combatant, &weapon, shot);
        if let Some(mut entry) = self.entries.get_mut(&id) {
            let phase = entry.charge.complete_firing(now_ms, reload_ms);
            debug!(?id, ?phase, "shot completed");
        }
        Ok(result)
    }

    fn abort_charge(&self, id: CombatantId, reason: ChargeAbortReason) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.charge.abort(reason);
        }
        self.events
            .publish(CombatEvent::ChargeAborted { combatant: id, reason });
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    /// Notifies the engine that a combatant moved or sat down. Breaks an
    /// interruptible charge and any cast.
    pub fn on_combatant_moved(&self, id: CombatantId) {
        let decision = {
            let Some(entry) = self.entries.get(&id) else {
                return;
            };
            self.interrupts
                .on_mover_moved(entry.charge.phase(), entry.casting)
        };
        if decision.cancel_charge {
            self.abort_charge(id, ChargeAbortReason::Moved);
        }
        if decision.interrupt_cast {
            self.set_casting(id, false);
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advances the engine to `now_ms`: endurance regeneration, ranged
    /// draw/reload transitions, and due melee swings. Per-attacker
    /// resolutions are serialized; cross-combatant work is independent.
    pub fn tick(&self, now_ms: u64) {
        let ids: Vec<CombatantId> = self.entries.iter().map(|entry| *entry.key()).collect();

        for id in ids {
            self.tick_regen(id, now_ms);
            self.tick_charge(id, now_ms);
            self.tick_melee(id, now_ms);
        }
    }

    fn tick_regen(&self, id: CombatantId, now_ms: u64) {
        let Some(combatant) = self.resolve(id) else {
            return;
        };
        let Some(mut entry) = self.entries.get_mut(&id) else {
            return;
        };
        let elapsed_ms = now_ms.saturating_sub(entry.last_regen_ms);
        entry.last_regen_ms = now_ms;
        // No recovery while holding a draw.
        if entry.charge.phase().interruptible() {
            return;
        }
        drop(entry);
        let amount = self.config.endurance.regen_per_second * elapsed_ms as f32 / 1000.0;
        combatant.endurance().regen(amount);
    }

    fn tick_charge(&self, id: CombatantId, now_ms: u64) {
        let tick = {
            let Some(mut entry) = self.entries.get_mut(&id) else {
                return;
            };
            entry.charge.tick(now_ms, self.config.ranged.hold_ceiling_ms)
        };
        match tick {
            ChargeTick::Aborted(reason) => {
                self.events
                    .publish(CombatEvent::ChargeAborted { combatant: id, reason });
            }
            ChargeTick::ReloadComplete => self.restart_auto_repeat(id, now_ms),
            ChargeTick::Ready | ChargeTick::None => {}
        }
    }

    /// After an auto-repeat reload the next cycle re-aims at the reserved
    /// target, aborting cleanly if the quiver has run dry or the target
    /// has gone.
    fn restart_auto_repeat(&self, id: CombatantId, now_ms: u64) {
        let (target, shot) = {
            let Some(mut entry) = self.entries.get_mut(&id) else {
                return;
            };
            let target = entry.charge.target();
            let shot = entry.charge.shot();
            entry.charge.cancel();
            (target, shot)
        };
        let Some(target) = target else {
            self.events.publish(CombatEvent::ChargeAborted {
                combatant: id,
                reason: ChargeAbortReason::TargetLost,
            });
            return;
        };
        match self.begin_ranged(id, target, shot, true, now_ms) {
            Ok(()) => {}
            Err(AttackDenied::NoAmmunition) => self.events.publish(CombatEvent::ChargeAborted {
                combatant: id,
                reason: ChargeAbortReason::NoAmmunition,
            }),
            Err(_) => self.events.publish(CombatEvent::ChargeAborted {
                combatant: id,
                reason: ChargeAbortReason::TargetLost,
            }),
        }
    }

    fn tick_melee(&self, id: CombatantId, now_ms: u64) {
        let due = self
            .entries
            .get(&id)
            .is_some_and(|entry| entry.schedule.is_due(now_ms));
        if due {
            self.resolve_melee_swing(id, now_ms);
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn resolve_melee_swing(&self, id: CombatantId, now_ms: u64) {
        let Some(combatant) = self.resolve(id) else {
            return;
        };
        let Some(main) = self.equipment.weapon(id, WeaponSlot::MainHand) else {
            self.stop_attacks(id);
            return;
        };

        let (style, target_id) = {
            let Some(mut entry) = self.entries.get_mut(&id) else {
                return;
            };
            entry.schedule.begin_resolution();
            (entry.queued_style.take(), combatant.target())
        };

        let Some(target_id) = target_id else {
            // No target selected: the cycle idles along.
            if let Some(mut entry) = self.entries.get_mut(&id) {
                entry.schedule.finish_resolution(now_ms);
            }
            return;
        };

        let event = AttackEvent {
            attacker: id,
            target: target_id,
            slot: WeaponSlot::MainHand,
            style,
            timestamp_ms: now_ms,
        };
        let result = self.resolve_attack_event(&combatant, &main, None, &event);

        // Off-hand swings chain from the primary as independent events,
        // gated on whether the off-hand swings at all this cycle.
        if result.outcome.consumes_cycle() {
            if let Some(off) = self.equipment.weapon(id, WeaponSlot::OffHand) {
                let spec = combatant.specialization(SpecLine::DualWield);
                let swings = {
                    let mut rng = self.rng.lock();
                    hit::offhand_swings(spec, &mut rng, &self.config.hit)
                };
                if swings {
                    let off_event = AttackEvent {
                        slot: WeaponSlot::OffHand,
                        style: None,
                        ..event
                    };
                    let _ = self.resolve_attack_event(&combatant, &off, None, &off_event);
                }
            }
        }

        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.schedule.finish_resolution(now_ms);
        }
    }

    /// Resolves one attack event end to end: outcome, damage, mitigation,
    /// armor wear, health application, interrupts, events.
    fn resolve_attack_event(
        &self,
        attacker: &Arc<dyn Combatant>,
        weapon: &WeaponDescriptor,
        ammo: Option<AmmoDescriptor>,
        event: &AttackEvent,
    ) -> AttackResult {
        let attacker_id = attacker.id();
        let target = self.resolve(event.target);

        let inputs = self.gather_hit_inputs(attacker, weapon, target.as_ref(), event);
        let outcome = {
            let mut rng = self.rng.lock();
            hit::resolve_outcome(&inputs, &mut rng)
        };

        let result = if outcome.connects() {
            let defender = target
                .as_ref()
                .expect("connecting hit without a resolved target");
            self.resolve_connecting_hit(attacker, weapon, ammo, event, outcome, defender)
        } else {
            AttackResult::without_damage(outcome)
        };

        if let Some(defender) = target.as_ref() {
            if outcome.consumes_cycle() {
                self.after_resolution(attacker_id, defender, &result);
            }
        }

        self.events.publish(CombatEvent::AttackResolved {
            attacker: attacker_id,
            defender: event.target,
            result,
        });
        result
    }

    fn gather_hit_inputs(
        &self,
        attacker: &Arc<dyn Combatant>,
        weapon: &WeaponDescriptor,
        target: Option<&Arc<dyn Combatant>>,
        event: &AttackEvent,
    ) -> HitInputs {
        let attacker_id = attacker.id();
        let target_state = match target {
            None => TargetState::Missing,
            Some(t) if t.id() == attacker_id => TargetState::NotAttackable,
            Some(t) => TargetState::Attackable {
                dead: t.health().is_dead(),
            },
        };

        let (in_range, visible) = match target {
            Some(t) => (
                self.world.is_in_range(attacker_id, t.id(), weapon.range),
                self.world.has_line_of_sight(attacker_id, t.id()),
            ),
            None => (false, false),
        };

        let (evade, parry, block, defender_level) = match target {
            Some(t) => (
                self.attributes.effective_rating(t.as_ref(), Property::EvadeChance),
                self.attributes.effective_rating(t.as_ref(), Property::ParryChance),
                self.attributes.effective_rating(t.as_ref(), Property::BlockChance),
                t.level(),
            ),
            None => (0.0, 0.0, 0.0, attacker.level()),
        };

        let style_ready = event.style.is_some_and(|style| {
            let opening_held = {
                let entry = self.entries.get(&attacker_id);
                let last = entry.and_then(|e| e.last_incoming);
                style.opening.satisfied_by(last)
            };
            opening_held && attacker.endurance().has(style.endurance_cost)
        });

        HitInputs {
            target: target_state,
            in_range,
            visible,
            evade_chance: evade,
            parry_chance: parry,
            block_chance: block,
            fumble_chance: self.config.hit.fumble_chance,
            miss_chance: hit::miss_chance(attacker.level(), defender_level, &self.config.hit),
            style_requested: event.style.is_some(),
            style_ready,
        }
    }

    fn resolve_connecting_hit(
        &self,
        attacker: &Arc<dyn Combatant>,
        weapon: &WeaponDescriptor,
        ammo: Option<AmmoDescriptor>,
        event: &AttackEvent,
        outcome: AttackOutcome,
        defender: &Arc<dyn Combatant>,
    ) -> AttackResult {
        let styled = matches!(outcome, AttackOutcome::Hit { styled: true });
        let style_bonus = if styled {
            let style = event.style.expect("styled hit without a style");
            attacker.endurance().consume(style.endurance_cost);
            style.damage_bonus
        } else {
            0.0
        };

        let spec_line = spec_line_for(weapon);
        let spec_level = attacker.specialization(spec_line);
        let crit_chance = self
            .attributes
            .effective_rating(attacker.as_ref(), Property::CriticalChance);
        let berserk = self
            .entries
            .get(&attacker.id())
            .and_then(|entry| entry.berserk_rank);
        let buff_af = self
            .attributes
            .effective_rating(defender.as_ref(), Property::ArmorFactor);
        let buff_absorption = self
            .attributes
            .effective_rating(defender.as_ref(), Property::Absorption);

        let mut rng = self.rng.lock();
        let slot = self.damage.roll_struck_slot(&mut rng);
        let armor = self.equipment.armor(defender.id(), slot);
        let breakdown = self.damage.resolve(
            weapon,
            spec_level,
            ammo,
            style_bonus,
            crit_chance,
            berserk,
            defender.kind(),
            defender.level(),
            slot,
            armor.as_ref(),
            buff_af,
            buff_absorption,
            &mut rng,
        );
        drop(rng);

        AttackResult {
            outcome,
            raw_damage: breakdown.raw,
            critical_damage: breakdown.critical,
            final_damage: breakdown.final_damage,
            armor_slot: Some(breakdown.slot),
        }
    }

    /// Side effects after a cycle-consuming resolution: health, armor
    /// wear, defeat, interrupts, style openings.
    fn after_resolution(
        &self,
        attacker_id: CombatantId,
        defender: &Arc<dyn Combatant>,
        result: &AttackResult,
    ) {
        let defender_id = defender.id();

        // Armor wear on damaging hits only; avoided attacks leave the
        // armor untouched.
        if result.outcome.connects() && result.final_damage > 0.0 {
            if let Some(slot) = result.armor_slot {
                if let Some(before) = self.equipment.armor(defender_id, slot) {
                    let attacker_level =
                        self.resolve(attacker_id).map_or(defender.level(), |a| a.level());
                    let amount = self.damage.wear_amount(attacker_level, defender.level());
                    if let Some(after) =
                        self.equipment.degrade_condition(defender_id, slot, amount)
                    {
                        for threshold in self.damage.crossed_thresholds(before.condition, after) {
                            self.events.publish(CombatEvent::ArmorConditionThreshold {
                                combatant: defender_id,
                                slot,
                                threshold,
                            });
                        }
                    }
                }
            }

            let change = defender.health().apply_damage(result.final_damage);
            if change.died {
                info!(?defender_id, ?attacker_id, "combatant defeated");
                if let Some(mut entry) = self.entries.get_mut(&defender_id) {
                    entry.schedule.stop();
                    entry.charge.cancel();
                }
                defender.set_in_combat(false);
                self.events.publish(CombatEvent::Defeated {
                    victim: defender_id,
                    killer: attacker_id,
                });
            }
        }

        // Interrupt propagation on the defender.
        let decision = {
            let Some(entry) = self.entries.get(&defender_id) else {
                return;
            };
            let mut rng = self.rng.lock();
            self.interrupts.on_incoming_hit(
                result.outcome,
                entry.charge.phase(),
                entry.casting,
                &mut rng,
            )
        };
        if decision.cancel_charge {
            self.abort_charge(defender_id, ChargeAbortReason::Interrupted);
        }
        if decision.interrupt_cast {
            self.set_casting(defender_id, false);
        }

        // The defender's avoidance feeds its style openings.
        if let Some(mut entry) = self.entries.get_mut(&defender_id) {
            entry.last_incoming = Some(result.outcome);
        }
    }
}

fn spec_line_for(weapon: &WeaponDescriptor) -> SpecLine {
    match weapon.ranged {
        Some(RangedClass::Bow) => SpecLine::Bow,
        Some(RangedClass::Crossbow) => SpecLine::Crossbow,
        Some(RangedClass::Thrown) => SpecLine::Thrown,
        None => match weapon.handedness {
            Handedness::OneHand => SpecLine::OneHand,
            Handedness::TwoHand => SpecLine::TwoHand,
        },
    }
}
