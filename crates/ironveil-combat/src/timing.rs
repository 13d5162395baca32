//! Attack timing.
//!
//! Computes the effective interval between swings from weapon speed,
//! quickness, and speed bonuses, and owns the per-combatant repeating
//! schedule. Starting, stopping, and switching weapons reset the schedule;
//! nothing else may.

use serde::{Deserialize, Serialize};

use crate::config::TimingConfig;

/// Effective interval in milliseconds for a single weapon.
///
/// `speed_s × (1 − (clamp(quickness, 0, cap) − pivot) × scale) ×
/// (1 + bonus% / 100)`, floored at the configured minimum. Quickness below
/// the pivot lengthens the interval.
#[must_use]
pub fn effective_interval_ms(
    weapon_speed_s: f32,
    quickness: f32,
    speed_bonus_percent: f32,
    config: &TimingConfig,
) -> u64 {
    let quickness = quickness.clamp(0.0, config.quickness_cap);
    let quickness_factor = 1.0 - (quickness - config.quickness_pivot) * config.quickness_scale;
    let bonus_factor = 1.0 + speed_bonus_percent / 100.0;
    let seconds = weapon_speed_s * quickness_factor * bonus_factor;
    let ms = (f64::from(seconds) * 1000.0).round().max(0.0) as u64;
    ms.max(config.min_interval_ms)
}

/// Effective interval when several weapons swing simultaneously: the
/// arithmetic mean of the per-weapon speeds, then the usual model.
#[must_use]
pub fn dual_interval_ms(
    weapon_speeds_s: &[f32],
    quickness: f32,
    speed_bonus_percent: f32,
    config: &TimingConfig,
) -> u64 {
    if weapon_speeds_s.is_empty() {
        return config.min_interval_ms;
    }
    let mean = weapon_speeds_s.iter().sum::<f32>() / weapon_speeds_s.len() as f32;
    effective_interval_ms(mean, quickness, speed_bonus_percent, config)
}

/// Draw speed under the critical-shot style: the draw both lengthens from
/// the doubled base and shortens per rank.
///
/// `speed × 2 − (rank − 1) × speed / 10`
#[must_use]
pub fn critical_shot_speed(speed_s: f32, rank: u8) -> f32 {
    speed_s * 2.0 - f32::from(rank.saturating_sub(1)) * speed_s / 10.0
}

// ============================================================================
// Schedule
// ============================================================================

/// Repeating attack schedule for one combatant.
///
/// At most one resolution may be in flight; the guard is asserted, not
/// silently recovered, because a double resolution means the caller and
/// engine have desynchronized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackSchedule {
    interval_ms: u64,
    next_swing_ms: Option<u64>,
    in_flight: bool,
}

impl AttackSchedule {
    /// Creates an inactive schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the cycle: the first swing lands one full
    /// interval from `now_ms`. Cancels any pending swing.
    pub fn start(&mut self, now_ms: u64, interval_ms: u64) {
        self.interval_ms = interval_ms;
        self.next_swing_ms = Some(now_ms + interval_ms);
        self.in_flight = false;
    }

    /// Stops the cycle and cancels any pending swing.
    pub fn stop(&mut self) {
        self.next_swing_ms = None;
        self.in_flight = false;
    }

    /// Whether the cycle is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.next_swing_ms.is_some()
    }

    /// Current interval in milliseconds.
    #[must_use]
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Next swing timestamp, if scheduled.
    #[must_use]
    pub const fn next_swing_ms(&self) -> Option<u64> {
        self.next_swing_ms
    }

    /// Whether a swing is due at `now_ms`.
    #[must_use]
    pub fn is_due(&self, now_ms: u64) -> bool {
        !self.in_flight && self.next_swing_ms.is_some_and(|at| now_ms >= at)
    }

    /// Marks the due swing as resolving. Panics if no cycle is scheduled
    /// or a resolution is already in flight.
    pub fn begin_resolution(&mut self) {
        assert!(
            self.next_swing_ms.is_some(),
            "attack resolution without a scheduled cycle"
        );
        assert!(!self.in_flight, "overlapping attack resolution");
        self.in_flight = true;
    }

    /// Completes the in-flight resolution and schedules the next swing.
    pub fn finish_resolution(&mut self, now_ms: u64) {
        assert!(self.in_flight, "finish without a resolution in flight");
        self.in_flight = false;
        self.next_swing_ms = Some(now_ms + self.interval_ms);
    }

    /// Pushes the next swing back by `delay_ms` without resetting the
    /// cycle (interrupt-driven delay).
    pub fn delay(&mut self, delay_ms: u64) {
        if let Some(at) = self.next_swing_ms.as_mut() {
            *at += delay_ms;
        }
    }

    /// Whether a resolution is currently in flight.
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quickness_sixty_is_the_pivot() {
        let config = TimingConfig::default();
        // Speed 3.0 at quickness 60: no bonus, no penalty.
        assert_eq!(effective_interval_ms(3.0, 60.0, 0.0, &config), 3000);
    }

    #[test]
    fn test_quickness_speeds_up() {
        let config = TimingConfig::default();
        // (250 - 60) * 0.002 = 0.38 reduction.
        let interval = effective_interval_ms(3.0, 250.0, 0.0, &config);
        assert_eq!(interval, 1860);
        // Values past the cap clamp to the cap.
        assert_eq!(effective_interval_ms(3.0, 400.0, 0.0, &config), interval);
    }

    #[test]
    fn test_low_quickness_slows_down() {
        let config = TimingConfig::default();
        assert!(effective_interval_ms(3.0, 20.0, 0.0, &config) > 3000);
    }

    #[test]
    fn test_floor_clamp() {
        let config = TimingConfig::default();
        assert_eq!(effective_interval_ms(0.9, 250.0, 50.0, &config), 1500);
    }

    #[test]
    fn test_speed_bonus_percent() {
        let config = TimingConfig::default();
        // -20% haste shortens the interval.
        assert_eq!(effective_interval_ms(3.0, 60.0, -20.0, &config), 2400);
    }

    #[test]
    fn test_dual_wield_mean() {
        let config = TimingConfig::default();
        let dual = dual_interval_ms(&[2.5, 3.5], 60.0, 0.0, &config);
        assert_eq!(dual, effective_interval_ms(3.0, 60.0, 0.0, &config));
    }

    #[test]
    fn test_critical_shot_speed() {
        // Rank 1: pure doubling.
        assert!((critical_shot_speed(4.0, 1) - 8.0).abs() < f32::EPSILON);
        // Each rank above 1 takes a tenth of base speed back off.
        assert!((critical_shot_speed(4.0, 3) - 7.2).abs() < 0.001);
    }

    #[test]
    fn test_schedule_lifecycle() {
        let mut schedule = AttackSchedule::new();
        assert!(!schedule.is_active());

        schedule.start(1000, 3000);
        assert!(schedule.is_active());
        assert!(!schedule.is_due(3999));
        assert!(schedule.is_due(4000));

        schedule.begin_resolution();
        assert!(schedule.in_flight());
        assert!(!schedule.is_due(4000));
        schedule.finish_resolution(4000);
        assert_eq!(schedule.next_swing_ms(), Some(7000));

        schedule.stop();
        assert!(!schedule.is_active());
        assert!(!schedule.is_due(u64::MAX));
    }

    #[test]
    fn test_restart_cancels_pending_swing() {
        let mut schedule = AttackSchedule::new();
        schedule.start(0, 2000);
        schedule.start(500, 4000);
        assert_eq!(schedule.next_swing_ms(), Some(4500));
    }

    #[test]
    fn test_delay_pushes_back() {
        let mut schedule = AttackSchedule::new();
        schedule.start(0, 2000);
        schedule.delay(500);
        assert_eq!(schedule.next_swing_ms(), Some(2500));
    }

    #[test]
    #[should_panic(expected = "overlapping attack resolution")]
    fn test_overlapping_resolution_panics() {
        let mut schedule = AttackSchedule::new();
        schedule.start(0, 2000);
        schedule.begin_resolution();
        schedule.begin_resolution();
    }

    #[test]
    #[should_panic(expected = "without a scheduled cycle")]
    fn test_resolution_without_cycle_panics() {
        let mut schedule = AttackSchedule::new();
        schedule.begin_resolution();
    }
}
