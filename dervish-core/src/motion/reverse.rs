//! Periodic reverse policy
//!
//! Decides when a soft reverse is due, either after a fixed amount of
//! motion time or after a number of output revolutions. The trigger never
//! touches the ramp engine itself; it calls back into whatever the caller
//! wires up (normally `RampEngine::request_reverse`).

use crate::config::{ReverseMode, ReversePolicy};

/// Reverse trigger
#[derive(Debug, Clone)]
pub struct ReverseTrigger {
    policy: ReversePolicy,
    steps_per_rev: u32,
    /// Trigger clock (ms), advanced on every tick
    clock_ms: u64,
    /// Clock at the last trigger or reset
    last_trigger_ms: u64,
    /// Steps travelled since the last trigger or reset
    steps: f32,
}

impl ReverseTrigger {
    pub fn new(policy: ReversePolicy, steps_per_rev: u32) -> Self {
        Self {
            policy,
            steps_per_rev: steps_per_rev.max(1),
            clock_ms: 0,
            last_trigger_ms: 0,
            steps: 0.0,
        }
    }

    /// Change the policy and restart counting
    pub fn configure(&mut self, policy: ReversePolicy, steps_per_rev: u32) {
        self.policy = policy;
        self.steps_per_rev = steps_per_rev.max(1);
        self.reset();
    }

    pub fn policy(&self) -> &ReversePolicy {
        &self.policy
    }

    /// Zero the time baseline and the turn accumulator
    pub fn reset(&mut self) {
        self.last_trigger_ms = self.clock_ms;
        self.steps = 0.0;
    }

    /// Revolutions accumulated since the last trigger
    pub fn turns(&self) -> f32 {
        self.steps / self.steps_per_rev as f32
    }

    /// Milliseconds since the last trigger or reset
    pub fn since_trigger_ms(&self) -> u64 {
        self.clock_ms - self.last_trigger_ms
    }

    /// Advance by `dt_ms` at signed `velocity` (steps/s)
    ///
    /// `active` is true while motion is commanded. When a reverse is due,
    /// `on_fire` is called; it returns false if the reverse could not start
    /// yet (a ramp is still running), in which case the trigger stays due
    /// and retries on the next tick. Returns true if a reverse was started.
    pub fn tick<F>(&mut self, dt_ms: u32, velocity: f32, active: bool, on_fire: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        self.clock_ms += dt_ms as u64;

        if !active || !self.policy.is_armed() {
            return false;
        }

        let due = match self.policy.mode {
            ReverseMode::Off => false,
            ReverseMode::TimeInterval => {
                let interval_ms = (self.policy.interval * 1000.0) as u64;
                self.since_trigger_ms() >= interval_ms
            }
            ReverseMode::TurnCount => {
                self.steps += libm::fabsf(velocity) * dt_ms as f32 / 1000.0;
                self.steps >= self.policy.interval * self.steps_per_rev as f32
            }
        };

        if due && on_fire() {
            self.reset();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEPS_PER_REV: u32 = 3200;

    fn trigger(mode: ReverseMode, interval: f32) -> ReverseTrigger {
        ReverseTrigger::new(ReversePolicy { mode, interval }, STEPS_PER_REV)
    }

    #[test]
    fn test_turn_count_fires_twice_in_ten_turns() {
        let mut t = trigger(ReverseMode::TurnCount, 5.0);
        let mut fired = 0;
        // One revolution per second for ten seconds
        for _ in 0..100 {
            t.tick(100, STEPS_PER_REV as f32, true, || {
                fired += 1;
                true
            });
        }
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_turn_count_ignores_sign() {
        let mut t = trigger(ReverseMode::TurnCount, 1.0);
        for _ in 0..5 {
            t.tick(100, -(STEPS_PER_REV as f32), true, || true);
        }
        assert_eq!(t.turns(), 0.5);
    }

    #[test]
    fn test_time_interval() {
        let mut t = trigger(ReverseMode::TimeInterval, 10.0);
        let mut fired_at = None;
        for i in 1..=150 {
            if t.tick(100, 0.0, true, || true) {
                fired_at.get_or_insert(i);
            }
        }
        assert_eq!(fired_at, Some(100));
        assert_eq!(t.since_trigger_ms(), 5000);
    }

    #[test]
    fn test_inactive_or_off_never_fires() {
        let mut off = trigger(ReverseMode::Off, 1.0);
        let mut zero = trigger(ReverseMode::TurnCount, 0.0);
        let mut idle = trigger(ReverseMode::TurnCount, 1.0);
        for _ in 0..1000 {
            assert!(!off.tick(100, 3200.0, true, || true));
            assert!(!zero.tick(100, 3200.0, true, || true));
            assert!(!idle.tick(100, 3200.0, false, || true));
        }
        assert_eq!(idle.turns(), 0.0);
    }

    #[test]
    fn test_refused_reverse_retries() {
        let mut t = trigger(ReverseMode::TimeInterval, 1.0);
        for _ in 0..10 {
            t.tick(100, 0.0, true, || false);
        }
        // Still due, fires as soon as the ramp accepts
        assert!(t.tick(100, 0.0, true, || true));
        assert_eq!(t.since_trigger_ms(), 0);
    }

    #[test]
    fn test_reset_zeroes_accumulators() {
        let mut t = trigger(ReverseMode::TurnCount, 10.0);
        for _ in 0..10 {
            t.tick(100, 3200.0, true, || true);
        }
        assert_eq!(t.turns(), 1.0);
        t.reset();
        assert_eq!(t.turns(), 0.0);
        assert_eq!(t.since_trigger_ms(), 0);
    }
}
