//! Velocity ramps and soft reverse
//!
//! The ramp engine owns current and target velocity and pushes a signed
//! step rate to the stepper driver on every control tick. Speed changes
//! follow an eased curve `t²(3 - 2t)` over the configured ramp duration, so
//! a ramp with a fixed goal is monotonic and never overshoots.
//!
//! A soft reverse runs `ReverseRampDown -> ReversePause -> ReverseRampUp`
//! and flips direction exactly once, at rest.

use super::pulse::AT_REST_SPS;
use crate::config::{MotionProfile, MIN_RAMP_MS, RPM_MAX};
use crate::traits::{Direction, StepperDriver};

/// Ramp phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampPhase {
    /// At target (or holding still)
    Steady,
    /// Accelerating toward target
    RampingUp,
    /// Decelerating toward target
    RampingDown,
    /// Soft reverse: slowing to rest
    ReverseRampDown,
    /// Soft reverse: dwelling at rest, direction already flipped
    ReversePause,
    /// Soft reverse: accelerating back to the saved target
    ReverseRampUp,
}

impl RampPhase {
    /// Any ramp or reverse phase in progress
    pub fn is_active(self) -> bool {
        self != RampPhase::Steady
    }

    pub fn is_reversing(self) -> bool {
        matches!(
            self,
            RampPhase::ReverseRampDown | RampPhase::ReversePause | RampPhase::ReverseRampUp
        )
    }
}

/// Ramp engine state
///
/// Speeds are magnitudes in steps/s; the sign lives in `direction`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RampState {
    pub phase: RampPhase,
    pub current_sps: f32,
    pub target_sps: f32,
    /// Speed at the start of the current phase
    pub ramp_start_sps: f32,
    /// Speed the current phase is heading to
    pub ramp_goal_sps: f32,
    /// Target captured when a soft reverse began
    pub saved_target_sps: f32,
    /// Engine clock at phase entry (ms)
    pub phase_started_ms: u32,
    pub direction: Direction,
}

impl Default for RampState {
    fn default() -> Self {
        Self {
            phase: RampPhase::Steady,
            current_sps: 0.0,
            target_sps: 0.0,
            ramp_start_sps: 0.0,
            ramp_goal_sps: 0.0,
            saved_target_sps: 0.0,
            phase_started_ms: 0,
            direction: Direction::Clockwise,
        }
    }
}

/// Smoothstep easing on `[0, 1]`
pub fn ease(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Velocity ramp engine
pub struct RampEngine<D> {
    driver: D,
    profile: MotionProfile,
    run: bool,
    state: RampState,
    /// Monotonic engine clock advanced by `tick` (ms)
    clock_ms: u32,
    /// Kick the pulse timer once the first moving rate is published
    kick_pending: bool,
}

impl<D: StepperDriver> RampEngine<D> {
    pub fn new(driver: D, profile: MotionProfile) -> Self {
        Self {
            driver,
            profile,
            run: false,
            state: RampState::default(),
            clock_ms: 0,
            kick_pending: false,
        }
    }

    /// Replace the motion profile; the target keeps its RPM
    pub fn configure(&mut self, profile: MotionProfile) {
        let target_rpm = self.target_rpm();
        self.profile = profile;
        self.state.target_sps = self.profile.rpm_to_sps(target_rpm);
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    pub fn state(&self) -> &RampState {
        &self.state
    }

    pub fn phase(&self) -> RampPhase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.run
    }

    pub fn direction(&self) -> Direction {
        self.state.direction
    }

    /// Signed velocity (steps/s)
    pub fn velocity(&self) -> f32 {
        self.state.current_sps * self.state.direction.sign()
    }

    /// Current speed (RPM, unsigned)
    pub fn rpm(&self) -> f32 {
        self.profile.sps_to_rpm(self.state.current_sps)
    }

    pub fn target_rpm(&self) -> f32 {
        self.profile.sps_to_rpm(self.state.target_sps)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// At rest with no ramp or reverse pending
    pub fn is_stopped(&self) -> bool {
        self.state.current_sps < AT_REST_SPS && self.state.phase == RampPhase::Steady
    }

    /// Start or stop motion
    ///
    /// Starting resets velocity to rest; the pulse timer is kicked as soon
    /// as a tick publishes a moving rate. Stopping zeroes the target and
    /// disables output on the spot.
    pub fn set_run(&mut self, run: bool) {
        if run == self.run {
            return;
        }
        self.run = run;
        self.state.current_sps = 0.0;
        self.state.ramp_start_sps = 0.0;
        self.state.ramp_goal_sps = 0.0;
        self.state.phase = RampPhase::Steady;
        self.state.phase_started_ms = self.clock_ms;
        self.kick_pending = run;

        if !run {
            self.state.target_sps = 0.0;
            self.driver.set_velocity(0.0);
        }
    }

    /// Set the target speed, clamped to `[0, RPM_MAX]`
    pub fn set_target_rpm(&mut self, rpm: f32) {
        let rpm = if rpm.is_nan() { 0.0 } else { rpm.clamp(0.0, RPM_MAX) };
        self.state.target_sps = self.profile.rpm_to_sps(rpm);
    }

    /// Begin a soft reverse
    ///
    /// Ignored while any ramp or reverse phase is active. When not running
    /// the direction simply flips. Returns whether the request was taken.
    pub fn request_reverse(&mut self) -> bool {
        if self.state.phase.is_active() {
            return false;
        }
        if !self.run {
            self.state.direction = self.state.direction.opposite();
            return true;
        }
        self.state.saved_target_sps = self.state.target_sps;
        self.enter(RampPhase::ReverseRampDown, self.clock_ms, 0.0);
        true
    }

    /// Advance the ramp by `dt_ms` and push the velocity to the driver
    pub fn tick(&mut self, dt_ms: u32) {
        let prev = self.clock_ms;
        self.clock_ms = self.clock_ms.wrapping_add(dt_ms);

        if !self.run {
            self.state.current_sps = 0.0;
            self.driver.set_velocity(0.0);
            return;
        }

        self.retarget(prev);
        self.advance();
        self.push();
    }

    /// Enter a speed ramp when the target moved away from the current speed
    /// or from the goal of the ramp in progress
    fn retarget(&mut self, now: u32) {
        let target = self.state.target_sps;
        let current = self.state.current_sps;
        match self.state.phase {
            RampPhase::Steady if target > current => self.enter(RampPhase::RampingUp, now, target),
            RampPhase::Steady if target < current => {
                self.enter(RampPhase::RampingDown, now, target)
            }
            RampPhase::RampingUp | RampPhase::RampingDown if target != self.state.ramp_goal_sps => {
                if target >= current {
                    self.enter(RampPhase::RampingUp, now, target);
                } else {
                    self.enter(RampPhase::RampingDown, now, target);
                }
            }
            _ => {}
        }
    }

    fn advance(&mut self) {
        match self.state.phase {
            RampPhase::Steady => {}
            RampPhase::RampingUp => {
                if self.interpolate(self.profile.start_ramp_ms.max(MIN_RAMP_MS)) {
                    self.state.phase = RampPhase::Steady;
                }
            }
            RampPhase::RampingDown => {
                if self.interpolate(self.profile.stop_ramp_ms.max(MIN_RAMP_MS)) {
                    self.state.phase = RampPhase::Steady;
                }
            }
            RampPhase::ReverseRampDown => {
                let done = self.interpolate(self.profile.reverse_ramp_ms);
                if done || self.state.current_sps < AT_REST_SPS {
                    self.state.current_sps = 0.0;
                    self.state.direction = self.state.direction.opposite();
                    self.enter(RampPhase::ReversePause, self.clock_ms, 0.0);
                }
            }
            RampPhase::ReversePause => {
                let elapsed = self.clock_ms.wrapping_sub(self.state.phase_started_ms);
                if elapsed >= self.profile.reverse_pause_ms as u32 {
                    let goal = self.state.saved_target_sps;
                    self.enter(RampPhase::ReverseRampUp, self.clock_ms, goal);
                }
            }
            RampPhase::ReverseRampUp => {
                if self.interpolate(self.profile.reverse_ramp_ms) {
                    self.state.phase = RampPhase::Steady;
                }
            }
        }
    }

    fn enter(&mut self, phase: RampPhase, now: u32, goal: f32) {
        self.state.phase = phase;
        self.state.phase_started_ms = now;
        self.state.ramp_start_sps = self.state.current_sps;
        self.state.ramp_goal_sps = goal;
    }

    /// Move along the eased curve; true once the goal is reached
    fn interpolate(&mut self, duration_ms: u16) -> bool {
        let elapsed = self.clock_ms.wrapping_sub(self.state.phase_started_ms);
        let t = if duration_ms == 0 {
            1.0
        } else {
            elapsed as f32 / duration_ms as f32
        };

        let start = self.state.ramp_start_sps;
        let goal = self.state.ramp_goal_sps;
        if t >= 1.0 {
            self.state.current_sps = goal;
            return true;
        }
        self.state.current_sps = start + (goal - start) * ease(t);
        false
    }

    fn push(&mut self) {
        let mut v = self.velocity();
        if self.profile.invert_direction {
            v = -v;
        }
        self.driver.set_velocity(v);

        // The timer may be parked on the idle period
        if self.kick_pending && libm::fabsf(v) >= AT_REST_SPS {
            self.kick_pending = false;
            self.driver.kick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::testing::RecordingDriver;
    use std::vec::Vec;

    const TICK_MS: u32 = 10;

    fn engine() -> RampEngine<RecordingDriver> {
        RampEngine::new(RecordingDriver::default(), MotionProfile::default())
    }

    fn run_for(engine: &mut RampEngine<RecordingDriver>, ms: u32) {
        for _ in 0..ms / TICK_MS {
            engine.tick(TICK_MS);
        }
    }

    #[test]
    fn test_ease_curve() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(0.5), 0.5);
        assert_eq!(ease(1.0), 1.0);
        assert_eq!(ease(2.0), 1.0);
    }

    #[test]
    fn test_start_is_monotonic_without_overshoot() {
        let mut ramp = engine();
        ramp.set_target_rpm(60.0);
        ramp.set_run(true);
        assert_eq!(ramp.velocity(), 0.0);
        assert_eq!(ramp.driver().kicks, 0);

        let target = ramp.profile().rpm_to_sps(60.0);
        let mut last = 0.0;
        for _ in 0..100 {
            ramp.tick(TICK_MS);
            let v = ramp.velocity();
            assert!(v >= last);
            assert!(v <= target);
            last = v;
        }
        assert_eq!(ramp.velocity(), target);
        assert_eq!(ramp.phase(), RampPhase::Steady);
    }

    #[test]
    fn test_stop_is_immediate() {
        let mut ramp = engine();
        ramp.set_target_rpm(30.0);
        ramp.set_run(true);
        run_for(&mut ramp, 1000);
        assert!(ramp.velocity() > 0.0);

        ramp.set_run(false);
        assert_eq!(ramp.velocity(), 0.0);
        assert_eq!(ramp.target_rpm(), 0.0);
        assert_eq!(ramp.driver().last(), Some(0.0));
        assert!(ramp.is_stopped());
    }

    #[test]
    fn test_target_clamped() {
        let mut ramp = engine();
        ramp.set_target_rpm(500.0);
        assert!((ramp.target_rpm() - RPM_MAX).abs() < 1e-3);
        ramp.set_target_rpm(-3.0);
        assert_eq!(ramp.target_rpm(), 0.0);
        ramp.set_target_rpm(f32::NAN);
        assert_eq!(ramp.target_rpm(), 0.0);
    }

    #[test]
    fn test_slow_down_ramps() {
        let mut ramp = engine();
        ramp.set_target_rpm(60.0);
        ramp.set_run(true);
        run_for(&mut ramp, 1000);

        ramp.set_target_rpm(30.0);
        ramp.tick(TICK_MS);
        assert_eq!(ramp.phase(), RampPhase::RampingDown);
        run_for(&mut ramp, 1000);
        assert_eq!(ramp.phase(), RampPhase::Steady);
        assert_eq!(ramp.velocity(), ramp.profile().rpm_to_sps(30.0));
    }

    #[test]
    fn test_reverse_ignored_while_active() {
        let mut ramp = engine();
        ramp.set_target_rpm(60.0);
        ramp.set_run(true);
        ramp.tick(TICK_MS);
        assert_eq!(ramp.phase(), RampPhase::RampingUp);

        let before = ramp.state().clone();
        assert!(!ramp.request_reverse());
        assert_eq!(ramp.state(), &before);

        run_for(&mut ramp, 1000);
        assert!(ramp.request_reverse());
        let before = ramp.state().clone();
        assert!(!ramp.request_reverse());
        assert_eq!(ramp.state(), &before);
    }

    #[test]
    fn test_soft_reverse_sequence() {
        let mut ramp = engine();
        ramp.set_target_rpm(60.0);
        ramp.set_run(true);
        run_for(&mut ramp, 1000);
        let speed = ramp.velocity();

        assert!(ramp.request_reverse());
        let mut phases: Vec<RampPhase> = Vec::new();
        let mut flips = 0;
        let mut dir = ramp.direction();
        for _ in 0..200 {
            ramp.tick(TICK_MS);
            if phases.last() != Some(&ramp.phase()) {
                phases.push(ramp.phase());
            }
            if ramp.direction() != dir {
                // Flip happens at rest
                assert_eq!(ramp.velocity(), 0.0);
                flips += 1;
                dir = ramp.direction();
            }
        }

        assert_eq!(
            phases,
            [
                RampPhase::ReverseRampDown,
                RampPhase::ReversePause,
                RampPhase::ReverseRampUp,
                RampPhase::Steady,
            ]
        );
        assert_eq!(flips, 1);
        assert_eq!(ramp.velocity(), -speed);
        assert!(ramp.driver().last().unwrap() < 0.0);
    }

    #[test]
    fn test_reverse_pause_holds_still() {
        let profile = MotionProfile {
            reverse_pause_ms: 500,
            ..Default::default()
        };
        let mut ramp = RampEngine::new(RecordingDriver::default(), profile);
        ramp.set_target_rpm(30.0);
        ramp.set_run(true);
        run_for(&mut ramp, 1000);
        ramp.request_reverse();

        while ramp.phase() != RampPhase::ReversePause {
            ramp.tick(TICK_MS);
        }
        run_for(&mut ramp, 400);
        assert_eq!(ramp.phase(), RampPhase::ReversePause);
        assert_eq!(ramp.driver().last(), Some(0.0));
        run_for(&mut ramp, 200);
        assert_eq!(ramp.phase(), RampPhase::ReverseRampUp);
    }

    #[test]
    fn test_reverse_when_stopped_flips_direction() {
        let mut ramp = engine();
        assert!(ramp.request_reverse());
        assert_eq!(ramp.direction(), Direction::CounterClockwise);
        assert_eq!(ramp.phase(), RampPhase::Steady);
    }

    #[test]
    fn test_invert_direction() {
        let profile = MotionProfile {
            invert_direction: true,
            ..Default::default()
        };
        let mut ramp = RampEngine::new(RecordingDriver::default(), profile);
        ramp.set_target_rpm(30.0);
        ramp.set_run(true);
        run_for(&mut ramp, 1000);
        assert!(ramp.velocity() > 0.0);
        assert!(ramp.driver().last().unwrap() < 0.0);
    }

    #[test]
    fn test_restart_resets_velocity() {
        let mut ramp = engine();
        ramp.set_target_rpm(30.0);
        ramp.set_run(true);
        run_for(&mut ramp, 1000);
        ramp.set_run(false);
        ramp.set_target_rpm(30.0);
        ramp.set_run(true);
        assert_eq!(ramp.velocity(), 0.0);
        assert_eq!(ramp.phase(), RampPhase::Steady);
        ramp.tick(TICK_MS);
        assert_eq!(ramp.driver().kicks, 2);
    }

    #[test]
    fn test_kick_follows_first_moving_rate() {
        let mut ramp = engine();
        ramp.set_target_rpm(30.0);
        ramp.set_run(true);
        assert_eq!(ramp.driver().kicks, 0);

        ramp.tick(TICK_MS);
        let driver = ramp.driver();
        assert_eq!(driver.kicks, 1);
        assert_eq!(driver.kicked_after.len(), 1);
        let published = driver.velocities[..driver.kicked_after[0]].last().copied();
        assert!(published.is_some_and(|v| v >= AT_REST_SPS));

        run_for(&mut ramp, 1000);
        assert_eq!(ramp.driver().kicks, 1);
    }

    #[test]
    fn test_no_kick_without_target() {
        let mut ramp = engine();
        ramp.set_run(true);
        run_for(&mut ramp, 500);
        assert_eq!(ramp.driver().kicks, 0);

        ramp.set_target_rpm(30.0);
        ramp.tick(TICK_MS);
        assert_eq!(ramp.driver().kicks, 1);
    }

    #[test]
    fn test_first_pulse_follows_kick() {
        use crate::motion::pulse::{PulseDriver, PulseGenerator, KICK_DELAY_US};
        use crate::traits::{Direction, PulseTimer, StepOutput};

        #[derive(Default)]
        struct Timer(Vec<u32>);

        impl PulseTimer for &mut Timer {
            fn fire_in(&mut self, delay_us: u32) {
                self.0.push(delay_us);
            }
        }

        #[derive(Default)]
        struct Pins(u32);

        impl StepOutput for Pins {
            fn set_direction(&mut self, _dir: Direction) {}
            fn step_pulse(&mut self) {
                self.0 += 1;
            }
            fn step_low(&mut self) {}
        }

        let gen = PulseGenerator::new();
        let mut timer = Timer::default();
        let mut pins = Pins::default();
        {
            let mut ramp = RampEngine::new(PulseDriver::new(&gen, &mut timer), MotionProfile::default());
            ramp.set_target_rpm(30.0);
            ramp.set_run(true);
            ramp.tick(TICK_MS);
        }

        // The kicked firing already sees a moving command
        assert_eq!(timer.0, [KICK_DELAY_US]);
        let next = gen.on_timer(&mut pins);
        assert_eq!(pins.0, 1);
        assert_eq!(gen.pulse_count(), 1);
        assert_eq!(next, gen.command().interval_us);
    }
}
