//! Step pulse generation
//!
//! [`PulseGenerator`] is shared between the control loop and the step timer
//! interrupt. The loop publishes a [`PulseCommand`] (interval and direction
//! packed into one atomic word); the interrupt reads it on every firing,
//! emits one step pulse and returns the delay until the next firing.
//!
//! The interrupt only writes the liveness counters and its own record of
//! the asserted direction. The loop never writes those.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use crate::traits::{Direction, PulseTimer, StepOutput, StepperDriver};

/// Below this step rate (steps/s) output is disabled
pub const AT_REST_SPS: f32 = 0.5;

/// Shortest pulse interval the driver can follow (µs)
pub const MIN_INTERVAL_US: u32 = 40;

/// Re-arm period while output is disabled (µs)
pub const IDLE_PERIOD_US: u32 = 20_000;

/// Delay used by [`StepperDriver::kick`] (µs)
pub const KICK_DELAY_US: u32 = 50;

/// Quiet period after which a running pulse train counts as stalled (ms)
pub const STALL_TIMEOUT_MS: u32 = 200;

const DIR_BIT: u32 = 1 << 31;
const INTERVAL_MASK: u32 = !DIR_BIT;

const ASSERTED_NONE: u8 = 0;
const ASSERTED_CW: u8 = 1;
const ASSERTED_CCW: u8 = 2;

/// Pulse interval for a step rate, or `None` when at rest
pub fn interval_for(steps_per_s: f32) -> Option<u32> {
    let rate = libm::fabsf(steps_per_s);
    // NaN compares false and lands at rest
    if !(rate >= AT_REST_SPS) {
        return None;
    }
    let us = 1_000_000.0 / rate;
    Some((us as u32).clamp(MIN_INTERVAL_US, INTERVAL_MASK))
}

/// Interval and direction as seen by the interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseCommand {
    /// Microseconds between pulses, 0 = output disabled
    pub interval_us: u32,
    pub direction: Direction,
}

impl PulseCommand {
    /// Output disabled
    pub const STOPPED: Self = Self {
        interval_us: 0,
        direction: Direction::Clockwise,
    };

    /// Command for a signed step rate
    pub fn from_velocity(steps_per_s: f32) -> Self {
        match interval_for(steps_per_s) {
            Some(interval_us) => Self {
                interval_us,
                direction: Direction::from_velocity(steps_per_s),
            },
            None => Self::STOPPED,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval_us != 0
    }

    fn pack(self) -> u32 {
        let dir = match self.direction {
            Direction::Clockwise => 0,
            Direction::CounterClockwise => DIR_BIT,
        };
        (self.interval_us & INTERVAL_MASK) | dir
    }

    fn unpack(word: u32) -> Self {
        Self {
            interval_us: word & INTERVAL_MASK,
            direction: if word & DIR_BIT != 0 {
                Direction::CounterClockwise
            } else {
                Direction::Clockwise
            },
        }
    }
}

/// Pulse train state shared with the step timer interrupt
///
/// Lives in a `static`; every method takes `&self`.
#[derive(Debug)]
pub struct PulseGenerator {
    command: AtomicU32,
    pulses: AtomicU32,
    fires: AtomicU32,
    asserted: AtomicU8,
}

impl Default for PulseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseGenerator {
    pub const fn new() -> Self {
        Self {
            command: AtomicU32::new(0),
            pulses: AtomicU32::new(0),
            fires: AtomicU32::new(0),
            asserted: AtomicU8::new(ASSERTED_NONE),
        }
    }

    /// Publish a signed step rate (control loop)
    pub fn set_velocity(&self, steps_per_s: f32) {
        self.publish(PulseCommand::from_velocity(steps_per_s));
    }

    /// Disable output (control loop)
    pub fn stop(&self) {
        self.publish(PulseCommand::STOPPED);
    }

    fn publish(&self, command: PulseCommand) {
        self.command.store(command.pack(), Ordering::Release);
    }

    /// Currently published command
    pub fn command(&self) -> PulseCommand {
        PulseCommand::unpack(self.command.load(Ordering::Acquire))
    }

    /// Step pulses emitted since boot (wrapping)
    pub fn pulse_count(&self) -> u32 {
        self.pulses.load(Ordering::Relaxed)
    }

    /// Interrupt firings since boot (wrapping)
    pub fn fire_count(&self) -> u32 {
        self.fires.load(Ordering::Relaxed)
    }

    /// Interrupt body
    ///
    /// Asserts direction if it changed, emits one pulse and returns the
    /// delay in µs until the next firing. While disabled the step line is
    /// held low and the timer keeps ticking at [`IDLE_PERIOD_US`].
    pub fn on_timer<O: StepOutput + ?Sized>(&self, out: &mut O) -> u32 {
        self.fires.fetch_add(1, Ordering::Relaxed);

        let command = self.command();
        if !command.is_enabled() {
            out.step_low();
            return IDLE_PERIOD_US;
        }

        let wanted = match command.direction {
            Direction::Clockwise => ASSERTED_CW,
            Direction::CounterClockwise => ASSERTED_CCW,
        };
        if self.asserted.load(Ordering::Relaxed) != wanted {
            out.set_direction(command.direction);
            self.asserted.store(wanted, Ordering::Relaxed);
        }

        out.step_pulse();
        self.pulses.fetch_add(1, Ordering::Relaxed);
        command.interval_us
    }
}

/// Control-loop handle to a [`PulseGenerator`] and its timer
pub struct PulseDriver<'a, T> {
    generator: &'a PulseGenerator,
    timer: T,
}

impl<'a, T: PulseTimer> PulseDriver<'a, T> {
    pub fn new(generator: &'a PulseGenerator, timer: T) -> Self {
        Self { generator, timer }
    }

    pub fn generator(&self) -> &'a PulseGenerator {
        self.generator
    }
}

impl<T: PulseTimer> StepperDriver for PulseDriver<'_, T> {
    fn set_velocity(&mut self, steps_per_s: f32) {
        self.generator.set_velocity(steps_per_s);
    }

    fn kick(&mut self) {
        self.timer.fire_in(KICK_DELAY_US);
    }
}

/// Interrupt liveness check
///
/// Reports a stall when output is enabled but the fire counter has not
/// moved for [`STALL_TIMEOUT_MS`] (or two pulse intervals, whichever is
/// longer). The caller kicks the timer and logs; a stall is never fatal.
#[derive(Debug, Clone, Default)]
pub struct PulseWatchdog {
    last_fires: u32,
    quiet_ms: u32,
}

impl PulseWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once per detected stall
    pub fn check(&mut self, elapsed_ms: u32, generator: &PulseGenerator) -> bool {
        let fires = generator.fire_count();
        let command = generator.command();

        if fires != self.last_fires || !command.is_enabled() {
            self.last_fires = fires;
            self.quiet_ms = 0;
            return false;
        }

        self.quiet_ms = self.quiet_ms.saturating_add(elapsed_ms);
        let limit = STALL_TIMEOUT_MS.max(command.interval_us / 500);
        if self.quiet_ms >= limit {
            self.quiet_ms = 0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;

    #[derive(Debug, PartialEq)]
    enum Pin {
        Dir(Direction),
        Pulse,
        Low,
    }

    #[derive(Default)]
    struct RecordingPins(Vec<Pin>);

    impl StepOutput for RecordingPins {
        fn set_direction(&mut self, dir: Direction) {
            self.0.push(Pin::Dir(dir));
        }

        fn step_pulse(&mut self) {
            self.0.push(Pin::Pulse);
        }

        fn step_low(&mut self) {
            self.0.push(Pin::Low);
        }
    }

    #[derive(Default)]
    struct RecordingTimer(Vec<u32>);

    impl PulseTimer for &mut RecordingTimer {
        fn fire_in(&mut self, delay_us: u32) {
            self.0.push(delay_us);
        }
    }

    #[test]
    fn test_at_rest_disables_output() {
        let gen = PulseGenerator::new();
        gen.set_velocity(0.3);
        assert!(!gen.command().is_enabled());
        gen.set_velocity(f32::NAN);
        assert!(!gen.command().is_enabled());

        let mut pins = RecordingPins::default();
        assert_eq!(gen.on_timer(&mut pins), IDLE_PERIOD_US);
        assert_eq!(pins.0, [Pin::Low]);
        assert_eq!(gen.pulse_count(), 0);
        assert_eq!(gen.fire_count(), 1);
    }

    #[test]
    fn test_interval_and_direction() {
        let gen = PulseGenerator::new();
        gen.set_velocity(-1000.0);
        let cmd = gen.command();
        assert_eq!(cmd.interval_us, 1000);
        assert_eq!(cmd.direction, Direction::CounterClockwise);

        // Very fast commands clamp to the driver minimum
        gen.set_velocity(1.0e6);
        assert_eq!(gen.command().interval_us, MIN_INTERVAL_US);
    }

    #[test]
    fn test_direction_asserted_only_on_change() {
        let gen = PulseGenerator::new();
        let mut pins = RecordingPins::default();

        gen.set_velocity(500.0);
        assert_eq!(gen.on_timer(&mut pins), 2000);
        gen.on_timer(&mut pins);
        gen.set_velocity(-500.0);
        gen.on_timer(&mut pins);

        assert_eq!(
            pins.0,
            [
                Pin::Dir(Direction::Clockwise),
                Pin::Pulse,
                Pin::Pulse,
                Pin::Dir(Direction::CounterClockwise),
                Pin::Pulse,
            ]
        );
        assert_eq!(gen.pulse_count(), 3);
    }

    #[test]
    fn test_kick_rearms_timer() {
        let gen = PulseGenerator::new();
        let mut timer = RecordingTimer::default();
        {
            let mut driver = PulseDriver::new(&gen, &mut timer);
            driver.set_velocity(100.0);
            driver.kick();
        }
        assert_eq!(timer.0, [KICK_DELAY_US]);
        assert_eq!(gen.command().interval_us, 10_000);
    }

    #[test]
    fn test_watchdog_detects_stall() {
        let gen = PulseGenerator::new();
        let mut dog = PulseWatchdog::new();
        let mut pins = RecordingPins::default();

        // Disabled output never stalls
        for _ in 0..50 {
            assert!(!dog.check(10, &gen));
        }

        gen.set_velocity(3200.0);
        gen.on_timer(&mut pins);
        assert!(!dog.check(10, &gen));

        let mut fired = 0;
        for _ in 0..40 {
            if dog.check(10, &gen) {
                fired += 1;
            }
        }
        // 400ms of silence is two timeouts
        assert_eq!(fired, 2);

        // Progress clears the quiet timer
        gen.on_timer(&mut pins);
        assert!(!dog.check(190, &gen));
    }

    #[test]
    fn test_watchdog_allows_slow_trains() {
        let gen = PulseGenerator::new();
        let mut dog = PulseWatchdog::new();
        // 1 step/s: a second between firings is expected
        gen.set_velocity(1.0);
        dog.check(0, &gen);
        for _ in 0..150 {
            assert!(!dog.check(10, &gen));
        }
    }

    proptest! {
        #[test]
        fn test_interval_matches_rate(v in -100_000.0f32..100_000.0) {
            let cmd = PulseCommand::from_velocity(v);
            if v.abs() < AT_REST_SPS {
                prop_assert!(!cmd.is_enabled());
            } else {
                let expected = ((1.0e6 / v.abs()) as u32).max(MIN_INTERVAL_US);
                prop_assert_eq!(cmd.interval_us, expected);
                prop_assert_eq!(cmd.direction, Direction::from_velocity(v));
            }
        }

        #[test]
        fn test_pack_unpack(interval in 0u32..=INTERVAL_MASK, ccw in any::<bool>()) {
            let direction = if ccw { Direction::CounterClockwise } else { Direction::Clockwise };
            let cmd = PulseCommand { interval_us: interval, direction };
            prop_assert_eq!(PulseCommand::unpack(cmd.pack()), cmd);
        }
    }
}
