//! Step/dir stepper output
//!
//! Drives a STEP/DIR driver (A4988, DRV8825, TMC22xx in standalone mode)
//! from the step timer interrupt.

use dervish_core::traits::{Direction, StepOutput};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// STEP high time; covers A4988 (1 µs) and DRV8825 (1.9 µs)
pub const PULSE_WIDTH_NS: u32 = 2_000;

/// DIR setup time before the next STEP edge
pub const DIR_SETUP_NS: u32 = 1_000;

/// STEP and DIR lines of one driver
///
/// Pin errors are ignored; the interrupt has nowhere to report them and
/// GPIO writes on the supported chips cannot fail.
pub struct StepDirPins<S, D, W> {
    step: S,
    dir: D,
    delay: W,
}

impl<S, D, W> StepDirPins<S, D, W>
where
    S: OutputPin,
    D: OutputPin,
    W: DelayNs,
{
    pub fn new(mut step: S, dir: D, delay: W) -> Self {
        let _ = step.set_low();
        Self { step, dir, delay }
    }

    pub fn release(self) -> (S, D, W) {
        (self.step, self.dir, self.delay)
    }
}

impl<S, D, W> StepOutput for StepDirPins<S, D, W>
where
    S: OutputPin,
    D: OutputPin,
    W: DelayNs,
{
    fn set_direction(&mut self, dir: Direction) {
        let _ = match dir {
            Direction::Clockwise => self.dir.set_low(),
            Direction::CounterClockwise => self.dir.set_high(),
        };
        self.delay.delay_ns(DIR_SETUP_NS);
    }

    fn step_pulse(&mut self) {
        let _ = self.step.set_high();
        self.delay.delay_ns(PULSE_WIDTH_NS);
        let _ = self.step.set_low();
    }

    fn step_low(&mut self) {
        let _ = self.step.set_low();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use dervish_core::motion::PulseGenerator;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Trace {
        Step(bool),
        Dir(bool),
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Trace>>>;

    struct Pin {
        log: Log,
        is_dir: bool,
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.record(true);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.record(false);
            Ok(())
        }
    }

    impl Pin {
        fn record(&self, level: bool) {
            let entry = if self.is_dir {
                Trace::Dir(level)
            } else {
                Trace::Step(level)
            };
            self.log.borrow_mut().push(entry);
        }
    }

    struct Delay(Log);

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Trace::Delay(ns));
        }
    }

    fn make_pins() -> (StepDirPins<Pin, Pin, Delay>, Log) {
        let log: Log = Rc::default();
        let pins = StepDirPins::new(
            Pin {
                log: log.clone(),
                is_dir: false,
            },
            Pin {
                log: log.clone(),
                is_dir: true,
            },
            Delay(log.clone()),
        );
        log.borrow_mut().clear();
        (pins, log)
    }

    #[test]
    fn test_pulse_shape() {
        let (mut pins, log) = make_pins();
        pins.step_pulse();
        assert_eq!(
            *log.borrow(),
            [
                Trace::Step(true),
                Trace::Delay(PULSE_WIDTH_NS),
                Trace::Step(false)
            ]
        );
    }

    #[test]
    fn test_direction_set_before_step() {
        let (mut pins, log) = make_pins();
        let generator = PulseGenerator::new();
        generator.set_velocity(-1000.0);
        generator.on_timer(&mut pins);

        let trace = log.borrow();
        assert_eq!(trace[0], Trace::Dir(true));
        assert_eq!(trace[1], Trace::Delay(DIR_SETUP_NS));
        assert_eq!(trace[2], Trace::Step(true));
    }

    #[test]
    fn test_disabled_holds_step_low() {
        let (mut pins, log) = make_pins();
        let generator = PulseGenerator::new();
        generator.on_timer(&mut pins);
        assert_eq!(*log.borrow(), [Trace::Step(false)]);
    }
}
