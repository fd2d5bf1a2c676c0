//! Stepper output traits
//!
//! The motion core talks to the step/dir driver from two contexts: the
//! control loop sets velocity through [`StepperDriver`], and the timer
//! interrupt toggles the pins through [`StepOutput`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Clockwise rotation (positive velocity)
    #[default]
    Clockwise,
    /// Counter-clockwise rotation (negative velocity)
    CounterClockwise,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    /// Direction of a signed velocity; zero counts as clockwise
    pub fn from_velocity(v: f32) -> Self {
        if v < 0.0 {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        }
    }

    /// +1.0 or -1.0
    pub fn sign(self) -> f32 {
        match self {
            Direction::Clockwise => 1.0,
            Direction::CounterClockwise => -1.0,
        }
    }
}

/// Step and direction lines, driven from interrupt context
///
/// Implementations must not block or allocate.
pub trait StepOutput {
    /// Drive the DIR line
    fn set_direction(&mut self, dir: Direction);

    /// Emit one short STEP pulse, leaving the line low
    fn step_pulse(&mut self);

    /// Hold the STEP line low while output is disabled
    fn step_low(&mut self);
}

/// Hardware timer that fires the pulse interrupt
pub trait PulseTimer {
    /// Re-arm the pulse interrupt `delay_us` from now, replacing any
    /// pending deadline
    fn fire_in(&mut self, delay_us: u32);
}

/// Velocity sink driven by the ramp engine every control tick
pub trait StepperDriver {
    /// Command a signed step rate (steps/s); sign selects direction
    fn set_velocity(&mut self, steps_per_s: f32);

    /// Force the next pulse interrupt to fire almost immediately
    fn kick(&mut self);
}
