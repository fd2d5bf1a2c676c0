//! Motion profile configuration
//!
//! Describes the drive train (steps per revolution, microstepping, direction
//! sense), the timing of start, stop and soft-reverse ramps, and the
//! thermistor calibration offset.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lowest RPM a session step may be driven at
pub const RPM_MIN: f32 = 1.0;

/// Highest RPM the base is driven at
pub const RPM_MAX: f32 = 80.0;

/// Full steps per motor revolution (1.8° motor)
pub const DEFAULT_STEPS_PER_REV: u16 = 200;

/// Driver microstep setting
pub const DEFAULT_MICROSTEPS: u16 = 16;

/// Shortest accepted start/stop ramp
pub const MIN_RAMP_MS: u16 = 50;

/// Drive train and ramp timing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionProfile {
    /// Full steps per motor revolution
    pub steps_per_rev: u16,
    /// Microsteps per full step
    pub microsteps: u16,
    /// Swap the meaning of the DIR line
    pub invert_direction: bool,
    /// Ramp duration from rest to target (ms)
    pub start_ramp_ms: u16,
    /// Ramp duration from speed to rest (ms)
    pub stop_ramp_ms: u16,
    /// Ramp duration of each half of a soft reverse (ms)
    pub reverse_ramp_ms: u16,
    /// Dwell at rest between the two halves of a soft reverse (ms)
    pub reverse_pause_ms: u16,
    /// Added to every thermistor reading (°C)
    pub temp_offset_c: f32,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            steps_per_rev: DEFAULT_STEPS_PER_REV,
            microsteps: DEFAULT_MICROSTEPS,
            invert_direction: false,
            start_ramp_ms: 350,
            stop_ramp_ms: 600,
            reverse_ramp_ms: 350,
            reverse_pause_ms: 150,
            temp_offset_c: 0.0,
        }
    }
}

impl MotionProfile {
    /// Microsteps per output revolution, never zero
    pub fn effective_steps_per_rev(&self) -> u32 {
        (self.steps_per_rev as u32 * self.microsteps as u32).max(1)
    }

    /// Convert RPM to step rate (steps/s)
    pub fn rpm_to_sps(&self, rpm: f32) -> f32 {
        rpm * self.effective_steps_per_rev() as f32 / 60.0
    }

    /// Convert step rate (steps/s) to RPM
    pub fn sps_to_rpm(&self, sps: f32) -> f32 {
        sps * 60.0 / self.effective_steps_per_rev() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_profile() {
        let profile = MotionProfile::default();
        assert_eq!(profile.effective_steps_per_rev(), 3200);
        // 60 RPM is one revolution per second
        assert_eq!(profile.rpm_to_sps(60.0), 3200.0);
    }

    #[test]
    fn test_zero_steps_never_divides_by_zero() {
        let profile = MotionProfile {
            microsteps: 0,
            ..Default::default()
        };
        assert_eq!(profile.effective_steps_per_rev(), 1);
        assert!(profile.sps_to_rpm(10.0).is_finite());
    }

    proptest! {
        #[test]
        fn test_rpm_round_trip(rpm in 0.0f32..RPM_MAX, microsteps in 1u16..=256) {
            let profile = MotionProfile { microsteps, ..Default::default() };
            let back = profile.sps_to_rpm(profile.rpm_to_sps(rpm));
            prop_assert!((back - rpm).abs() <= 1e-3);
        }
    }
}
