//! Temperature limit alarm

use crate::config::{AlarmAction, SessionStep, TempLimits};

impl AlarmAction {
    /// Action in force for `step`: its own override, else the profile
    /// default
    pub fn resolve(step: &SessionStep, profile: AlarmAction) -> AlarmAction {
        step.alarm_action.unwrap_or(profile)
    }
}

/// Which side of the limit band the temperature is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmFlags {
    pub low: bool,
    pub high: bool,
}

impl AlarmFlags {
    pub fn active(&self) -> bool {
        self.low || self.high
    }
}

impl TempLimits {
    /// Flags for a reading; an unknown reading never alarms
    pub fn check(&self, temp_c: Option<f32>) -> AlarmFlags {
        match temp_c {
            Some(t) if self.enabled && t.is_finite() => AlarmFlags {
                low: t < self.min_c,
                high: t > self.max_c,
            },
            _ => AlarmFlags::default(),
        }
    }
}

/// Alarm transition seen by one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmEdge {
    None,
    Rising,
    Falling,
}

/// Edge-tracking limit alarm
#[derive(Debug, Clone, Default)]
pub struct TempAlarm {
    flags: AlarmFlags,
}

impl TempAlarm {
    pub fn flags(&self) -> AlarmFlags {
        self.flags
    }

    pub fn update(&mut self, limits: &TempLimits, temp_c: Option<f32>) -> AlarmEdge {
        let was = self.flags.active();
        self.flags = limits.check(temp_c);
        match (was, self.flags.active()) {
            (false, true) => AlarmEdge::Rising,
            (true, false) => AlarmEdge::Falling,
            _ => AlarmEdge::None,
        }
    }
}
