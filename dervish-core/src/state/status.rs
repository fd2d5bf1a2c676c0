//! Read-only status snapshot

use crate::config::AlarmAction;
use crate::motion::RampPhase;
use crate::session::{AlarmFlags, SessionMode};
use crate::traits::Direction;

/// Everything collaborators may report about the machine
///
/// Taken once per control tick; consecutive snapshots are diffed into
/// [`Event`](super::Event)s.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub mode: SessionMode,
    /// Active step (0-based)
    pub step_index: u8,
    pub step_count: u8,
    pub step_remaining_s: u32,
    /// Current step plus all later steps
    pub total_remaining_s: u32,
    /// Signed step rate (steps/s)
    pub velocity_sps: f32,
    /// Unsigned speed
    pub rpm: f32,
    pub direction: Direction,
    pub ramp_phase: RampPhase,
    pub temperature_c: Option<f32>,
    pub alarm: AlarmFlags,
    /// Action executed for the alarm in force
    pub alarm_action: Option<AlarmAction>,
    /// Steps completed by their timer (wrapping)
    pub steps_finished: u16,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            mode: SessionMode::Idle,
            step_index: 0,
            step_count: 1,
            step_remaining_s: 0,
            total_remaining_s: 0,
            velocity_sps: 0.0,
            rpm: 0.0,
            direction: Direction::Clockwise,
            ramp_phase: RampPhase::Steady,
            temperature_c: None,
            alarm: AlarmFlags::default(),
            alarm_action: None,
            steps_finished: 0,
        }
    }
}

impl Status {
    pub fn is_running(&self) -> bool {
        self.mode == SessionMode::Running
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self.mode,
            SessionMode::PausedMidStep | SessionMode::PausedBetweenSteps
        )
    }
}
