//! Session scheduler
//!
//! Tracks the active step and its elapsed time. Elapsed time is an
//! accumulator advanced only while running, so time spent paused never
//! counts toward a step.
//!
//! ```text
//!            start / toggle                 step done, more left
//!   Idle ───────────────────▶ Running ─────────────────────────▶ PausedBetweenSteps
//!    ▲                         │   ▲                                    │
//!    │ last step done / stop   │   │ toggle                             │ toggle / next
//!    └─────────────────────────┘   │                                    ▼
//!                        toggle ▼  │                            Running (next step)
//!                          PausedMidStep
//! ```

use super::alarm::{AlarmEdge, AlarmFlags, TempAlarm};
use super::compensation::{adjusted_duration_s, adjusted_rpm};
use crate::config::{AlarmAction, ReversePolicy, SessionSettings, SessionStep};

/// Session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionMode {
    #[default]
    Idle,
    Running,
    /// Paused by the user or an alarm; the step timer is kept
    PausedMidStep,
    /// Step finished, waiting for the user to continue
    PausedBetweenSteps,
}

/// What the scheduler wants from the motor this tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorDemand {
    pub run: bool,
    pub rpm: f32,
    pub reverse: ReversePolicy,
}

/// Multi-step session scheduler
#[derive(Debug, Clone)]
pub struct SessionScheduler {
    settings: SessionSettings,
    mode: SessionMode,
    step_index: usize,
    /// Time run in the current step (ms)
    elapsed_ms: u32,
    /// Last valid temperature reading
    temperature: Option<f32>,
    alarm: TempAlarm,
    /// Action executed for the alarm currently in force
    alarm_action: Option<AlarmAction>,
    /// Steps completed by their timer since boot (wrapping)
    steps_finished: u16,
}

impl SessionScheduler {
    pub fn new(mut settings: SessionSettings) -> Self {
        settings.sanitize();
        Self {
            settings,
            mode: SessionMode::Idle,
            step_index: 0,
            elapsed_ms: 0,
            temperature: None,
            alarm: TempAlarm::default(),
            alarm_action: None,
            steps_finished: 0,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Replace the settings
    ///
    /// A running session keeps going unless its step no longer exists.
    pub fn set_settings(&mut self, mut settings: SessionSettings) {
        settings.sanitize();
        self.settings = settings;
        if self.step_index >= self.settings.step_count() {
            self.stop();
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.mode == SessionMode::Running
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn step_count(&self) -> usize {
        self.settings.step_count()
    }

    pub fn current_step(&self) -> Option<&SessionStep> {
        self.settings.step(self.step_index)
    }

    /// Time run in the current step (ms)
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn alarm_flags(&self) -> AlarmFlags {
        self.alarm.flags()
    }

    /// Action taken for the alarm in force, if any
    pub fn alarm_action(&self) -> Option<AlarmAction> {
        self.alarm_action
    }

    pub fn steps_finished(&self) -> u16 {
        self.steps_finished
    }

    /// Start the session
    ///
    /// From `PausedBetweenSteps` the same step runs again with a fresh
    /// timer; otherwise the session starts over from the first step.
    pub fn start(&mut self) {
        if self.mode != SessionMode::PausedBetweenSteps {
            self.step_index = 0;
        }
        self.elapsed_ms = 0;
        self.mode = SessionMode::Running;
    }

    /// Pause, resume or continue past a step boundary
    pub fn toggle_run(&mut self) {
        match self.mode {
            SessionMode::Running => self.mode = SessionMode::PausedMidStep,
            SessionMode::PausedBetweenSteps => self.advance(),
            SessionMode::Idle | SessionMode::PausedMidStep => self.mode = SessionMode::Running,
        }
    }

    /// Skip to the next step, or end the session after the last one
    pub fn next_step(&mut self) {
        if self.mode != SessionMode::Idle {
            self.advance();
        }
    }

    /// Back to Idle at the first step
    pub fn stop(&mut self) {
        self.mode = SessionMode::Idle;
        self.step_index = 0;
        self.elapsed_ms = 0;
    }

    fn advance(&mut self) {
        if self.step_index + 1 < self.settings.step_count() {
            self.step_index += 1;
            self.elapsed_ms = 0;
            self.mode = SessionMode::Running;
        } else {
            self.stop();
        }
    }

    /// Advance by `dt_ms` with the latest temperature reading
    ///
    /// Returns the alarm action executed this tick, if any.
    pub fn tick(&mut self, dt_ms: u32, temp_c: Option<f32>) -> Option<AlarmAction> {
        self.temperature = temp_c.filter(|t| t.is_finite());

        let executed = match self.alarm.update(&self.settings.temp_limits, self.temperature) {
            AlarmEdge::Rising if self.mode == SessionMode::Running => {
                let action = self.resolve_alarm_action();
                match action {
                    AlarmAction::None | AlarmAction::Beep => {}
                    AlarmAction::Pause => self.toggle_run(),
                    AlarmAction::Stop => self.stop(),
                }
                self.alarm_action = Some(action);
                Some(action)
            }
            AlarmEdge::Falling => {
                self.alarm_action = None;
                None
            }
            _ => None,
        };

        if self.mode == SessionMode::Running {
            let duration_s = self.step_duration_s(self.step_index);
            if duration_s > 0 {
                self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
                if self.elapsed_ms >= duration_s.saturating_mul(1000) {
                    self.finish_step();
                }
            }
        }

        executed
    }

    fn finish_step(&mut self) {
        self.elapsed_ms = 0;
        self.steps_finished = self.steps_finished.wrapping_add(1);
        if self.step_index + 1 < self.settings.step_count() {
            self.mode = SessionMode::PausedBetweenSteps;
        } else {
            self.stop();
        }
    }

    fn resolve_alarm_action(&self) -> AlarmAction {
        match self.current_step() {
            Some(step) => AlarmAction::resolve(step, self.settings.alarm_action),
            None => self.settings.alarm_action,
        }
    }

    /// Temperature-adjusted duration of step `index` (seconds, 0 = manual)
    pub fn step_duration_s(&self, index: usize) -> u32 {
        self.settings
            .step(index)
            .map(|step| adjusted_duration_s(step, &self.settings, self.temperature))
            .unwrap_or(0)
    }

    /// Temperature-adjusted RPM of the current step
    pub fn effective_rpm(&self) -> f32 {
        match self.current_step() {
            Some(step) => adjusted_rpm(step, &self.settings, self.temperature),
            None => self.settings.global_rpm,
        }
    }

    /// Seconds left in the current step (rounded up)
    pub fn step_remaining_s(&self) -> u32 {
        if self.mode == SessionMode::PausedBetweenSteps {
            return 0;
        }
        let total_ms = self.step_duration_s(self.step_index).saturating_mul(1000);
        total_ms.saturating_sub(self.elapsed_ms).div_ceil(1000)
    }

    /// Seconds left in the current and all later steps
    pub fn total_remaining_s(&self) -> u32 {
        (self.step_index + 1..self.settings.step_count())
            .map(|i| self.step_duration_s(i))
            .fold(self.step_remaining_s(), u32::saturating_add)
    }

    /// Run flag, RPM and reverse policy for the ramp engine
    pub fn motor_demand(&self) -> MotorDemand {
        MotorDemand {
            run: self.is_running(),
            rpm: self.effective_rpm(),
            reverse: self.settings.reverse,
        }
    }
}

impl Default for SessionScheduler {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}
