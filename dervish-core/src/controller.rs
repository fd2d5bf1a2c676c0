//! Controller coordinating the scheduler, ramp engine and reverse trigger
//!
//! The controller is the single owner of the motion state. Every control
//! tick it:
//! - Feeds the latest temperature to the session scheduler
//! - Pushes the scheduler's run flag, RPM and reverse policy into the ramp
//!   engine and reverse trigger
//! - Advances the ramp, then lets the reverse trigger request a reverse
//! - Diffs the status snapshot into edge events
//!
//! Commands from the transport layer are applied between ticks and take
//! effect immediately.

use crate::config::{
    AlarmAction, MotionProfile, ReversePolicy, SessionSettings, SessionStep, SettingsError,
    TempCoef, TempLimits, RPM_MAX, RPM_MIN,
};
use crate::motion::{RampEngine, ReverseTrigger};
use crate::session::{SessionMode, SessionScheduler};
use crate::state::{Event, Events, Status};
use crate::traits::{StepperDriver, TemperatureSource};

/// Requests from the command/transport layer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Start the session (re-runs the current step from a step boundary)
    Start,
    /// Abort the session
    Stop,
    /// Pause, resume, or continue past a step boundary
    ToggleRun,
    /// Skip to the next step
    NextStep,
    /// `true` resumes a paused session or starts one, `false` stops
    SetRun(bool),
    /// Soft reverse now
    RequestReverse,
    /// Global RPM used by steps without their own
    SetTargetRpm(f32),
    SetReversePolicy(ReversePolicy),
    SetTempCoef(TempCoef),
    SetTempLimits(TempLimits),
    SetAlarmAction(AlarmAction),
    SetStep { index: u8, step: SessionStep },
    AddStep(SessionStep),
    RemoveStep(u8),
    /// Replace all session settings
    SetSettings(SessionSettings),
    SetMotionProfile(MotionProfile),
}

/// Result of applying a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandOutcome {
    /// Runtime change only
    Applied,
    /// Settings or profile changed and should be persisted
    ConfigChanged,
    /// Rejected; nothing changed
    Rejected(SettingsError),
}

/// Motion and session controller
pub struct Controller<D> {
    scheduler: SessionScheduler,
    ramp: RampEngine<D>,
    trigger: ReverseTrigger,
    last_status: Status,
}

impl<D: StepperDriver> Controller<D> {
    pub fn new(driver: D, profile: MotionProfile, settings: SessionSettings) -> Self {
        let trigger = ReverseTrigger::new(settings.reverse, profile.effective_steps_per_rev());
        let mut controller = Self {
            scheduler: SessionScheduler::new(settings),
            ramp: RampEngine::new(driver, profile),
            trigger,
            last_status: Status::default(),
        };
        controller.last_status = controller.status();
        controller
    }

    pub fn scheduler(&self) -> &SessionScheduler {
        &self.scheduler
    }

    pub fn ramp(&self) -> &RampEngine<D> {
        &self.ramp
    }

    pub fn trigger(&self) -> &ReverseTrigger {
        &self.trigger
    }

    pub fn settings(&self) -> &SessionSettings {
        self.scheduler.settings()
    }

    pub fn profile(&self) -> &MotionProfile {
        self.ramp.profile()
    }

    pub fn driver_mut(&mut self) -> &mut D {
        self.ramp.driver_mut()
    }

    /// Run one control tick of `dt_ms`
    pub fn tick<T: TemperatureSource>(&mut self, dt_ms: u32, sensor: &T) -> Events {
        let mode = self.scheduler.mode();
        self.scheduler.tick(dt_ms, sensor.reading());
        self.sync_motor(mode);

        self.ramp.tick(dt_ms);

        let velocity = self.ramp.velocity();
        let active = self.ramp.is_running();
        let ramp = &mut self.ramp;
        self.trigger
            .tick(dt_ms, velocity, active, || ramp.request_reverse());

        let status = self.status();
        let events = Event::diff(&self.last_status, &status);
        self.last_status = status;
        events
    }

    /// Apply a command from the transport layer
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        let mode = self.scheduler.mode();
        let outcome = match command {
            Command::Start => {
                self.scheduler.start();
                // A rerun of the same step is still a fresh start
                self.trigger.reset();
                CommandOutcome::Applied
            }
            Command::Stop | Command::SetRun(false) => {
                self.scheduler.stop();
                CommandOutcome::Applied
            }
            Command::SetRun(true) => {
                match self.scheduler.mode() {
                    SessionMode::Running => {}
                    SessionMode::PausedMidStep => self.scheduler.toggle_run(),
                    SessionMode::Idle | SessionMode::PausedBetweenSteps => {
                        self.scheduler.start();
                        self.trigger.reset();
                    }
                }
                CommandOutcome::Applied
            }
            Command::ToggleRun => {
                self.scheduler.toggle_run();
                CommandOutcome::Applied
            }
            Command::NextStep => {
                self.scheduler.next_step();
                self.trigger.reset();
                CommandOutcome::Applied
            }
            Command::RequestReverse => {
                if self.ramp.request_reverse() {
                    self.trigger.reset();
                }
                CommandOutcome::Applied
            }
            Command::SetTargetRpm(rpm) => self.edit_settings(|s| {
                s.global_rpm = if rpm.is_nan() {
                    RPM_MIN
                } else {
                    rpm.clamp(RPM_MIN, RPM_MAX)
                };
                Ok(())
            }),
            Command::SetReversePolicy(policy) => self.edit_settings(|s| {
                s.reverse = policy;
                Ok(())
            }),
            Command::SetTempCoef(coef) => self.edit_settings(|s| {
                s.temp_coef = coef;
                Ok(())
            }),
            Command::SetTempLimits(limits) => self.edit_settings(|s| {
                s.temp_limits = limits;
                Ok(())
            }),
            Command::SetAlarmAction(action) => self.edit_settings(|s| {
                s.alarm_action = action;
                Ok(())
            }),
            Command::SetStep { index, step } => {
                self.edit_settings(|s| s.replace_step(index as usize, step))
            }
            Command::AddStep(step) => self.edit_settings(|s| s.push_step(step)),
            Command::RemoveStep(index) => {
                self.edit_settings(|s| s.remove_step(index as usize).map(|_| ()))
            }
            Command::SetSettings(settings) => {
                if settings.step_count() == 0 {
                    CommandOutcome::Rejected(SettingsError::NoSteps)
                } else {
                    self.scheduler.set_settings(settings);
                    CommandOutcome::ConfigChanged
                }
            }
            Command::SetMotionProfile(profile) => {
                self.ramp.configure(profile);
                let policy = self.scheduler.settings().reverse;
                self.trigger
                    .configure(policy, profile.effective_steps_per_rev());
                CommandOutcome::ConfigChanged
            }
        };

        self.sync_motor(mode);
        outcome
    }

    /// Edit a copy of the settings and install it if the edit succeeds
    fn edit_settings<F>(&mut self, edit: F) -> CommandOutcome
    where
        F: FnOnce(&mut SessionSettings) -> Result<(), SettingsError>,
    {
        let mut settings = self.scheduler.settings().clone();
        match edit(&mut settings) {
            Ok(()) => {
                self.scheduler.set_settings(settings);
                CommandOutcome::ConfigChanged
            }
            Err(e) => CommandOutcome::Rejected(e),
        }
    }

    /// Push the scheduler's demand into the ramp engine and trigger
    fn sync_motor(&mut self, mode_before: SessionMode) {
        let demand = self.scheduler.motor_demand();

        if demand.reverse != *self.trigger.policy() {
            let steps = self.ramp.profile().effective_steps_per_rev();
            self.trigger.configure(demand.reverse, steps);
        } else if self.scheduler.mode() != mode_before {
            self.trigger.reset();
        }

        self.ramp.set_run(demand.run);
        if demand.run {
            self.ramp.set_target_rpm(demand.rpm);
        }
    }

    /// Snapshot for outward reporting
    pub fn status(&self) -> Status {
        let flags = self.scheduler.alarm_flags();
        Status {
            mode: self.scheduler.mode(),
            step_index: self.scheduler.step_index() as u8,
            step_count: self.scheduler.step_count() as u8,
            step_remaining_s: self.scheduler.step_remaining_s(),
            total_remaining_s: self.scheduler.total_remaining_s(),
            velocity_sps: self.ramp.velocity(),
            rpm: self.ramp.rpm(),
            direction: self.ramp.direction(),
            ramp_phase: self.ramp.phase(),
            temperature_c: self.scheduler.temperature(),
            alarm: flags,
            alarm_action: self.scheduler.alarm_action(),
            steps_finished: self.scheduler.steps_finished(),
        }
    }
}
