//! Session configuration
//!
//! A session is an ordered list of process steps together with the
//! profile-level defaults the steps inherit from.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum steps per session
pub const MAX_STEPS: usize = 10;

/// Maximum step name length
pub const STEP_NAME_LEN: usize = 12;

/// Maximum profile name length
pub const PROFILE_NAME_LEN: usize = 16;

/// Default global RPM
pub const DEFAULT_RPM: f32 = 30.0;

/// Longest accepted step; longer durations are clamped to this
pub const MAX_STEP_DURATION_S: u32 = 24 * 60 * 60;

/// What the temperature coefficient scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TempCoefTarget {
    /// Step duration only
    #[default]
    Timer,
    /// Step RPM only
    Rpm,
    /// Duration and RPM
    Both,
}

impl TempCoefTarget {
    pub fn scales_timer(self) -> bool {
        matches!(self, TempCoefTarget::Timer | TempCoefTarget::Both)
    }

    pub fn scales_rpm(self) -> bool {
        matches!(self, TempCoefTarget::Rpm | TempCoefTarget::Both)
    }
}

/// Temperature coefficient settings
///
/// `multiplier = 1 + (measured - base_c) * percent / 100`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TempCoef {
    pub enabled: bool,
    /// Baseline temperature (°C) at which the multiplier is 1
    pub base_c: f32,
    /// Percent change per °C
    pub percent: f32,
    pub target: TempCoefTarget,
}

impl Default for TempCoef {
    fn default() -> Self {
        Self {
            enabled: false,
            base_c: 20.0,
            percent: 10.0,
            target: TempCoefTarget::Timer,
        }
    }
}

/// Action taken when the temperature leaves the limit band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AlarmAction {
    /// Display only
    None,
    /// Audible warning, session continues
    #[default]
    Beep,
    /// Pause mid-step
    Pause,
    /// Abort the session
    Stop,
}

/// Temperature limit band
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TempLimits {
    pub enabled: bool,
    pub min_c: f32,
    pub max_c: f32,
}

impl Default for TempLimits {
    fn default() -> Self {
        Self {
            enabled: false,
            min_c: 18.0,
            max_c: 24.0,
        }
    }
}

/// When periodic reverses are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReverseMode {
    Off,
    /// Every `interval` seconds of motion
    #[default]
    TimeInterval,
    /// Every `interval` revolutions
    TurnCount,
}

/// Periodic reverse policy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReversePolicy {
    pub mode: ReverseMode,
    /// Seconds or revolutions, depending on `mode`
    pub interval: f32,
}

impl Default for ReversePolicy {
    fn default() -> Self {
        Self {
            mode: ReverseMode::TimeInterval,
            interval: 10.0,
        }
    }
}

impl ReversePolicy {
    pub const fn off() -> Self {
        Self {
            mode: ReverseMode::Off,
            interval: 0.0,
        }
    }

    /// True if this policy can ever fire
    pub fn is_armed(&self) -> bool {
        self.mode != ReverseMode::Off && self.interval > 0.0
    }
}

/// One timed phase of a session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionStep {
    /// Display name (empty shows as "Step N")
    pub name: String<STEP_NAME_LEN>,
    /// Duration in seconds, 0 = manual advance
    pub duration_s: u32,
    /// Target RPM, 0 = use the global RPM
    pub rpm: f32,
    /// Display-only temperature target (°C)
    pub temp_target_c: Option<f32>,
    /// Display-only tolerance around the target (°C)
    pub temp_bias_c: Option<f32>,
    /// Overrides the profile temperature coefficient when set
    pub temp_coef: Option<TempCoef>,
    /// Overrides the profile alarm action when set
    pub alarm_action: Option<AlarmAction>,
}

impl Default for SessionStep {
    fn default() -> Self {
        Self {
            name: String::new(),
            duration_s: 0,
            rpm: 0.0,
            temp_target_c: None,
            temp_bias_c: None,
            temp_coef: None,
            alarm_action: None,
        }
    }
}

impl SessionStep {
    /// A step running for `duration_s` at `rpm`
    pub fn timed(duration_s: u32, rpm: f32) -> Self {
        Self {
            duration_s,
            rpm,
            ..Default::default()
        }
    }

    /// True for a step that only ends on a manual advance
    pub fn is_manual(&self) -> bool {
        self.duration_s == 0
    }

    fn clamped(mut self) -> Self {
        self.duration_s = self.duration_s.min(MAX_STEP_DURATION_S);
        self
    }
}

/// Errors from editing the step list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// More than `MAX_STEPS` steps
    TooManySteps,
    /// A session needs at least one step
    NoSteps,
    /// Step index past the end of the list
    InvalidIndex,
}

/// Session settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionSettings {
    /// Profile name (empty = unnamed)
    pub profile_name: String<PROFILE_NAME_LEN>,
    /// Process steps, 1..=MAX_STEPS
    steps: Vec<SessionStep, MAX_STEPS>,
    /// RPM used by steps that declare none
    pub global_rpm: f32,
    pub reverse: ReversePolicy,
    /// Profile-level temperature coefficient
    pub temp_coef: TempCoef,
    /// Profile-level alarm action
    pub alarm_action: AlarmAction,
    pub temp_limits: TempLimits,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let mut steps = Vec::new();
        let _ = steps.push(SessionStep::default());
        Self {
            profile_name: String::new(),
            steps,
            global_rpm: DEFAULT_RPM,
            reverse: ReversePolicy::default(),
            temp_coef: TempCoef::default(),
            alarm_action: AlarmAction::Beep,
            temp_limits: TempLimits::default(),
        }
    }
}

impl SessionSettings {
    /// Settings running `steps` with profile defaults
    pub fn with_steps(steps: &[SessionStep]) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        settings.set_steps(steps)?;
        Ok(settings)
    }

    pub fn steps(&self) -> &[SessionStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&SessionStep> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Replace the whole step list
    pub fn set_steps(&mut self, steps: &[SessionStep]) -> Result<(), SettingsError> {
        if steps.is_empty() {
            return Err(SettingsError::NoSteps);
        }
        if steps.len() > MAX_STEPS {
            return Err(SettingsError::TooManySteps);
        }
        self.steps = steps.iter().cloned().map(SessionStep::clamped).collect();
        Ok(())
    }

    /// Append a step
    pub fn push_step(&mut self, step: SessionStep) -> Result<(), SettingsError> {
        self.steps
            .push(step.clamped())
            .map_err(|_| SettingsError::TooManySteps)
    }

    /// Overwrite the step at `index`
    pub fn replace_step(&mut self, index: usize, step: SessionStep) -> Result<(), SettingsError> {
        let slot = self
            .steps
            .get_mut(index)
            .ok_or(SettingsError::InvalidIndex)?;
        *slot = step.clamped();
        Ok(())
    }

    /// Remove a step, keeping at least one
    pub fn remove_step(&mut self, index: usize) -> Result<SessionStep, SettingsError> {
        if index >= self.steps.len() {
            return Err(SettingsError::InvalidIndex);
        }
        if self.steps.len() == 1 {
            return Err(SettingsError::NoSteps);
        }
        Ok(self.steps.remove(index))
    }

    /// Sum of nominal step durations (seconds), ignoring compensation
    pub fn total_duration_s(&self) -> u32 {
        self.steps
            .iter()
            .map(|s| s.duration_s)
            .fold(0, u32::saturating_add)
    }

    /// Clamp out-of-range values that arrived without going through the
    /// step editors (e.g. decoded from storage)
    pub fn sanitize(&mut self) {
        for step in self.steps.iter_mut() {
            step.duration_s = step.duration_s.min(MAX_STEP_DURATION_S);
        }
    }
}
