//! Temperature compensation
//!
//! A warmer bath speeds the process up, so a step's duration shrinks and/or
//! its RPM is scaled by `1 + (t - base) * percent / 100`.

use crate::config::{SessionSettings, SessionStep, TempCoef, RPM_MAX, RPM_MIN};

/// Multiplier bounds, keeping a runaway reading from zeroing or inverting
/// the scaled values
pub const MIN_MULTIPLIER: f32 = 0.1;
pub const MAX_MULTIPLIER: f32 = 10.0;

impl TempCoef {
    /// Coefficient in force for `step`: its own override, else the profile
    /// default
    pub fn resolve(step: &SessionStep, profile: &TempCoef) -> TempCoef {
        step.temp_coef.unwrap_or(*profile)
    }

    /// Scale factor at `temp_c`; 1.0 when disabled or the reading is unknown
    pub fn multiplier(&self, temp_c: Option<f32>) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        match temp_c {
            Some(t) if t.is_finite() => {
                let m = 1.0 + (t - self.base_c) * self.percent / 100.0;
                if m.is_finite() {
                    m.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }
}

/// Step RPM after compensation, clamped to `[RPM_MIN, RPM_MAX]`
///
/// A step without its own RPM runs at the global RPM.
pub fn adjusted_rpm(step: &SessionStep, settings: &SessionSettings, temp_c: Option<f32>) -> f32 {
    let base = if step.rpm > 0.0 {
        step.rpm
    } else {
        settings.global_rpm
    };
    let coef = TempCoef::resolve(step, &settings.temp_coef);
    let rpm = if coef.target.scales_rpm() {
        base * coef.multiplier(temp_c)
    } else {
        base
    };
    if rpm.is_nan() {
        return RPM_MIN;
    }
    rpm.clamp(RPM_MIN, RPM_MAX)
}

/// Step duration after compensation (seconds), floored at 1
///
/// Manual steps stay at 0.
pub fn adjusted_duration_s(
    step: &SessionStep,
    settings: &SessionSettings,
    temp_c: Option<f32>,
) -> u32 {
    if step.is_manual() {
        return 0;
    }
    let coef = TempCoef::resolve(step, &settings.temp_coef);
    if !coef.target.scales_timer() {
        return step.duration_s;
    }
    let scaled = step.duration_s as f32 / coef.multiplier(temp_c);
    (scaled as u32).max(1)
}
