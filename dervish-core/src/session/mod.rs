//! Session scheduling
//!
//! Runs an ordered list of process steps with pause-at-boundary semantics,
//! scaling step RPM and duration by the measured temperature and reacting
//! to temperature limit alarms.

pub mod alarm;
pub mod compensation;
pub mod scheduler;

pub use alarm::{AlarmEdge, AlarmFlags, TempAlarm};
pub use compensation::{adjusted_duration_s, adjusted_rpm};
pub use scheduler::{MotorDemand, SessionMode, SessionScheduler};
