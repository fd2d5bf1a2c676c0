//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use dervish_core::config::{MotionProfile, SessionSettings};
use dervish_core::controller::Command;
use dervish_core::state::{Event, Status};

/// Channel capacity for commands from the transport layer
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for controller events
const EVENT_CHANNEL_SIZE: usize = 8;

/// Commands for the controller (buttons, UI, remote transport)
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Command, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Edge events from the controller (buzzer, UI)
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, Event, EVENT_CHANNEL_SIZE> =
    Channel::new();

/// Latest thermistor reading in °C, before calibration offset
/// `None` for a sensor fault
pub static TEMP_READING: Signal<CriticalSectionRawMutex, Option<f32>> = Signal::new();

/// Status snapshot published every control tick
pub static STATUS: Signal<CriticalSectionRawMutex, Status> = Signal::new();

/// Configuration to persist, signalled on every settings change
///
/// Later snapshots replace earlier ones that were not yet saved.
pub static SETTINGS_CHANGED: Signal<CriticalSectionRawMutex, (MotionProfile, SessionSettings)> =
    Signal::new();
