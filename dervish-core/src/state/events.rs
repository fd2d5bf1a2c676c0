//! Edge events derived from consecutive status snapshots

use heapless::Vec;

use super::status::Status;
use crate::config::AlarmAction;
use crate::session::{AlarmFlags, SessionMode};

/// Most events a single tick can produce
pub const MAX_EVENTS: usize = 4;

/// Events produced by one tick
pub type Events = Vec<Event, MAX_EVENTS>;

/// Discrete transitions for UI and buzzer collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A step ran out its timer
    StepFinished { index: u8 },
    /// The session returned to Idle
    SessionEnded,
    /// Temperature left the limit band
    AlarmStarted {
        flags: AlarmFlags,
        /// Action executed, `None` if the session was not running
        action: Option<AlarmAction>,
    },
    /// Temperature back inside the limit band
    AlarmCleared,
}

impl Event {
    /// Events between two snapshots, in the order they happened
    pub fn diff(prev: &Status, next: &Status) -> Events {
        let mut events = Events::new();

        // The alarm is evaluated before step timing within a tick
        if !prev.alarm.active() && next.alarm.active() {
            let _ = events.push(Event::AlarmStarted {
                flags: next.alarm,
                action: next.alarm_action,
            });
        }
        if prev.alarm.active() && !next.alarm.active() {
            let _ = events.push(Event::AlarmCleared);
        }
        if next.steps_finished != prev.steps_finished {
            let _ = events.push(Event::StepFinished {
                index: prev.step_index,
            });
        }
        if prev.mode != SessionMode::Idle && next.mode == SessionMode::Idle {
            let _ = events.push(Event::SessionEnded);
        }

        events
    }

    pub fn is_alarm(&self) -> bool {
        matches!(self, Event::AlarmStarted { .. } | Event::AlarmCleared)
    }

    /// Whether the buzzer should sound for this event
    pub fn wants_attention(&self) -> bool {
        match self {
            Event::StepFinished { .. } | Event::SessionEnded => true,
            Event::AlarmStarted { action, .. } => {
                !matches!(action, None | Some(AlarmAction::None))
            }
            Event::AlarmCleared => false,
        }
    }
}
