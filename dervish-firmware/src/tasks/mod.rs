//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod buzzer;
pub mod control;
pub mod persist;
pub mod temperature;

pub use buzzer::buzzer_task;
pub use control::control_task;
pub use persist::persist_task;
pub use temperature::temperature_task;
