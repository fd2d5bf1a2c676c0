//! Status reporting
//!
//! A read-only snapshot of the machine taken every control tick, and the
//! edge events derived from consecutive snapshots.

pub mod events;
pub mod status;

pub use events::{Event, Events, MAX_EVENTS};
pub use status::Status;
