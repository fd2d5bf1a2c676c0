//! Motion control
//!
//! Step pulse generation, velocity ramps and the periodic reverse policy.

pub mod pulse;
pub mod ramp;
pub mod reverse;

pub use pulse::{PulseCommand, PulseDriver, PulseGenerator, PulseWatchdog};
pub use ramp::{RampEngine, RampPhase, RampState};
pub use reverse::ReverseTrigger;
