//! Hardware abstraction traits
//!
//! These traits define the seams between the motion/session logic and the
//! hardware or storage implementations behind it.

pub mod sensor;
pub mod stepper;
pub mod store;

pub use sensor::{SensorError, TemperatureSource};
pub use stepper::{Direction, PulseTimer, StepOutput, StepperDriver};
pub use store::SettingsStore;
