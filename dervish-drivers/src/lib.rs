//! Hardware driver implementations
//!
//! Concrete implementations of the traits defined in dervish-core, written
//! against `embedded-hal` 1.0 so they run on any chip:
//!
//! - Step/dir output for the step timer interrupt
//! - Temperature conversion (NTC thermistor)
//! - Buzzer patterns for session and alarm events

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod buzzer;
pub mod sensor;
pub mod stepper;
