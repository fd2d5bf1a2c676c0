//! Board-agnostic core logic for the rotation base firmware
//!
//! This crate contains the motion and process timing engine, free of any
//! specific hardware implementation:
//!
//! - Step pulse generation shared with the timer interrupt
//! - Velocity ramps and the soft-reverse sequence
//! - Reverse trigger policies (time interval, turn count)
//! - Multi-step session scheduling with temperature compensation
//! - Controller wiring, status snapshots and edge events
//! - Hardware abstraction traits and configuration types

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod controller;
pub mod motion;
pub mod session;
pub mod state;
pub mod traits;
