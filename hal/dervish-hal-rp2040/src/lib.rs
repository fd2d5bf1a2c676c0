//! RP2040-specific HAL for the rotation base firmware
//!
//! This crate provides RP2040 implementations of the shared `dervish-hal`
//! and `dervish-core` traits:
//!
//! - Flash storage driver (implements `dervish_hal::FlashStorage`)
//! - Step timer on TIMER alarm 1 (implements `dervish_core::traits::PulseTimer`)

#![no_std]

pub mod flash;
pub mod step_timer;

// Re-export shared traits from dervish-hal for convenience
pub use dervish_hal::{FlashStorage as FlashStorageTrait, StorageKey};
