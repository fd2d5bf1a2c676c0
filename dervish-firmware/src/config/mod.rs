//! Configuration persistence
//!
//! The motion profile and session settings live in flash as one postcard
//! record. Defaults from `dervish-core` apply when flash holds nothing
//! valid.

pub mod loader;

pub use loader::{ConfigError, ConfigPersistence, StoredConfig};
