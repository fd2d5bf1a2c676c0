//! Configuration types
//!
//! Board-agnostic configuration structures, persisted by the firmware as
//! postcard binary data.

pub mod motion;
pub mod session;

pub use motion::*;
pub use session::*;
