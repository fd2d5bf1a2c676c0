//! Persistent settings store trait

use core::future::Future;

use crate::config::{MotionProfile, SessionSettings};

/// Loads and saves the persisted configuration
///
/// Storage format and location are up to the implementation. Methods are
/// async so flash I/O never runs inside the control tick.
pub trait SettingsStore {
    type Error;

    /// Load the saved profile and settings
    fn load(&mut self)
        -> impl Future<Output = Result<(MotionProfile, SessionSettings), Self::Error>>;

    /// Save the profile and settings
    fn save(
        &mut self,
        profile: &MotionProfile,
        settings: &SessionSettings,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}
