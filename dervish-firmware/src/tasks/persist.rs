//! Settings persistence task
//!
//! Saves configuration changes to flash once edits have been quiet for
//! [`SAVE_DEBOUNCE_MS`], so a burst of edits costs a single flash write.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::Timer;

use dervish_core::traits::SettingsStore;

use crate::channels::SETTINGS_CHANGED;
use crate::config::ConfigPersistence;

/// Quiet time before a change is written (ms)
pub const SAVE_DEBOUNCE_MS: u64 = 2000;

/// Persist task - writes the latest settings snapshot after edits settle
#[embassy_executor::task]
pub async fn persist_task(mut store: ConfigPersistence<'static>) {
    info!("Persist task started");

    loop {
        let mut latest = SETTINGS_CHANGED.wait().await;

        // Restart the quiet period on every newer snapshot
        loop {
            match select(Timer::after_millis(SAVE_DEBOUNCE_MS), SETTINGS_CHANGED.wait()).await {
                Either::First(()) => break,
                Either::Second(newer) => latest = newer,
            }
        }

        let (profile, settings) = latest;
        match store.save(&profile, &settings).await {
            Ok(()) => info!("Settings saved"),
            Err(e) => warn!("Failed to save settings: {:?}", e),
        }
    }
}
