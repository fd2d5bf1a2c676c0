//! Configuration persistence
//!
//! The motion profile and session settings travel together as one
//! versioned postcard record. On boot the caller falls back to defaults
//! when nothing usable is stored.

use defmt::*;
use serde::{Deserialize, Serialize};

use dervish_core::config::{MotionProfile, SessionSettings, RPM_MAX, RPM_MIN};
use dervish_core::traits::SettingsStore;
use dervish_hal_rp2040::flash::{FlashError, Rp2040FlashStorage, StorageKey, MAX_ITEM_SIZE};
use dervish_hal_rp2040::FlashStorageTrait;

/// Layout of [`StoredConfig`]; bump on any field change
pub const CONFIG_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    Flash(FlashError),
    /// Record does not fit in `MAX_ITEM_SIZE`
    Serialize,
    Deserialize,
    /// Written by a firmware with a different layout
    VersionMismatch,
    /// Decoded fine but holds unusable values
    Invalid,
}

impl From<FlashError> for ConfigError {
    fn from(e: FlashError) -> Self {
        ConfigError::Flash(e)
    }
}

/// On-flash configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConfig {
    pub version: u8,
    pub profile: MotionProfile,
    pub settings: SessionSettings,
}

impl StoredConfig {
    pub fn new(profile: MotionProfile, settings: SessionSettings) -> Self {
        Self {
            version: CONFIG_VERSION,
            profile,
            settings,
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        let rpm = self.settings.global_rpm;
        if self.settings.step_count() == 0 || !(RPM_MIN..=RPM_MAX).contains(&rpm) {
            return Err(ConfigError::Invalid);
        }
        Ok(())
    }
}

/// Flash-backed [`SettingsStore`]
pub struct ConfigPersistence<'d> {
    storage: Rp2040FlashStorage<'d>,
    buffer: [u8; MAX_ITEM_SIZE],
}

impl<'d> ConfigPersistence<'d> {
    pub fn new(storage: Rp2040FlashStorage<'d>) -> Self {
        Self {
            storage,
            buffer: [0; MAX_ITEM_SIZE],
        }
    }

    async fn fetch(&mut self) -> Result<StoredConfig, ConfigError> {
        let len = self
            .storage
            .read(StorageKey::StoredConfig, &mut self.buffer)
            .await?;
        debug!("Config record: {} bytes", len);

        let config: StoredConfig =
            postcard::from_bytes(&self.buffer[..len]).map_err(|_| ConfigError::Deserialize)?;
        config.check()?;
        Ok(config)
    }

    /// Load the stored record
    ///
    /// A record from an older layout is wiped so it cannot shadow the
    /// next save.
    pub async fn load_config(&mut self) -> Result<StoredConfig, ConfigError> {
        match self.fetch().await {
            Ok(config) => {
                log_config_summary(&config);
                Ok(config)
            }
            Err(ConfigError::VersionMismatch) => {
                warn!("Stored config has an old layout, erasing");
                self.storage.erase_all().await?;
                Err(ConfigError::VersionMismatch)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save_config(&mut self, config: &StoredConfig) -> Result<(), ConfigError> {
        let bytes =
            postcard::to_slice(config, &mut self.buffer).map_err(|_| ConfigError::Serialize)?;
        debug!("Saving config: {} bytes", bytes.len());
        self.storage.write(StorageKey::StoredConfig, bytes).await?;
        Ok(())
    }
}

impl SettingsStore for ConfigPersistence<'_> {
    type Error = ConfigError;

    async fn load(&mut self) -> Result<(MotionProfile, SessionSettings), ConfigError> {
        let config = self.load_config().await?;
        Ok((config.profile, config.settings))
    }

    async fn save(
        &mut self,
        profile: &MotionProfile,
        settings: &SessionSettings,
    ) -> Result<(), ConfigError> {
        self.save_config(&StoredConfig::new(*profile, settings.clone()))
            .await
    }
}

fn log_config_summary(config: &StoredConfig) {
    info!(
        "Config loaded: {} steps, {} s total, {} rpm",
        config.settings.step_count(),
        config.settings.total_duration_s(),
        config.settings.global_rpm
    );
    debug!(
        "  {} steps/rev x {} microsteps, offset {} C",
        config.profile.steps_per_rev, config.profile.microsteps, config.profile.temp_offset_c
    );
}
