//! Persistent key-value storage
//!
//! The rotation base keeps a single configuration record in flash. Chip HALs
//! provide the wear-levelled map behind [`FlashStorage`].

use core::future::Future;

/// Record slots in the config partition
///
/// The byte value is what lands on flash, so a slot number is never reused
/// for a different payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Motion profile plus session settings
    StoredConfig = 0x01,
}

impl StorageKey {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(StorageKey::StoredConfig),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Low-level erase/program failure
    Flash,
    /// Nothing stored under the key
    NotFound,
    /// Record larger than the caller's buffer
    BufferTooSmall,
    /// Map metadata failed its checks
    Corrupted,
    /// No room left after garbage collection
    Full,
    /// Any other storage-layer failure
    Storage,
}

/// Wear-levelled record storage
pub trait FlashStorage {
    /// Copy the latest record for `key` into `buffer`, returning its length
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl Future<Output = Result<usize, FlashError>>;

    /// Append a new record for `key`, superseding older ones
    fn write(&mut self, key: StorageKey, data: &[u8]) -> impl Future<Output = Result<(), FlashError>>;

    /// Wipe the partition, dropping every record
    fn erase_all(&mut self) -> impl Future<Output = Result<(), FlashError>>;
}

#[cfg(feature = "sequential-storage")]
mod map_key {
    use super::StorageKey;
    use sequential_storage::map::{Key, SerializationError};

    impl Key for StorageKey {
        fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
            let slot = buffer.first_mut().ok_or(SerializationError::BufferTooSmall)?;
            *slot = self.as_u8();
            Ok(1)
        }

        fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
            let byte = buffer.first().ok_or(SerializationError::BufferTooSmall)?;
            StorageKey::from_u8(*byte)
                .map(|key| (key, 1))
                .ok_or(SerializationError::InvalidFormat)
        }
    }
}
