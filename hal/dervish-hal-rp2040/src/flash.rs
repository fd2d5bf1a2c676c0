//! RP2040 config partition
//!
//! A sequential-storage map in the last 64 KB of the on-board QSPI flash,
//! behind the `FlashStorage` trait from `dervish-hal`. The firmware image
//! must stay below `CONFIG_PARTITION_START` (see `memory.x`).

use core::ops::Range;

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use dervish_hal::flash::{FlashError, StorageKey};

/// Flash fitted to Pico-class boards
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024;
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

const CONFIG_RANGE: Range<u32> = (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Largest record stored under one key
pub const MAX_ITEM_SIZE: usize = 1024;

fn storage_error<E>(e: sequential_storage::Error<E>) -> FlashError {
    match e {
        sequential_storage::Error::Storage { .. } => FlashError::Flash,
        sequential_storage::Error::FullStorage => FlashError::Full,
        sequential_storage::Error::Corrupted { .. } => FlashError::Corrupted,
        _ => FlashError::Storage,
    }
}

pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
    scratch: [u8; MAX_ITEM_SIZE],
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
            scratch: [0; MAX_ITEM_SIZE],
        }
    }
}

impl dervish_hal::FlashStorage for Rp2040FlashStorage<'_> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let record = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut self.scratch,
            &key,
        )
        .await
        .map_err(storage_error)?
        .ok_or(FlashError::NotFound)?;

        let dest = buffer
            .get_mut(..record.len())
            .ok_or(FlashError::BufferTooSmall)?;
        dest.copy_from_slice(record);
        Ok(record.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        map::store_item(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut self.scratch,
            &key,
            &data,
        )
        .await
        .map_err(storage_error)
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(CONFIG_RANGE.start, CONFIG_RANGE.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}
