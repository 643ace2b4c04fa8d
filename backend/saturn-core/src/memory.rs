//! Flat storage for the IPL ROM, the two WRAM banks, and the always-present internal backup RAM
//! (spec.md §4.7, §6.3).
//!
//! Grounded on the teacher's `BoxedByteArray`/`BoxedWordArray` usage (`s32x-core::core::Sega32X`
//! boxes its SDRAM the same way): large fixed-size buffers are heap-allocated up front so neither
//! the stack nor the save-state decoder ever has to copy them through a temporary.

use bincode::{Decode, Encode};
use sat_common::boxedarray::BoxedByteArray;

/// 512 KiB; the Saturn's initial program loader.
pub const IPL_SIZE: usize = 512 * 1024;
/// "Low" work RAM, always present, 1 MiB.
pub const WRAM_LOW_SIZE: usize = 1024 * 1024;
/// "High" work RAM, always present, 1 MiB.
pub const WRAM_HIGH_SIZE: usize = 1024 * 1024;
/// 256-Kbit (32 KiB) internal backup SRAM, always present regardless of cartridge slot contents
/// (§6.3 "Backup memory image").
pub const INTERNAL_BACKUP_SIZE: usize = 32 * 1024;

#[derive(Clone, Encode, Decode)]
pub struct Memory {
    pub ipl: BoxedByteArray<IPL_SIZE>,
    pub wram_low: BoxedByteArray<WRAM_LOW_SIZE>,
    pub wram_high: BoxedByteArray<WRAM_HIGH_SIZE>,
    pub internal_backup: BoxedByteArray<INTERNAL_BACKUP_SIZE>,
    pub ipl_loaded: bool,
    backup_dirty: bool,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ipl: BoxedByteArray::new(),
            wram_low: BoxedByteArray::new(),
            wram_high: BoxedByteArray::new(),
            internal_backup: BoxedByteArray::new(),
            ipl_loaded: false,
            backup_dirty: false,
        }
    }

    pub fn load_ipl(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(IPL_SIZE);
        self.ipl[..len].copy_from_slice(&bytes[..len]);
        self.ipl_loaded = true;
        log::info!("Loaded IPL ROM ({len} bytes)");
    }

    /// Restores a persisted backup RAM image (§6.3), e.g. loaded via [`sat_common::frontend::SaveWriter`].
    pub fn load_backup_ram(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(INTERNAL_BACKUP_SIZE);
        self.internal_backup[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn write_internal_backup_byte(&mut self, offset: usize, value: u8) {
        if offset < INTERNAL_BACKUP_SIZE {
            self.internal_backup[offset] = value;
            self.backup_dirty = true;
        }
    }

    pub fn get_and_clear_backup_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.backup_dirty, false)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").field("ipl_loaded", &self.ipl_loaded).finish_non_exhaustive()
    }
}
