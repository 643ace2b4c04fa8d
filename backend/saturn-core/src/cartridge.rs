//! Cartridge slot (spec.md §4.7, §6.1): none / DRAM expansion / ROM / backup-memory cartridge.
//!
//! Grounded on the teacher's `s32x-core::cartridge::Cartridge` (byte/word/longword accessors over
//! a mirrored ROM plus an optional RAM region) and `rom::mirror_to_next_power_of_two` for padding.

use bincode::{Decode, Encode};
use sat_common::rom;
use saturn_config::CartridgeVariant;

const DRAM_8MBIT_BYTES: usize = 8 * 1024 * 1024 / 8;
const DRAM_32MBIT_BYTES: usize = 32 * 1024 * 1024 / 8;
const DRAM_48MBIT_BYTES: usize = 48 * 1024 * 1024 / 8;

#[derive(Debug, Clone, Encode, Decode)]
pub enum Cartridge {
    None,
    Dram { ram: Vec<u8> },
    Rom { rom: Vec<u8> },
    BackupMemory { ram: Vec<u8> },
}

impl Cartridge {
    #[must_use]
    pub fn from_variant(variant: CartridgeVariant) -> Self {
        match variant {
            CartridgeVariant::None => Self::None,
            CartridgeVariant::Dram8Mbit => Self::Dram { ram: vec![0; DRAM_8MBIT_BYTES] },
            CartridgeVariant::Dram32Mbit => Self::Dram { ram: vec![0; DRAM_32MBIT_BYTES] },
            CartridgeVariant::Dram48Mbit => Self::Dram { ram: vec![0; DRAM_48MBIT_BYTES] },
            CartridgeVariant::Rom(mut bytes) => {
                rom::mirror_to_next_power_of_two(&mut bytes);
                Self::Rom { rom: bytes }
            }
            CartridgeVariant::BackupMemory(bytes) => Self::BackupMemory { ram: bytes },
        }
    }

    #[must_use]
    pub fn read_byte(&self, address: u32) -> u8 {
        match self {
            Self::None => 0xFF,
            Self::Dram { ram } | Self::BackupMemory { ram } => {
                ram[(address as usize) & (ram.len() - 1)]
            }
            Self::Rom { rom } => rom[(address as usize) & (rom.len() - 1)],
        }
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        match self {
            Self::None | Self::Rom { .. } => {}
            Self::Dram { ram } | Self::BackupMemory { ram } => {
                let len = ram.len();
                ram[(address as usize) & (len - 1)] = value;
            }
        }
    }

    #[must_use]
    pub fn id_byte(&self) -> u8 {
        match self {
            Self::None => 0xFF,
            Self::Dram { .. } => 0x5A,
            Self::Rom { .. } => 0xFF,
            Self::BackupMemory { .. } => 0x21,
        }
    }
}

impl Default for Cartridge {
    fn default() -> Self {
        Self::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dram_wraps_within_its_capacity() {
        let mut cart = Cartridge::from_variant(CartridgeVariant::Dram8Mbit);
        cart.write_byte(0, 0x42);
        assert_eq!(cart.read_byte(DRAM_8MBIT_BYTES as u32), 0x42);
    }

    #[test]
    fn rom_is_padded_to_a_power_of_two() {
        let cart = Cartridge::from_variant(CartridgeVariant::Rom(vec![1, 2, 3]));
        let Cartridge::Rom { rom } = &cart else { unreachable!() };
        assert!(rom.len().is_power_of_two());
    }
}
