//! The 29-bit SH-2 address space and the typed owners it routes to (spec.md §4.7, §6.3).
//!
//! Grounded on the teacher's `genesis-core::api::MainBus` (a per-tick struct borrowing individual
//! emulator fields, constructed fresh for each CPU step so the borrow checker never sees a whole
//! `&mut Saturn`) and `s32x-core`'s dual-CPU `Sh2Bus` (one bus type, an `is_master` flag picking
//! which half of shared peripherals a given core sees). `Bus` implements [`sh2_emu::bus::BusInterface`]
//! directly; addresses arrive pre-masked to the lowest 29 bits per that trait's contract.

use crate::cartridge::Cartridge;
use crate::cdblock::CdBlock;
use crate::memory::Memory;
use crate::scheduler::{Scheduler, SchedulerEvent};
use crate::scsp::Scsp;
use crate::scu::Scu;
use crate::smpc::Smpc;
use crate::vdp::Vdp;
use disc::Disc;
use sh2_emu::bus::BusInterface;

const IPL_BASE: u32 = 0x0000_0000;
const IPL_END: u32 = 0x000F_FFFF;
const SMPC_BASE: u32 = 0x0010_0000;
const SMPC_END: u32 = 0x0017_FFFF;
const BACKUP_BASE: u32 = 0x0018_0000;
const BACKUP_END: u32 = 0x001F_FFFF;
const WRAM_LOW_BASE: u32 = 0x0020_0000;
const WRAM_LOW_END: u32 = 0x003F_FFFF;
const CART_BASE: u32 = 0x0200_0000;
const CART_END: u32 = 0x04FF_FFFF;
const CDBLOCK_BASE: u32 = 0x0580_0000;
const CDBLOCK_END: u32 = 0x058F_FFFF;
const SCSP_BASE: u32 = 0x05A0_0000;
const SCSP_END: u32 = 0x05AF_FFFF;
const VDP1_VRAM_BASE: u32 = 0x05C0_0000;
const VDP1_VRAM_END: u32 = 0x05C7_FFFF;
const VDP1_FB_BASE: u32 = 0x05C8_0000;
const VDP1_FB_END: u32 = 0x05CF_FFFF;
const VDP1_REG_BASE: u32 = 0x05D0_0000;
const VDP1_REG_END: u32 = 0x05D7_FFFF;
const VDP2_VRAM_BASE: u32 = 0x05E0_0000;
const VDP2_VRAM_END: u32 = 0x05EF_FFFF;
const VDP2_CRAM_BASE: u32 = 0x05F0_0000;
const VDP2_CRAM_END: u32 = 0x05F0_0FFF;
const VDP2_REG_BASE: u32 = 0x05F8_0000;
const VDP2_REG_END: u32 = 0x05FB_FFFF;
/// Offset of the window register block within the VDP2 register window (spec.md §4.4's window
/// mask precomputation; layout not in `original_source`, see DESIGN.md).
const WINDOW_REG_OFFSET: u32 = 0x0100;
const SCU_REG_BASE: u32 = 0x05FE_0000;
const SCU_REG_END: u32 = 0x05FE_FFFF;
const WRAM_HIGH_BASE: u32 = 0x0600_0000;
const WRAM_HIGH_END: u32 = 0x07FF_FFFF;

/// Signals carried in from the emulator driver for a single CPU step, since neither is owned by
/// any bus-mapped device (spec.md §4.2's reset/DMA-request lines).
#[derive(Debug, Clone, Copy)]
pub struct BusSignals {
    pub reset: bool,
    pub interrupt_level: u8,
}

/// Borrows every bus-mapped component for the duration of one SH-2 `execute`/`tick_peripherals`
/// call. Constructed fresh per call via the `new_bus!` macro below rather than stored, so the
/// borrow checker sees only the fields actually touched (teacher's `new_main_bus!` pattern).
pub struct Bus<'a> {
    pub memory: &'a mut Memory,
    pub cartridge: &'a mut Cartridge,
    pub scu: &'a mut Scu,
    pub smpc: &'a mut Smpc,
    pub vdp: &'a mut Vdp,
    pub scsp: &'a mut Scsp,
    pub cdblock: &'a mut CdBlock,
    pub disc: &'a mut Option<Disc>,
    pub scheduler: &'a mut Scheduler,
    pub signals: BusSignals,
}

/// Constructs a [`Bus`] borrowing the needed fields out of a `Saturn`, mirroring the teacher's
/// `new_main_bus!` (a macro rather than a method so only the fields actually used are borrowed).
#[macro_export]
macro_rules! new_bus {
    ($self:expr, $signals:expr) => {
        $crate::bus::Bus {
            memory: &mut $self.memory,
            cartridge: &mut $self.cartridge,
            scu: &mut $self.scu,
            smpc: &mut $self.smpc,
            vdp: &mut $self.vdp,
            scsp: &mut $self.scsp,
            cdblock: &mut $self.cdblock,
            disc: &mut $self.disc,
            scheduler: &mut $self.scheduler,
            signals: $signals,
        }
    };
}

impl Bus<'_> {
    fn read_word_from_bytes(&mut self, address: u32) -> u16 {
        let hi = self.read_byte(address);
        let lo = self.read_byte(address | 1);
        u16::from_be_bytes([hi, lo])
    }

    fn write_word_as_bytes(&mut self, address: u32, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(address & !1, hi);
        self.write_byte(address | 1, lo);
    }
}

impl BusInterface for Bus<'_> {
    fn read_byte(&mut self, address: u32) -> u8 {
        match address {
            IPL_BASE..=IPL_END => self.memory.ipl[(address & 0x0007_FFFF) as usize],
            SMPC_BASE..=SMPC_END => self.smpc.read_byte(address & 0x7F),
            BACKUP_BASE..=BACKUP_END => {
                self.memory.internal_backup[(address & 0x0000_7FFF) as usize]
            }
            WRAM_LOW_BASE..=WRAM_LOW_END => self.memory.wram_low[(address & 0x000F_FFFF) as usize],
            CART_BASE..=CART_END => self.cartridge.read_byte(address - CART_BASE),
            CDBLOCK_BASE..=CDBLOCK_END => self.cdblock.read_byte(address - CDBLOCK_BASE),
            SCSP_BASE..=SCSP_END => {
                let offset = address - SCSP_BASE;
                if (offset as usize) < crate::scsp::SOUND_RAM_SIZE {
                    self.scsp.sound_ram[offset as usize]
                } else {
                    self.scsp.read_byte(offset - crate::scsp::SOUND_RAM_SIZE as u32)
                }
            }
            VDP1_VRAM_BASE..=VDP1_VRAM_END => self.vdp.vdp1.vram[(address - VDP1_VRAM_BASE) as usize],
            VDP1_FB_BASE..=VDP1_FB_END => {
                let offset = (address - VDP1_FB_BASE) as usize;
                self.vdp.vdp1.display_framebuffer().get(offset).copied().unwrap_or(0xFF)
            }
            VDP1_REG_BASE..=VDP1_REG_END => {
                let offset = address - VDP1_REG_BASE;
                let word = self.vdp.vdp1.read_register(offset & !1);
                if offset & 1 == 0 { (word >> 8) as u8 } else { word as u8 }
            }
            VDP2_VRAM_BASE..=VDP2_VRAM_END => self.vdp.vdp2.vram[(address - VDP2_VRAM_BASE) as usize],
            VDP2_CRAM_BASE..=VDP2_CRAM_END => self.vdp.vdp2.cram[(address - VDP2_CRAM_BASE) as usize],
            VDP2_REG_BASE..=VDP2_REG_END => 0, // Write-only register block (§4.7: byte reads are illegal and logged).
            SCU_REG_BASE..=SCU_REG_END => self.scu.read_register_byte(address - SCU_REG_BASE),
            WRAM_HIGH_BASE..=WRAM_HIGH_END => self.memory.wram_high[(address & 0x000F_FFFF) as usize],
            _ => {
                log::warn!("Unmapped read at {address:08X}");
                0xFF
            }
        }
    }

    fn read_word(&mut self, address: u32) -> u16 {
        match address {
            IPL_BASE..=IPL_END
            | BACKUP_BASE..=BACKUP_END
            | WRAM_LOW_BASE..=WRAM_LOW_END
            | CART_BASE..=CART_END
            | VDP1_VRAM_BASE..=VDP1_VRAM_END
            | VDP1_FB_BASE..=VDP1_FB_END
            | VDP2_VRAM_BASE..=VDP2_VRAM_END
            | VDP2_CRAM_BASE..=VDP2_CRAM_END
            | WRAM_HIGH_BASE..=WRAM_HIGH_END => self.read_word_from_bytes(address),
            VDP1_REG_BASE..=VDP1_REG_END => self.vdp.vdp1.read_register(address - VDP1_REG_BASE),
            _ => self.read_word_from_bytes(address),
        }
    }

    fn read_longword(&mut self, address: u32) -> u32 {
        let hi = self.read_word(address);
        let lo = self.read_word(address.wrapping_add(2));
        (u32::from(hi) << 16) | u32::from(lo)
    }

    fn read_cache_line(&mut self, address: u32) -> [u32; 4] {
        let base = address & !0xF;
        [
            self.read_longword(base),
            self.read_longword(base + 4),
            self.read_longword(base + 8),
            self.read_longword(base + 12),
        ]
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        match address {
            IPL_BASE..=IPL_END => {} // ROM: writes ignored.
            SMPC_BASE..=SMPC_END => {
                if let Some(latency) = self.smpc.write_byte(address & 0x7F, value) {
                    self.scheduler.schedule_from_now(SchedulerEvent::SmpcCommandComplete, latency);
                }
            }
            BACKUP_BASE..=BACKUP_END => {
                self.memory.write_internal_backup_byte((address & 0x0000_7FFF) as usize, value);
            }
            WRAM_LOW_BASE..=WRAM_LOW_END => self.memory.wram_low[(address & 0x000F_FFFF) as usize] = value,
            CART_BASE..=CART_END => self.cartridge.write_byte(address - CART_BASE, value),
            CDBLOCK_BASE..=CDBLOCK_END => {
                self.cdblock.write_byte(address - CDBLOCK_BASE, value, self.disc);
            }
            SCSP_BASE..=SCSP_END => {
                let offset = address - SCSP_BASE;
                if (offset as usize) < crate::scsp::SOUND_RAM_SIZE {
                    self.scsp.sound_ram[offset as usize] = value;
                } else {
                    self.scsp.write_byte(offset - crate::scsp::SOUND_RAM_SIZE as u32, value);
                }
            }
            VDP1_VRAM_BASE..=VDP1_VRAM_END => self.vdp.vdp1.vram[(address - VDP1_VRAM_BASE) as usize] = value,
            VDP1_FB_BASE..=VDP1_FB_END => {
                log::debug!("Ignored byte write into VDP1's read-only display framebuffer window");
            }
            VDP1_REG_BASE..=VDP1_REG_END => {
                let offset = address - VDP1_REG_BASE;
                let word = self.vdp.vdp1.read_register(offset & !1);
                let mut bytes = word.to_be_bytes();
                bytes[(offset & 1) as usize] = value;
                self.vdp.vdp1.write_register(offset & !1, u16::from_be_bytes(bytes));
            }
            VDP2_VRAM_BASE..=VDP2_VRAM_END => {
                self.vdp.vdp2.vram[(address - VDP2_VRAM_BASE) as usize] = value;
                self.vdp.vdp2.mark_access_pattern_dirty();
            }
            VDP2_CRAM_BASE..=VDP2_CRAM_END => self.vdp.vdp2.cram[(address - VDP2_CRAM_BASE) as usize] = value,
            VDP2_REG_BASE..=VDP2_REG_END => {
                log::warn!("Illegal byte write to VDP2 register at offset {:#06X}", address - VDP2_REG_BASE);
            }
            SCU_REG_BASE..=SCU_REG_END => self.scu.write_register_byte(address - SCU_REG_BASE, value),
            WRAM_HIGH_BASE..=WRAM_HIGH_END => self.memory.wram_high[(address & 0x000F_FFFF) as usize] = value,
            _ => log::warn!("Unmapped write at {address:08X} = {value:02X}"),
        }
    }

    fn write_word(&mut self, address: u32, value: u16) {
        match address {
            VDP1_REG_BASE..=VDP1_REG_END => self.vdp.vdp1.write_register(address - VDP1_REG_BASE, value),
            VDP2_REG_BASE..=VDP2_REG_END => {
                let offset = address - VDP2_REG_BASE;
                if offset >= WINDOW_REG_OFFSET {
                    crate::vdp::vdp2::apply_window_register(&mut self.vdp.windows, offset - WINDOW_REG_OFFSET, value);
                } else {
                    self.vdp.vdp2.write_register(offset, value);
                }
            }
            _ => self.write_word_as_bytes(address, value),
        }
    }

    fn write_longword(&mut self, address: u32, value: u32) {
        self.write_word(address, (value >> 16) as u16);
        self.write_word(address.wrapping_add(2), value as u16);
    }

    fn reset(&self) -> bool {
        self.signals.reset
    }

    fn interrupt_level(&self) -> u8 {
        self.signals.interrupt_level.max(self.scu.pending_level())
    }

    fn dma_request_0(&self) -> bool {
        false // Never wired to an external DMA source (see DESIGN.md).
    }

    fn dma_request_1(&self) -> bool {
        false
    }

    fn serial_rx(&mut self) -> Option<u8> {
        None // SCI is unused on the Saturn's SH-2s (see DESIGN.md).
    }

    fn serial_tx(&mut self, _value: u8) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdblock::CdBlock;
    use saturn_config::SaturnRegion;
    use sat_common::frontend::TimingMode;

    #[test]
    fn backup_ram_roundtrips_through_the_bus() {
        let mut memory = Memory::new();
        let mut cartridge = Cartridge::default();
        let mut scu = Scu::new();
        let mut smpc = Smpc::new(SaturnRegion::Japan);
        let mut vdp = Vdp::new(TimingMode::Ntsc);
        let mut scsp = Scsp::new();
        let mut cdblock = CdBlock::new_hle();
        let mut disc = None;
        let mut scheduler = Scheduler::new();

        let mut bus = Bus {
            memory: &mut memory,
            cartridge: &mut cartridge,
            scu: &mut scu,
            smpc: &mut smpc,
            vdp: &mut vdp,
            scsp: &mut scsp,
            cdblock: &mut cdblock,
            disc: &mut disc,
            scheduler: &mut scheduler,
            signals: BusSignals { reset: false, interrupt_level: 0 },
        };

        bus.write_byte(BACKUP_BASE + 10, 0x42);
        assert_eq!(bus.read_byte(BACKUP_BASE + 10), 0x42);
    }

    #[test]
    fn ipl_rom_ignores_writes() {
        let mut memory = Memory::new();
        let mut cartridge = Cartridge::default();
        let mut scu = Scu::new();
        let mut smpc = Smpc::new(SaturnRegion::Japan);
        let mut vdp = Vdp::new(TimingMode::Ntsc);
        let mut scsp = Scsp::new();
        let mut cdblock = CdBlock::new_hle();
        let mut disc = None;
        let mut scheduler = Scheduler::new();

        let mut bus = Bus {
            memory: &mut memory,
            cartridge: &mut cartridge,
            scu: &mut scu,
            smpc: &mut smpc,
            vdp: &mut vdp,
            scsp: &mut scsp,
            cdblock: &mut cdblock,
            disc: &mut disc,
            scheduler: &mut scheduler,
            signals: BusSignals { reset: false, interrupt_level: 0 },
        };

        bus.write_byte(IPL_BASE, 0xAB);
        assert_eq!(bus.read_byte(IPL_BASE), 0x00);
    }
}
