//! LLE CD block: the YGR gate array plus drive state machine (spec.md §4.5). The SH-1's firmware
//! is not emulated (see DESIGN.md); command semantics are synthesized the same way HLE does them,
//! but timing now runs through the `Drive` state machine so `CdDriveStep`/`CdSectorReady`
//! scheduler events drive real per-state latency instead of resolving in one step.

pub mod drive;
pub mod ygr;

use super::HirqBit;
use bincode::{Decode, Encode};
use disc::{Disc, Fad};
use drive::{Drive, DriveCommand, DriveOpcode};
use ygr::Ygr;

const CR1: u32 = 0x00;
const CR2: u32 = 0x02;
const CR3: u32 = 0x04;
const CR4: u32 = 0x06;
const HIRQ: u32 = 0x08;
const HIRQ_MASK: u32 = 0x0A;

#[derive(Debug, Clone, Encode, Decode)]
pub struct LleCdBlock {
    pub ygr: Ygr,
    pub drive: Drive,
    cr: [u16; 4],
    pub tray_open: bool,
    pending_read_fad: Option<Fad>,
}

impl LleCdBlock {
    #[must_use]
    pub fn new() -> Self {
        Self { ygr: Ygr::new(), drive: Drive::new(), cr: [0; 4], tray_open: false, pending_read_fad: None }
    }

    #[must_use]
    pub fn read_byte(&self, address: u32) -> u8 {
        let word = match address & !1 {
            HIRQ => self.ygr.hirq_status,
            HIRQ_MASK => self.ygr.hirq_mask,
            _ => 0xFFFF,
        };
        if address & 1 == 0 { (word >> 8) as u8 } else { word as u8 }
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        match address & !1 {
            HIRQ => {
                let mask = if address & 1 == 0 { u16::from(value) << 8 | 0x00FF } else { 0xFF00 | u16::from(value) };
                self.ygr.acknowledge_mask_write(mask);
                return;
            }
            HIRQ_MASK => {
                if address & 1 == 0 {
                    self.ygr.hirq_mask = (self.ygr.hirq_mask & 0x00FF) | (u16::from(value) << 8);
                } else {
                    self.ygr.hirq_mask = (self.ygr.hirq_mask & 0xFF00) | u16::from(value);
                }
                return;
            }
            _ => {}
        }

        let reg_index = match address & !1 {
            CR1 => 0,
            CR2 => 1,
            CR3 => 2,
            CR4 => 3,
            _ => return,
        };
        if address & 1 == 0 {
            self.cr[reg_index] = (self.cr[reg_index] & 0x00FF) | (u16::from(value) << 8);
        } else {
            self.cr[reg_index] = (self.cr[reg_index] & 0xFF00) | u16::from(value);
            if reg_index == 3 {
                self.queue_command_from_registers();
            }
        }
    }

    fn queue_command_from_registers(&mut self) {
        let command = (self.cr[0] >> 8) as u8;
        self.drive.read_speed_2x = self.cr[0] & 0x80 != 0;
        let fad = (u32::from(self.cr[0] & 0xFF) << 16) | u32::from(self.cr[1]);

        let opcode = match command {
            0x02 => DriveOpcode::ReadToc,
            0x03 => DriveOpcode::ReadSector,
            0x04 => DriveOpcode::Stop,
            0x05 => DriveOpcode::Pause,
            0x06 => DriveOpcode::SeekSector,
            0x07 => DriveOpcode::ScanForward,
            0x08 => DriveOpcode::ScanBack,
            0x09 => DriveOpcode::SeekRing,
            _ => DriveOpcode::Noop,
        };
        self.drive.submit_command(DriveCommand { opcode, param: fad });
        self.ygr.raise(HirqBit::Cmok);
    }

    /// Advances the drive state machine one `CdDriveStep` event, scaled by the drive's own
    /// 1/speed_factor timing (spec.md §4.5).
    pub fn step_drive(&mut self, _disc: &mut Option<Disc>) {
        if self.drive.step() {
            self.pending_read_fad = Some(self.drive.current_fad);
            self.ygr.raise(HirqBit::Csct);
        }
    }

    /// Services a pending sector read once `CdSectorReady` fires, pushing sector bytes into the
    /// YGR FIFO, refusing to overrun it (spec.md §7 FIFO back-pressure invariant).
    pub fn service_pending_read(&mut self, disc: &mut Option<Disc>) {
        let Some(fad) = self.pending_read_fad.take() else { return };
        let Some(disc) = disc else { return };

        let mut buffer = [0u8; 2048];
        if disc.read_user_data(fad, &mut buffer).is_err() {
            return;
        }

        for &byte in &buffer {
            if !self.ygr.fifo.push(byte) {
                self.ygr.raise(HirqBit::Bful);
                break;
            }
        }
        self.ygr.raise(HirqBit::Dchg);
    }
}

impl Default for LleCdBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_sector_command_queues_a_drive_command() {
        let mut cd = LleCdBlock::new();
        cd.write_byte(CR1, 0x03); // command byte: ReadSector
        cd.write_byte(CR1 + 1, 0x00);
        cd.write_byte(CR2, 0x00);
        cd.write_byte(CR2 + 1, 0x00);
        cd.write_byte(CR3, 0x00);
        cd.write_byte(CR3 + 1, 0x00);
        cd.write_byte(CR4, 0x00);
        cd.write_byte(CR4 + 1, 0x00); // triggers dispatch on the low byte of CR4

        assert!(cd.drive.pending_command.is_some());
        assert_eq!(cd.ygr.hirq_status & 1, 1); // Cmok
    }
}
