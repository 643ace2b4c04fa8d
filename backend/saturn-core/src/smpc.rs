//! System Manager and Peripheral Control (spec.md §4 component table, SPEC_FULL §3 SMPC
//! supplement): reset/clock-change commands, RTC, and the `INTBACK` peripheral/status report.
//!
//! Register layout (`IREG0-6`, `OREG0-31`, `COMREG`, `SR`, `SF`, `PDR1/2`, `DDR1/2`, `IOSEL`,
//! `EXLE`) follows the publicly documented Saturn SMPC memory map: the SMPC is an 8-bit device
//! wired to the odd byte lane of a 16-bit bus, so every register lives at an odd address (not
//! present in `original_source`; see `DESIGN.md`). Command dispatch is a single `match` on
//! `COMREG`, per §9's "avoidance of inheritance" note.

use bincode::{Decode, Encode};
use saturn_config::{PeripheralReport, SaturnRegion};

const IREG_BASE: u32 = 0x01;
const OREG_BASE: u32 = 0x21;
const COMREG: u32 = 0x1F;
const SR: u32 = 0x61;
const SF: u32 = 0x63;
const PDR1: u32 = 0x75;
const PDR2: u32 = 0x77;
const DDR1: u32 = 0x79;
const DDR2: u32 = 0x7B;
const IOSEL: u32 = 0x7D;
const EXLE: u32 = 0x7F;

const NUM_IREG: usize = 7;
const NUM_OREG: usize = 32;

/// Command latency, in master clock cycles, before the System Manager interrupt fires and `SF`
/// clears. §9 design note 2 says absolute CD-block latencies are implementation-tunable as long as
/// ordering holds within one frame; the same applies here. `INTBACK` is deliberately slower since
/// real hardware takes multiple VBlanks to deliver a full peripheral report.
const FAST_COMMAND_LATENCY: u64 = 8_000;
const INTBACK_LATENCY: u64 = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct RtcTimestamp {
    /// Seconds since the Saturn epoch (1980-01-01), §6.3.
    pub seconds_since_epoch: u64,
}

impl Default for RtcTimestamp {
    fn default() -> Self {
        Self { seconds_since_epoch: 0 }
    }
}

/// §6.3 persisted SMPC data: area code, language, last RTC write, and the system clock count used
/// to derive "now" from `seconds_since_epoch` between saves.
#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct SmpcPersistentData {
    pub area_code: u8,
    pub language: u8,
    pub rtc: RtcTimestamp,
    pub system_clock_count: u64,
}

impl SmpcPersistentData {
    #[must_use]
    pub fn new(region: SaturnRegion) -> Self {
        Self { area_code: region.area_code(), language: 0, rtc: RtcTimestamp::default(), system_clock_count: 0 }
    }
}

/// `INTBACK` is the one variable-length reply spec.md §3.7 calls out: a multi-call report that
/// streams status, then RTC/area data, then one block per enabled peripheral port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
struct IntbackState {
    active: bool,
    /// True until the final `INTBACK` reply (`PDE`=0 in OREG31's continuation bit) has gone out.
    more_data_pending: bool,
    peripheral_data_enabled: bool,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Smpc {
    ireg: [u8; NUM_IREG],
    oreg: [u8; NUM_OREG],
    comreg: u8,
    sr: u8,
    sf: bool,
    pdr1: u8,
    pdr2: u8,
    ddr1: u8,
    ddr2: u8,
    iosel: u8,
    exle: u8,
    pub persistent: SmpcPersistentData,
    pub slave_enabled: bool,
    pub sound_enabled: bool,
    pub reset_enabled: bool,
    /// Latches at the next VBlank-in rather than immediately, per §4.2's "CKCHG352/CKCHG320
    /// (clock change, latched at the next VBlank-in)".
    pub pending_clock_change: Option<bool>,
    pub reset_requested: bool,
    pub nmi_requested: bool,
    command_pending: bool,
    intback: IntbackState,
    pub p1_report: PeripheralReport,
    pub p2_report: PeripheralReport,
}

impl Smpc {
    #[must_use]
    pub fn new(region: SaturnRegion) -> Self {
        Self {
            ireg: [0; NUM_IREG],
            oreg: [0; NUM_OREG],
            comreg: 0,
            sr: 0,
            sf: false,
            pdr1: 0,
            pdr2: 0,
            ddr1: 0,
            ddr2: 0,
            iosel: 0,
            exle: 0,
            persistent: SmpcPersistentData::new(region),
            slave_enabled: true,
            sound_enabled: true,
            reset_enabled: true,
            pending_clock_change: None,
            reset_requested: false,
            nmi_requested: false,
            command_pending: false,
            intback: IntbackState::default(),
            p1_report: PeripheralReport::released(),
            p2_report: PeripheralReport::None,
        }
    }

    #[must_use]
    pub fn read_byte(&self, address: u32) -> u8 {
        let offset = address & 0x7F;
        if (IREG_BASE..IREG_BASE + 2 * NUM_IREG as u32).contains(&offset) && offset % 2 == 1 {
            return self.ireg[((offset - IREG_BASE) / 2) as usize];
        }
        if (OREG_BASE..OREG_BASE + 2 * NUM_OREG as u32).contains(&offset) && offset % 2 == 1 {
            return self.oreg[((offset - OREG_BASE) / 2) as usize];
        }
        match offset {
            SR => self.sr,
            SF => u8::from(self.sf),
            PDR1 => self.pdr1,
            PDR2 => self.pdr2,
            DDR1 => self.ddr1,
            DDR2 => self.ddr2,
            IOSEL => self.iosel,
            EXLE => self.exle,
            _ => 0xFF,
        }
    }

    /// Returns `Some(latency)` when this write triggers a command (`SF` transitioning 0 -> 1),
    /// so the caller (the `Saturn` driver loop) can schedule `SmpcCommandComplete`.
    pub fn write_byte(&mut self, address: u32, value: u8) -> Option<u64> {
        let offset = address & 0x7F;
        if (IREG_BASE..IREG_BASE + 2 * NUM_IREG as u32).contains(&offset) && offset % 2 == 1 {
            self.ireg[((offset - IREG_BASE) / 2) as usize] = value;
            return None;
        }
        match offset {
            COMREG => {
                self.comreg = value;
                None
            }
            SF => {
                let rising_edge = value & 1 != 0 && !self.sf;
                self.sf = value & 1 != 0;
                if rising_edge && !self.command_pending {
                    self.command_pending = true;
                    Some(self.latch_command_latency())
                } else {
                    None
                }
            }
            PDR1 => {
                self.pdr1 = value;
                None
            }
            PDR2 => {
                self.pdr2 = value;
                None
            }
            DDR1 => {
                self.ddr1 = value;
                None
            }
            DDR2 => {
                self.ddr2 = value;
                None
            }
            IOSEL => {
                self.iosel = value;
                None
            }
            EXLE => {
                self.exle = value;
                None
            }
            _ => None,
        }
    }

    fn latch_command_latency(&self) -> u64 {
        if self.comreg == 0x10 { INTBACK_LATENCY } else { FAST_COMMAND_LATENCY }
    }

    /// Fires when the scheduler's `SmpcCommandComplete` event reaches the latched time. Returns
    /// `true` if the System Manager interrupt should be raised.
    pub fn complete_pending_command(&mut self) -> bool {
        if !self.command_pending {
            return false;
        }
        self.command_pending = false;

        self.execute_command();
        self.sf = false;
        true
    }

    #[allow(clippy::match_same_arms)]
    fn execute_command(&mut self) {
        log::debug!("SMPC command {:02X}", self.comreg);
        match self.comreg {
            0x00 => self.reply_status(), // MSHON
            0x02 => self.slave_enabled = true,  // SSHON
            0x03 => self.slave_enabled = false, // SSHOFF
            0x06 => self.sound_enabled = true,  // SNDON
            0x07 => self.sound_enabled = false, // SNDOFF
            0x08 => self.reset_requested = true, // SYSRES
            0x09 => self.nmi_requested = true,  // NMIREQ
            0x0A => self.clock_change(false), // CKCHG320
            0x0B => self.clock_change(true),  // CKCHG352
            0x0D => self.reset_enabled = true,  // RESENAB
            0x0E => self.reset_enabled = false, // RESDISA
            0x10 => self.begin_intback(),
            0x11 => self.continue_intback(),
            0x16 => self.set_time(), // SETTIME
            0x17 => self.set_smem(), // SETSMEM
            _ => log::warn!("Unrecognized SMPC command {:02X}", self.comreg),
        }
        self.reply_status();
    }

    /// CKCHG352/CKCHG320: latches at the next VBlank-in rather than applying immediately (§4
    /// supplement).
    fn clock_change(&mut self, to_352: bool) {
        self.pending_clock_change = Some(to_352);
    }

    /// Applies a previously-latched clock change; called by the driver loop at VBlank-in.
    pub fn apply_latched_clock_change(&mut self) -> Option<bool> {
        self.pending_clock_change.take()
    }

    fn begin_intback(&mut self) {
        self.intback.active = true;
        self.intback.peripheral_data_enabled = self.ireg[1] & 0x08 != 0;
        self.fill_status_report();
    }

    fn continue_intback(&mut self) {
        if self.intback.active {
            self.fill_status_report();
        }
    }

    fn fill_status_report(&mut self) {
        self.oreg[0] = 0x80; // SETTIME executed bit + status nibble (simplified)
        self.oreg[1] = self.persistent.area_code;
        self.oreg[2] = ((self.persistent.rtc.seconds_since_epoch >> 40) & 0xFF) as u8;
        self.oreg[3] = ((self.persistent.rtc.seconds_since_epoch >> 32) & 0xFF) as u8;
        self.oreg[4] = ((self.persistent.rtc.seconds_since_epoch >> 24) & 0xFF) as u8;
        self.oreg[5] = ((self.persistent.rtc.seconds_since_epoch >> 16) & 0xFF) as u8;
        self.oreg[6] = ((self.persistent.rtc.seconds_since_epoch >> 8) & 0xFF) as u8;
        self.oreg[7] = (self.persistent.rtc.seconds_since_epoch & 0xFF) as u8;

        if self.intback.peripheral_data_enabled {
            self.encode_peripheral_report(&self.p1_report.clone(), 8);
            self.encode_peripheral_report(&self.p2_report.clone(), 8 + 4);
        }

        // No multi-VBlank continuation is modeled; every INTBACK resolves in one call.
        self.intback.more_data_pending = false;
        self.intback.active = self.intback.more_data_pending;
    }

    fn encode_peripheral_report(&mut self, report: &PeripheralReport, oreg_offset: usize) {
        let (id, size, data): (u8, u8, [u8; 2]) = match *report {
            PeripheralReport::ControlPad { buttons } => {
                (0x02, 2, buttons.to_be_bytes())
            }
            PeripheralReport::None => (0xFF, 0, [0, 0]),
            _ => (0x02, 2, [0xFF, 0xFF]),
        };
        self.oreg[oreg_offset] = id;
        self.oreg[oreg_offset + 1] = size;
        if size >= 2 {
            self.oreg[oreg_offset + 2] = data[0];
            self.oreg[oreg_offset + 3] = data[1];
        }
    }

    fn reply_status(&mut self) {
        self.sr = 0x80 | u8::from(self.slave_enabled) << 1 | u8::from(self.sound_enabled);
    }

    fn set_time(&mut self) {
        let mut seconds: u64 = 0;
        for byte in &self.ireg[0..6] {
            seconds = (seconds << 8) | u64::from(*byte);
        }
        self.persistent.rtc.seconds_since_epoch = seconds;
    }

    fn set_smem(&mut self) {
        self.persistent.area_code = self.ireg[0];
        self.persistent.language = self.ireg[1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sf_rising_edge_schedules_a_command() {
        let mut smpc = Smpc::new(SaturnRegion::Japan);
        smpc.write_byte(COMREG, 0x00);
        let latency = smpc.write_byte(SF, 0x01);
        assert!(latency.is_some());

        // A second write to SF while a command is pending does not schedule a second one.
        assert!(smpc.write_byte(SF, 0x01).is_none());
    }

    #[test]
    fn mshon_completion_clears_sf_and_sets_status() {
        let mut smpc = Smpc::new(SaturnRegion::Americas);
        smpc.write_byte(COMREG, 0x00);
        smpc.write_byte(SF, 0x01);
        assert!(smpc.complete_pending_command());
        assert!(!smpc.sf);
        assert_eq!(smpc.read_byte(SR) & 0x80, 0x80);
    }

    #[test]
    fn sshoff_then_sshon_toggles_slave_enabled() {
        let mut smpc = Smpc::new(SaturnRegion::Japan);
        smpc.write_byte(COMREG, 0x03);
        smpc.write_byte(SF, 0x01);
        smpc.complete_pending_command();
        assert!(!smpc.slave_enabled);

        smpc.write_byte(COMREG, 0x02);
        smpc.write_byte(SF, 0x01);
        smpc.complete_pending_command();
        assert!(smpc.slave_enabled);
    }

    #[test]
    fn clock_change_latches_until_applied() {
        let mut smpc = Smpc::new(SaturnRegion::Japan);
        smpc.write_byte(COMREG, 0x0B);
        smpc.write_byte(SF, 0x01);
        smpc.complete_pending_command();
        assert_eq!(smpc.pending_clock_change, Some(true));
        assert_eq!(smpc.apply_latched_clock_change(), Some(true));
        assert_eq!(smpc.pending_clock_change, None);
    }

    #[test]
    fn intback_reports_area_code_in_oreg1() {
        let mut smpc = Smpc::new(SaturnRegion::Europe);
        smpc.write_byte(COMREG, 0x10);
        smpc.write_byte(0x03, 0x08); // IREG1: request peripheral data
        smpc.write_byte(SF, 0x01);
        smpc.complete_pending_command();
        assert_eq!(smpc.read_byte(OREG_BASE + 2), SaturnRegion::Europe.area_code());
    }
}
