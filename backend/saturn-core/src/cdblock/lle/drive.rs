//! Drive physics state machine (spec.md §4.5 "Drive timing (LLE)"): `Reset -> PreTx -> TxBegin ->
//! (TxByte + TxInter)×11 -> TxEnd -> ProcessCommand`, serializing the current status packet one
//! byte per `TxByte` state over `COMSYNCn`/`COMREQn`.

use super::super::status_packet_checksum;
use bincode::{Decode, Encode};

const STATUS_PACKET_BYTES: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum DriveState {
    Reset,
    PreTx,
    TxBegin,
    TxByte(u8),
    TxInter(u8),
    TxEnd,
    ProcessCommand,
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct DriveCommand {
    pub opcode: DriveOpcode,
    pub param: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum DriveOpcode {
    #[default]
    Noop,
    ReadToc,
    Stop,
    ReadSector,
    Pause,
    SeekSector,
    ScanForward,
    ScanBack,
    SeekRing,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Drive {
    pub state: DriveState,
    pub current_fad: u32,
    pub read_speed_2x: bool,
    pub status_packet: [u8; STATUS_PACKET_BYTES],
    pub comsyncn: bool,
    pub comreqn: bool,
    pub pending_command: Option<DriveCommand>,
    pub toc_copies_remaining: u8,
}

impl Drive {
    #[must_use]
    pub fn new() -> Self {
        let mut drive = Self {
            state: DriveState::Reset,
            current_fad: disc::FIRST_USER_DATA_FAD,
            read_speed_2x: false,
            status_packet: [0; STATUS_PACKET_BYTES],
            comsyncn: true,
            comreqn: true,
            pending_command: None,
            toc_copies_remaining: 0,
        };
        drive.refresh_status_packet();
        drive
    }

    fn refresh_status_packet(&mut self) {
        let mut payload = [0u8; 12];
        payload[0] = match self.state {
            DriveState::Reset => 0x23,
            _ => 0x00,
        };
        payload[1] = (self.current_fad >> 16) as u8;
        payload[2] = (self.current_fad >> 8) as u8;
        payload[3] = self.current_fad as u8;
        self.status_packet[..12].copy_from_slice(&payload);
        self.status_packet[12] = status_packet_checksum(&payload);
    }

    /// Submits a command for `ProcessCommand` to act on. Real hardware receives commands
    /// byte-serially the same way status goes out; this core accepts the fully-formed command
    /// directly from the YGR register window once `TxEnd` completes a status cycle.
    pub fn submit_command(&mut self, command: DriveCommand) {
        self.pending_command = Some(command);
    }

    /// Advances the drive state machine by one `CdDriveStep` event, scaled to 1/3x the CD-block
    /// master clock by the scheduler's rate factor (spec.md §4.5).
    pub fn step(&mut self) -> bool {
        let (next_state, sector_ready) = match self.state {
            DriveState::Reset => (DriveState::PreTx, false),
            DriveState::PreTx => (DriveState::TxBegin, false),
            DriveState::TxBegin => {
                self.refresh_status_packet();
                self.comsyncn = false;
                (DriveState::TxByte(0), false)
            }
            DriveState::TxByte(i) => {
                self.comreqn = false;
                if i + 1 >= STATUS_PACKET_BYTES as u8 {
                    (DriveState::TxEnd, false)
                } else {
                    (DriveState::TxInter(i), false)
                }
            }
            DriveState::TxInter(i) => {
                self.comreqn = true;
                (DriveState::TxByte(i + 1), false)
            }
            DriveState::TxEnd => {
                self.comsyncn = true;
                (DriveState::ProcessCommand, false)
            }
            DriveState::ProcessCommand => {
                let ready = self.process_pending_command();
                (DriveState::PreTx, ready)
            }
        };
        self.state = next_state;
        sector_ready
    }

    fn process_pending_command(&mut self) -> bool {
        let Some(command) = self.pending_command.take() else { return false };
        match command.opcode {
            DriveOpcode::Noop => false,
            DriveOpcode::ReadToc => {
                self.toc_copies_remaining = 3;
                false
            }
            DriveOpcode::Stop | DriveOpcode::Pause => false,
            DriveOpcode::ReadSector => {
                self.current_fad = command.param;
                true
            }
            DriveOpcode::SeekSector | DriveOpcode::SeekRing => {
                self.current_fad = command.param;
                false
            }
            DriveOpcode::ScanForward => {
                self.current_fad = self.current_fad.wrapping_add(1);
                false
            }
            DriveOpcode::ScanBack => {
                self.current_fad = self.current_fad.saturating_sub(1);
                false
            }
        }
    }

    /// Read speed factor applied to `CdDriveStep` scheduling (spec.md §4.5): `1x` or `2x`.
    #[must_use]
    pub fn speed_factor(&self) -> u32 {
        if self.read_speed_2x { 2 } else { 1 }
    }
}

impl Default for Drive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_returns_to_pretx_after_process_command() {
        let mut drive = Drive::new();
        assert_eq!(drive.state, DriveState::Reset);
        drive.step(); // -> PreTx
        drive.step(); // -> TxBegin
        let mut state = drive.state;
        let mut steps = 0;
        while state != DriveState::ProcessCommand && steps < 64 {
            drive.step();
            state = drive.state;
            steps += 1;
        }
        assert_eq!(drive.state, DriveState::ProcessCommand);
        drive.step();
        assert_eq!(drive.state, DriveState::PreTx);
    }

    #[test]
    fn status_packet_checksum_is_always_valid() {
        let drive = Drive::new();
        let payload: [u8; 12] = drive.status_packet[..12].try_into().unwrap();
        assert_eq!(drive.status_packet[12], status_packet_checksum(&payload));
    }

    #[test]
    fn read_sector_command_reports_ready_at_process_command() {
        let mut drive = Drive::new();
        drive.submit_command(DriveCommand { opcode: DriveOpcode::ReadSector, param: 1000 });
        drive.state = DriveState::ProcessCommand;
        let ready = drive.step();
        assert!(ready);
        assert_eq!(drive.current_fad, 1000);
    }
}
