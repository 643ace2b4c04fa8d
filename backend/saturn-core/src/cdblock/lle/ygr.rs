//! The YGR gate array: the CD block's host-facing register window, FIFO, and HIRQ controller
//! (spec.md §4.5). The SH-1 firmware itself is out of scope for this core (see DESIGN.md); YGR
//! models the side of the interface the host SH-2 actually touches, which is sufficient to honor
//! the FIFO back-pressure and status-packet invariants spec.md asks for.

use super::super::{Fifo, HirqBit, TransferDirection, FIFO_CAPACITY};
use bincode::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct Ygr {
    pub hirq_status: u16,
    pub hirq_mask: u16,
    pub fifo: Fifo,
    pub transfer_direction: TransferDirection,
    pub dreq_enabled: bool,
    pub command_fifo: Vec<u8>,
}

impl Ygr {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hirq_status: 0,
            hirq_mask: 0xFFFF,
            fifo: Fifo::default(),
            transfer_direction: TransferDirection::DriveToHost,
            dreq_enabled: false,
            command_fifo: Vec::new(),
        }
    }

    pub fn raise(&mut self, bit: HirqBit) {
        self.hirq_status |= 1 << (bit as u16);
    }

    pub fn acknowledge_mask_write(&mut self, value: u16) {
        self.hirq_status &= value;
    }

    /// DREQ only asserts when the transfer direction matches the side currently able to move
    /// data, per spec.md §4.5's "DREQ assertions must match the direction" invariant. Host-to-drive
    /// asserts while the FIFO has room to accept more; drive-to-host asserts while the FIFO still
    /// holds data the host hasn't read yet.
    #[must_use]
    pub fn dreq_asserted(&self, wants: TransferDirection) -> bool {
        if !self.dreq_enabled || self.transfer_direction != wants {
            return false;
        }

        match wants {
            TransferDirection::HostToDrive => !self.fifo.is_full(),
            TransferDirection::DriveToHost => !self.fifo.is_empty(),
        }
    }
}

impl Default for Ygr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dreq_does_not_assert_against_the_wrong_direction() {
        let mut ygr = Ygr::new();
        ygr.dreq_enabled = true;
        ygr.transfer_direction = TransferDirection::DriveToHost;
        assert!(!ygr.dreq_asserted(TransferDirection::HostToDrive));
        assert!(ygr.dreq_asserted(TransferDirection::DriveToHost));
    }

    #[test]
    fn drive_to_host_dreq_deasserts_once_fifo_is_drained() {
        let mut ygr = Ygr::new();
        ygr.dreq_enabled = true;
        ygr.transfer_direction = TransferDirection::DriveToHost;
        assert!(!ygr.dreq_asserted(TransferDirection::DriveToHost));

        ygr.fifo.push(0);
        assert!(ygr.dreq_asserted(TransferDirection::DriveToHost));
    }

    #[test]
    fn host_to_drive_dreq_deasserts_once_fifo_is_full() {
        let mut ygr = Ygr::new();
        ygr.dreq_enabled = true;
        ygr.transfer_direction = TransferDirection::HostToDrive;
        assert!(ygr.dreq_asserted(TransferDirection::HostToDrive));

        for _ in 0..FIFO_CAPACITY {
            ygr.fifo.push(0);
        }
        assert!(!ygr.dreq_asserted(TransferDirection::HostToDrive));
    }
}
