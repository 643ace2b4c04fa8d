//! Peripheral ports 1 and 2 (spec.md §6.1, §6.2).
//!
//! Grounded on the teacher's `genesis-core::input` port model: each port holds a connected device
//! kind and the most recent [`PeripheralReport`] for it; the SMPC polls these during `INTBACK`
//! (spec.md §4 SMPC supplement) rather than the core pushing samples itself.

use bincode::{Decode, Encode};
use sat_common::input::Player;
use saturn_config::{PeripheralKind, PeripheralReport};

#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct PeripheralPort {
    pub kind: PeripheralKind,
    pub report: PeripheralReport,
}

impl PeripheralPort {
    #[must_use]
    pub fn new(kind: PeripheralKind) -> Self {
        Self { kind, report: PeripheralReport::released() }
    }

    pub fn connect(&mut self, kind: PeripheralKind) {
        self.kind = kind;
        self.report = match kind {
            PeripheralKind::None => PeripheralReport::None,
            _ => PeripheralReport::released(),
        };
    }

    /// Ignores a report whose tag does not match the connected device; a stray report for a
    /// disconnected or mismatched peripheral must never desynchronize `INTBACK`'s reply shape.
    pub fn set_report(&mut self, report: PeripheralReport) {
        if report.kind() == self.kind {
            self.report = report;
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct InputState {
    pub port1: PeripheralPort,
    pub port2: PeripheralPort,
}

impl InputState {
    #[must_use]
    pub fn new(p1: PeripheralKind, p2: PeripheralKind) -> Self {
        Self { port1: PeripheralPort::new(p1), port2: PeripheralPort::new(p2) }
    }

    pub fn set_report(&mut self, player: Player, report: PeripheralReport) {
        match player {
            Player::One => self.port1.set_report(report),
            Player::Two => self.port2.set_report(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_report_kind_is_ignored() {
        let mut port = PeripheralPort::new(PeripheralKind::ControlPad);
        port.set_report(PeripheralReport::ArcadeRacer { buttons: 0, wheel: 128 });
        assert_eq!(port.report, PeripheralReport::released());
    }

    #[test]
    fn connecting_none_clears_the_report() {
        let mut port = PeripheralPort::new(PeripheralKind::ControlPad);
        port.connect(PeripheralKind::None);
        assert_eq!(port.report, PeripheralReport::None);
    }
}
