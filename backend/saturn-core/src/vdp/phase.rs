//! Horizontal/vertical scanline phase state machine (spec.md §3.3, §4.3).
//!
//! Dwell times are chosen to preserve the *ordering* invariants spec.md asks for (one `HBlank-in`
//! per line, one `VBlank-in`/`VBlank-out` pair per frame, TVMD latching only at the top border) —
//! §9 design note 2 explicitly allows approximate absolute timing as long as ordering holds within
//! one frame, and that license is used here the same way for video timing as it is for the CD
//! block.

use bincode::{Decode, Encode};
use sat_common::frontend::TimingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum HorizontalPhase {
    Active,
    Blanking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum VerticalPhase {
    /// TVMD resolution changes latch only here (§3.3).
    TopBorder,
    Active,
    BottomBorder,
    VBlank,
}

const NTSC_TOTAL_LINES: u16 = 263;
const PAL_TOTAL_LINES: u16 = 313;
const ACTIVE_LINES: u16 = 224;
const TOP_BORDER_LINES: u16 = 1;
const BOTTOM_BORDER_LINES: u16 = 1;

pub(crate) const H_ACTIVE_DWELL: u64 = 214;
const H_BLANKING_DWELL: u64 = 114;

#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct PhaseStepResult {
    pub next_dwell: u64,
    pub hblank_in: bool,
    pub vblank_in: bool,
    pub vblank_out: bool,
    pub draw_line: Option<u16>,
    pub frame_complete: bool,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct VdpPhase {
    pub h_phase: HorizontalPhase,
    pub v_phase: VerticalPhase,
    pub vcounter: u16,
    pub timing_mode: TimingMode,
    pub odd_field: bool,
}

impl VdpPhase {
    #[must_use]
    pub fn new(timing_mode: TimingMode) -> Self {
        Self {
            h_phase: HorizontalPhase::Active,
            v_phase: VerticalPhase::TopBorder,
            vcounter: 0,
            timing_mode,
            odd_field: false,
        }
    }

    fn total_lines(&self) -> u16 {
        match self.timing_mode {
            TimingMode::Ntsc => NTSC_TOTAL_LINES,
            TimingMode::Pal => PAL_TOTAL_LINES,
        }
    }

    /// Advances one phase transition. Called by the `VdpPhaseChange` scheduler event handler.
    pub fn advance(&mut self) -> PhaseStepResult {
        match self.h_phase {
            HorizontalPhase::Active => self.enter_hblank(),
            HorizontalPhase::Blanking => self.enter_next_line(),
        }
    }

    fn enter_hblank(&mut self) -> PhaseStepResult {
        self.h_phase = HorizontalPhase::Blanking;
        PhaseStepResult {
            next_dwell: H_BLANKING_DWELL,
            hblank_in: true,
            vblank_in: false,
            vblank_out: false,
            draw_line: None,
            frame_complete: false,
        }
    }

    fn enter_next_line(&mut self) -> PhaseStepResult {
        self.h_phase = HorizontalPhase::Active;
        self.vcounter += 1;

        let total = self.total_lines();
        let mut vblank_in = false;
        let mut vblank_out = false;
        let mut frame_complete = false;

        if self.vcounter >= total {
            self.vcounter = 0;
            self.odd_field = !self.odd_field;
        }

        match self.v_phase {
            VerticalPhase::TopBorder if self.vcounter >= TOP_BORDER_LINES => {
                self.v_phase = VerticalPhase::Active;
                vblank_out = true;
            }
            VerticalPhase::Active if self.vcounter >= TOP_BORDER_LINES + ACTIVE_LINES => {
                self.v_phase = VerticalPhase::BottomBorder;
                vblank_in = true;
                frame_complete = true;
            }
            VerticalPhase::BottomBorder
                if self.vcounter >= TOP_BORDER_LINES + ACTIVE_LINES + BOTTOM_BORDER_LINES =>
            {
                self.v_phase = VerticalPhase::VBlank;
            }
            VerticalPhase::VBlank if self.vcounter == 0 => {
                self.v_phase = VerticalPhase::TopBorder;
            }
            _ => {}
        }

        let draw_line = matches!(self.v_phase, VerticalPhase::Active).then(|| {
            self.vcounter - TOP_BORDER_LINES
        });

        PhaseStepResult {
            next_dwell: H_ACTIVE_DWELL,
            hblank_in: false,
            vblank_in,
            vblank_out,
            draw_line,
            frame_complete,
        }
    }

    #[must_use]
    pub fn is_vblank(&self) -> bool {
        matches!(self.v_phase, VerticalPhase::VBlank | VerticalPhase::BottomBorder)
    }

    #[must_use]
    pub fn active_line_count(&self) -> u16 {
        ACTIVE_LINES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_vblank_in_and_out_per_frame() {
        let mut phase = VdpPhase::new(TimingMode::Ntsc);
        let mut vblank_ins = 0;
        let mut vblank_outs = 0;
        // Two full passes of h-phase transitions per line, for every line in a frame plus slack.
        for _ in 0..(NTSC_TOTAL_LINES as u32 * 2 + 4) {
            let r1 = phase.advance();
            vblank_ins += u32::from(r1.vblank_in);
            vblank_outs += u32::from(r1.vblank_out);
            let r2 = phase.advance();
            vblank_ins += u32::from(r2.vblank_in);
            vblank_outs += u32::from(r2.vblank_out);
        }
        assert_eq!(vblank_ins, 1);
        assert_eq!(vblank_outs, 1);
    }

    #[test]
    fn draw_line_only_fires_during_active_phase() {
        let mut phase = VdpPhase::new(TimingMode::Ntsc);
        // Skip the top border.
        loop {
            let r = phase.advance();
            phase.advance();
            if r.vblank_out {
                break;
            }
        }
        let r = phase.advance();
        phase.advance();
        assert_eq!(r.draw_line, Some(0));
    }
}
