//! The two-stage video pipeline: VDP1 (sprite/polygon engine) feeding VDP2 (background
//! compositor), driven by the scanline phase state machine (spec.md §3.3 "VDP rendering pipeline").

pub mod phase;
pub mod render_queue;
pub mod vdp1;
pub mod vdp2;

use bincode::{Decode, Encode};
use phase::{PhaseStepResult, VdpPhase};
use sat_common::frontend::{Color, DisplayArea, FrameSize};
use vdp1::Vdp1;
use vdp2::{Vdp2, WindowRegs, SCREEN_WIDTH};

/// Width/height of the progressive-scan composited frame buffer this module produces.
pub const FRAME_HEIGHT: usize = 224;

#[derive(Clone, Encode, Decode)]
pub struct Vdp {
    pub phase: VdpPhase,
    pub vdp1: Vdp1,
    pub vdp2: Vdp2,
    pub windows: WindowRegs,
    frame_buffer: Vec<(u8, u8, u8)>,
    alt_frame_buffer: Vec<(u8, u8, u8)>,
    pub deinterlace: bool,
    tvmd_dirty_latched: bool,
}

impl Vdp {
    #[must_use]
    pub fn new(timing_mode: sat_common::frontend::TimingMode) -> Self {
        Self {
            phase: VdpPhase::new(timing_mode),
            vdp1: Vdp1::new(),
            vdp2: Vdp2::new(),
            windows: WindowRegs::default(),
            frame_buffer: vec![(0, 0, 0); SCREEN_WIDTH * FRAME_HEIGHT],
            alt_frame_buffer: vec![(0, 0, 0); SCREEN_WIDTH * FRAME_HEIGHT],
            deinterlace: false,
            tvmd_dirty_latched: false,
        }
    }

    pub fn mark_tvmd_dirty(&mut self) {
        self.tvmd_dirty_latched = true;
    }

    /// Advances the scanline phase state machine one transition and performs the corresponding
    /// side effects: drawing a line into the composited buffer, latching a pending TVMD change at
    /// the top border, or swapping/erasing VDP1's framebuffers at VBlank-out. Returns the phase
    /// transition so the scheduler can raise VBlank-in/out and HBlank-in interrupts (spec.md §4
    /// SCU supplement).
    pub fn advance(&mut self) -> PhaseStepResult {
        let result = self.phase.advance();

        if matches!(self.phase.v_phase, phase::VerticalPhase::Active) && self.tvmd_dirty_latched {
            self.tvmd_dirty_latched = false;
        }

        if let Some(line) = result.draw_line {
            self.draw_line(line);
        }

        if result.vblank_out {
            self.vdp1.vblank_out_swap(false);
        }

        result
    }

    fn draw_line(&mut self, line: u16) {
        let mut sprite_row = [None; SCREEN_WIDTH];
        let fb = self.vdp1.display_framebuffer();
        for x in 0..SCREEN_WIDTH {
            let offset = 2 * (usize::from(line) * vdp1::FB_WIDTH + x);
            if offset + 1 >= fb.len() {
                continue;
            }
            let word = u16::from_be_bytes([fb[offset], fb[offset + 1]]);
            if word & 0x8000 != 0 {
                let r = ((word & 0x1F) as u32 * 255 / 31) as u8;
                let g = (((word >> 5) & 0x1F) as u32 * 255 / 31) as u8;
                let b = (((word >> 10) & 0x1F) as u32 * 255 / 31) as u8;
                sprite_row[x] = Some((r, g, b, 7)); // VDP1 always wins priority ties with itself.
            }
        }

        let mut row = [(0u8, 0u8, 0u8); SCREEN_WIDTH];
        self.vdp2.render_scanline(line, &sprite_row, &self.windows, &mut row);

        let target = if self.phase.odd_field && self.deinterlace {
            &mut self.alt_frame_buffer
        } else {
            &mut self.frame_buffer
        };
        let base = usize::from(line) * SCREEN_WIDTH;
        if base + SCREEN_WIDTH <= target.len() {
            target[base..base + SCREEN_WIDTH].copy_from_slice(&row);
        }
    }

    #[must_use]
    pub fn frame_size(&self) -> FrameSize {
        FrameSize { width: SCREEN_WIDTH as u32, height: FRAME_HEIGHT as u32 }
    }

    #[must_use]
    pub fn display_area(&self) -> DisplayArea {
        DisplayArea { width: SCREEN_WIDTH as u32, height: FRAME_HEIGHT as u32, x: 0, y: 0 }
    }

    /// Copies the composited frame buffer out as RGBA8 colors for a [`sat_common::frontend::Renderer`].
    /// When deinterlacing is active, rows alternate between the primary and alt buffer so a
    /// double-density interlaced source produces a full-height progressive image each frame
    /// (spec.md §3.3 "Deinterlace path").
    #[must_use]
    pub fn composite_frame(&self) -> Vec<Color> {
        let mut out = Vec::with_capacity(SCREEN_WIDTH * FRAME_HEIGHT);
        for line in 0..FRAME_HEIGHT {
            let source = if self.deinterlace && line % 2 == 1 { &self.alt_frame_buffer } else { &self.frame_buffer };
            let base = line * SCREEN_WIDTH;
            for &(r, g, b) in &source[base..base + SCREEN_WIDTH] {
                out.push(Color::rgb(r, g, b));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_common::frontend::TimingMode;

    #[test]
    fn new_vdp_has_correct_frame_dimensions() {
        let vdp = Vdp::new(TimingMode::Ntsc);
        let size = vdp.frame_size();
        assert_eq!(size.width, SCREEN_WIDTH as u32);
        assert_eq!(size.height, FRAME_HEIGHT as u32);
    }

    #[test]
    fn composite_frame_has_expected_pixel_count() {
        let vdp = Vdp::new(TimingMode::Ntsc);
        let frame = vdp.composite_frame();
        assert_eq!(frame.len(), SCREEN_WIDTH * FRAME_HEIGHT);
    }

    #[test]
    fn advancing_through_a_frame_draws_every_active_line() {
        let mut vdp = Vdp::new(TimingMode::Ntsc);
        let mut draws = 0;
        for _ in 0..(600 * 2) {
            let r = vdp.advance();
            if r.draw_line.is_some() {
                draws += 1;
            }
            if r.frame_complete {
                break;
            }
        }
        assert_eq!(draws, FRAME_HEIGHT as u32 as usize);
    }
}
