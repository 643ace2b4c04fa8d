//! VDP2: the background/compositor stage (spec.md §3.3 "VDP2", §4.4).
//!
//! Grounded on the teacher's `genesis-core::vdp` scanline compositor (per-line layer rasterize
//! then priority-sorted composite) generalized from Genesis's fixed 4-layer model to VDP2's six
//! layers, windows, and color calculation.

use bincode::{Decode, Encode};
use sat_common::boxedarray::BoxedByteArray;
use sat_common::num::GetBit;

pub const VRAM2_SIZE: usize = 512 * 1024;
pub const CRAM_SIZE: usize = 4 * 1024;
pub const SCREEN_WIDTH: usize = 320;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Layer {
    Sprite,
    Rbg0,
    Rbg1,
    Nbg0,
    Nbg1,
    Nbg2,
    Nbg3,
}

impl Layer {
    /// Lower index wins ties, per spec.md §3.3's formal tie-break: "sprite first, then RBG0,
    /// RBG0→NBG0→NBG1→NBG2→NBG3".
    fn tie_break_index(self) -> u8 {
        match self {
            Self::Sprite => 0,
            Self::Rbg0 => 1,
            Self::Rbg1 => 2,
            Self::Nbg0 => 3,
            Self::Nbg1 => 4,
            Self::Nbg2 => 5,
            Self::Nbg3 => 6,
        }
    }
}

/// Per-layer window enable (spec.md §4.4 step 3: "precompute the window mask for each layer").
/// The two window rectangles themselves are shared (`WindowRegs::w0`/`w1`); only whether a given
/// layer honors each one, and the AND/OR combination, is per layer.
#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct LayerWindowMask {
    pub w0_enabled: bool,
    pub w1_enabled: bool,
    /// true = AND (both enabled windows must pass), false = OR.
    pub and_logic: bool,
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct ScrollBgRegs {
    pub enabled: bool,
    pub bitmap_mode: bool,
    pub color_format_8bpp: bool,
    pub map_base: u32,
    pub scroll_x: u16,
    pub scroll_y: u16,
    pub priority: u8,
    pub color_calc_enabled: bool,
    pub color_calc_ratio: u8,
    pub window_mask: LayerWindowMask,
}

/// Rotation background parameters (spec.md §4.4 step 2), simplified to a single per-frame affine
/// transform from screen coordinates to map coordinates rather than the real chip's per-line/
/// per-dot coefficient table walk (see DESIGN.md). `matrix_*` are 8.8 fixed-point.
#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct RotationParams {
    pub enabled: bool,
    pub bitmap_mode: bool,
    pub color_format_8bpp: bool,
    pub map_base: u32,
    pub matrix_a: i16,
    pub matrix_b: i16,
    pub matrix_c: i16,
    pub matrix_d: i16,
    pub translate_x: i16,
    pub translate_y: i16,
    pub priority: u8,
    pub color_calc_enabled: bool,
    pub color_calc_ratio: u8,
    pub window_mask: LayerWindowMask,
}

impl RotationParams {
    /// Maps a screen coordinate to a background map coordinate through the affine matrix.
    fn transform(&self, screen_x: u16, line: u16) -> (u16, u16) {
        let sx = i64::from(screen_x);
        let sy = i64::from(line);
        let mx = ((i64::from(self.matrix_a) * sx + i64::from(self.matrix_b) * sy) >> 8)
            + i64::from(self.translate_x);
        let my = ((i64::from(self.matrix_c) * sx + i64::from(self.matrix_d) * sy) >> 8)
            + i64::from(self.translate_y);
        (mx as i32 as u16, my as i32 as u16)
    }
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct WindowRegs {
    pub sprite_mask: LayerWindowMask,
    pub w0: (i16, i16, i16, i16),
    pub w1: (i16, i16, i16, i16),
}

#[derive(Debug, Clone, Copy)]
struct LayerPixel {
    layer: Layer,
    priority: u8,
    color: Option<(u8, u8, u8)>,
    color_calc_enabled: bool,
    color_calc_ratio: u8,
}

#[derive(Clone, Encode, Decode)]
pub struct Vdp2 {
    pub vram: BoxedByteArray<VRAM2_SIZE>,
    pub cram: BoxedByteArray<CRAM_SIZE>,
    pub nbg: [ScrollBgRegs; 4],
    pub rbg: [RotationParams; 2],
    pub back_color_index: u16,
    pub line_color_index: u16,
    pub color_calc_is_additive: bool,
    access_pattern_dirty: bool,
    derived_stride: u32,
}

impl Vdp2 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vram: BoxedByteArray::new(),
            cram: BoxedByteArray::new(),
            nbg: [ScrollBgRegs::default(); 4],
            rbg: [RotationParams::default(); 2],
            back_color_index: 0,
            line_color_index: 0,
            color_calc_is_additive: false,
            access_pattern_dirty: true,
            derived_stride: 64,
        }
    }

    /// Marks the access-pattern derivation dirty. The renderer only recomputes vertical-cell-scroll
    /// stride on this bit rather than on every register write (spec.md §3.3's access-slot note).
    pub fn mark_access_pattern_dirty(&mut self) {
        self.access_pattern_dirty = true;
    }

    /// Dispatches a 16-bit register write against the VDP2 register block (spec.md §4.4, §6.3
    /// address map): four NBG register blocks, two RBG (rotation background) register blocks,
    /// then the back/line color indices and the color calculation mode bit.
    pub fn write_register(&mut self, offset: u32, value: u16) {
        const NBG_STRIDE: u32 = 0x10;
        const NBG_BLOCK_SIZE: u32 = NBG_STRIDE * 4;
        const RBG_BASE: u32 = NBG_BLOCK_SIZE + 0x10;
        const RBG_STRIDE: u32 = 0x20;
        const RBG_BLOCK_SIZE: u32 = RBG_STRIDE * 2;

        if offset < NBG_BLOCK_SIZE {
            let index = (offset / NBG_STRIDE) as usize;
            let reg = offset % NBG_STRIDE;
            let bg = &mut self.nbg[index];
            match reg {
                0x00 => {
                    bg.enabled = value.bit(0);
                    bg.bitmap_mode = value.bit(1);
                    bg.color_format_8bpp = value.bit(2);
                    bg.color_calc_enabled = value.bit(3);
                    bg.window_mask.w0_enabled = value.bit(4);
                    bg.window_mask.w1_enabled = value.bit(5);
                    bg.window_mask.and_logic = value.bit(6);
                }
                0x02 => bg.map_base = u32::from(value),
                0x04 => bg.scroll_x = value,
                0x06 => bg.scroll_y = value,
                0x08 => bg.priority = value as u8,
                0x09 => bg.color_calc_ratio = (value & 0x1F) as u8,
                _ => {}
            }
            self.mark_access_pattern_dirty();
            return;
        }

        if (RBG_BASE..RBG_BASE + RBG_BLOCK_SIZE).contains(&offset) {
            let index = ((offset - RBG_BASE) / RBG_STRIDE) as usize;
            let reg = (offset - RBG_BASE) % RBG_STRIDE;
            let rbg = &mut self.rbg[index];
            match reg {
                0x00 => {
                    rbg.enabled = value.bit(0);
                    rbg.bitmap_mode = value.bit(1);
                    rbg.color_format_8bpp = value.bit(2);
                    rbg.color_calc_enabled = value.bit(3);
                    rbg.window_mask.w0_enabled = value.bit(4);
                    rbg.window_mask.w1_enabled = value.bit(5);
                    rbg.window_mask.and_logic = value.bit(6);
                }
                0x02 => rbg.map_base = u32::from(value),
                0x06 => rbg.matrix_a = value as i16,
                0x08 => rbg.matrix_b = value as i16,
                0x0A => rbg.matrix_c = value as i16,
                0x0C => rbg.matrix_d = value as i16,
                0x0E => rbg.translate_x = value as i16,
                0x10 => rbg.translate_y = value as i16,
                0x12 => rbg.priority = value as u8,
                0x14 => rbg.color_calc_ratio = (value & 0x1F) as u8,
                _ => {}
            }
            self.mark_access_pattern_dirty();
            return;
        }

        match offset {
            NBG_BLOCK_SIZE => self.back_color_index = value,
            x if x == NBG_BLOCK_SIZE + 2 => self.line_color_index = value,
            x if x == NBG_BLOCK_SIZE + 4 => self.color_calc_is_additive = value.bit(0),
            _ => {}
        }
    }

    fn recompute_access_pattern_if_dirty(&mut self) {
        if self.access_pattern_dirty {
            self.derived_stride = 64;
            self.access_pattern_dirty = false;
        }
    }

    fn color_from_cram(&self, index: u16) -> (u8, u8, u8) {
        let offset = (index as usize * 2) % self.cram.len();
        let word = u16::from_be_bytes([self.cram[offset], self.cram[offset + 1]]);
        let r = ((word & 0x1F) as u32 * 255 / 31) as u8;
        let g = (((word >> 5) & 0x1F) as u32 * 255 / 31) as u8;
        let b = (((word >> 10) & 0x1F) as u32 * 255 / 31) as u8;
        (r, g, b)
    }

    /// Walks the plane→page→character-pattern→cell→dot hierarchy for one character-mode layer at
    /// a given map coordinate, per spec.md §4.4 step 5.
    fn sample_character_layer_at(
        &self,
        map_base: u32,
        color_format_8bpp: bool,
        x: u16,
        y: u16,
    ) -> Option<u8> {
        const CELL_SIZE: u16 = 8;
        const PAGE_CELLS: u16 = 32;
        const PAGE_SIZE: u16 = CELL_SIZE * PAGE_CELLS;

        let page_x = x / PAGE_SIZE;
        let page_y = y / PAGE_SIZE;
        let cell_x = (x % PAGE_SIZE) / CELL_SIZE;
        let cell_y = (y % PAGE_SIZE) / CELL_SIZE;
        let dot_x = x % CELL_SIZE;
        let dot_y = y % CELL_SIZE;

        let page_index = u32::from(page_y) * 2 + u32::from(page_x);
        let pattern_name_offset = map_base
            + page_index * 0x800
            + (u32::from(cell_y) * u32::from(PAGE_CELLS) + u32::from(cell_x)) * 2;

        if pattern_name_offset as usize + 1 >= self.vram.len() {
            return None;
        }
        let pattern = u16::from_be_bytes([
            self.vram[pattern_name_offset as usize],
            self.vram[pattern_name_offset as usize + 1],
        ]);
        let character_number = u32::from(pattern & 0x3FFF);
        let palette_bank = ((pattern >> 12) & 0x7) as u8;

        let bytes_per_row = if color_format_8bpp { 8 } else { 4 };
        let char_addr = character_number * 8 * bytes_per_row as u32;
        let row_addr = char_addr + u32::from(dot_y) * bytes_per_row as u32;

        if color_format_8bpp {
            let addr = row_addr as usize + dot_x as usize;
            self.vram.get(addr).copied()
        } else {
            let byte_addr = row_addr as usize + (dot_x / 2) as usize;
            let byte = *self.vram.get(byte_addr)?;
            let nibble = if dot_x % 2 == 0 { byte >> 4 } else { byte & 0xF };
            Some((palette_bank << 4) | nibble)
        }
    }

    /// Indexes directly into a flat VRAM bitmap for one bitmap-mode layer (spec.md §4.4 step 5:
    /// "bitmap BGs index directly into VRAM"), fixed at a 512-dot-wide bitmap.
    fn sample_bitmap_layer_at(
        &self,
        map_base: u32,
        color_format_8bpp: bool,
        x: u16,
        y: u16,
    ) -> Option<u8> {
        const BITMAP_WIDTH: u32 = 512;
        let x = u32::from(x);
        let y = u32::from(y);

        if color_format_8bpp {
            let addr = map_base + y * BITMAP_WIDTH + x;
            self.vram.get(addr as usize).copied()
        } else {
            let addr = map_base + y * (BITMAP_WIDTH / 2) + x / 2;
            let byte = *self.vram.get(addr as usize)?;
            Some(if x % 2 == 0 { byte >> 4 } else { byte & 0xF })
        }
    }

    /// Samples one NBG (scrolling) layer, dispatching to the character or bitmap hierarchy per
    /// `bg.bitmap_mode`.
    fn sample_scroll_layer(&self, bg: &ScrollBgRegs, screen_x: u16, line: u16) -> Option<u8> {
        let x = screen_x.wrapping_add(bg.scroll_x);
        let y = line.wrapping_add(bg.scroll_y);
        if bg.bitmap_mode {
            self.sample_bitmap_layer_at(bg.map_base, bg.color_format_8bpp, x, y)
        } else {
            self.sample_character_layer_at(bg.map_base, bg.color_format_8bpp, x, y)
        }
    }

    /// Samples one RBG (rotation) layer: transforms the screen coordinate through the rotation
    /// matrix, then walks the same character/bitmap hierarchy NBG layers use.
    fn sample_rotation_layer(&self, rbg: &RotationParams, screen_x: u16, line: u16) -> Option<u8> {
        let (x, y) = rbg.transform(screen_x, line);
        if rbg.bitmap_mode {
            self.sample_bitmap_layer_at(rbg.map_base, rbg.color_format_8bpp, x, y)
        } else {
            self.sample_character_layer_at(rbg.map_base, rbg.color_format_8bpp, x, y)
        }
    }

    fn layer_window_pass(win: &WindowRegs, mask: LayerWindowMask, x: i16, y: i16) -> bool {
        if !mask.w0_enabled && !mask.w1_enabled {
            return true;
        }
        let in_w0 = mask.w0_enabled
            && (win.w0.0..=win.w0.2).contains(&x)
            && (win.w0.1..=win.w0.3).contains(&y);
        let in_w1 = mask.w1_enabled
            && (win.w1.0..=win.w1.2).contains(&x)
            && (win.w1.1..=win.w1.3).contains(&y);
        match (mask.w0_enabled, mask.w1_enabled, mask.and_logic) {
            (true, true, true) => in_w0 && in_w1,
            (true, true, false) => in_w0 || in_w1,
            (true, false, _) => in_w0,
            (false, true, _) => in_w1,
            (false, false, _) => true,
        }
    }

    /// Renders one scanline into an RGB888 row, per spec.md §4.4's full per-line algorithm:
    /// rasterize each enabled layer (gated by its own window mask), then composite the top 3
    /// opaque candidates by `(priority, -layer_index)`, applying color calculation between the
    /// top two at the winning layer's blend ratio.
    pub fn render_scanline(
        &mut self,
        line: u16,
        sprite_row: &[Option<(u8, u8, u8, u8)>; SCREEN_WIDTH],
        windows: &WindowRegs,
        out: &mut [(u8, u8, u8); SCREEN_WIDTH],
    ) {
        self.recompute_access_pattern_if_dirty();
        let back_color = self.color_from_cram(self.back_color_index);
        let line_color = self.color_from_cram(self.line_color_index);

        for x in 0..SCREEN_WIDTH {
            let mut candidates: Vec<LayerPixel> = Vec::with_capacity(7);

            if let Some((r, g, b, priority)) = sprite_row[x] {
                if Self::layer_window_pass(windows, windows.sprite_mask, x as i16, line as i16) {
                    candidates.push(LayerPixel {
                        layer: Layer::Sprite,
                        priority,
                        color: Some((r, g, b)),
                        color_calc_enabled: false,
                        color_calc_ratio: 31,
                    });
                }
            }

            for (i, rbg) in self.rbg.iter().enumerate() {
                if !rbg.enabled {
                    continue;
                }
                if !Self::layer_window_pass(windows, rbg.window_mask, x as i16, line as i16) {
                    continue;
                }
                let layer = if i == 0 { Layer::Rbg0 } else { Layer::Rbg1 };
                if let Some(index) = self.sample_rotation_layer(rbg, x as u16, line) {
                    if index != 0 {
                        candidates.push(LayerPixel {
                            layer,
                            priority: rbg.priority,
                            color: Some(self.color_from_cram(u16::from(index))),
                            color_calc_enabled: rbg.color_calc_enabled,
                            color_calc_ratio: rbg.color_calc_ratio,
                        });
                    }
                }
            }

            for (i, bg) in self.nbg.iter().enumerate() {
                if !bg.enabled {
                    continue;
                }
                if !Self::layer_window_pass(windows, bg.window_mask, x as i16, line as i16) {
                    continue;
                }
                let layer = match i {
                    0 => Layer::Nbg0,
                    1 => Layer::Nbg1,
                    2 => Layer::Nbg2,
                    _ => Layer::Nbg3,
                };
                if let Some(index) = self.sample_scroll_layer(bg, x as u16, line) {
                    if index != 0 {
                        candidates.push(LayerPixel {
                            layer,
                            priority: bg.priority,
                            color: Some(self.color_from_cram(u16::from(index))),
                            color_calc_enabled: bg.color_calc_enabled,
                            color_calc_ratio: bg.color_calc_ratio,
                        });
                    }
                }
            }

            candidates.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.layer.tie_break_index().cmp(&b.layer.tie_break_index()))
            });

            out[x] = match candidates.first() {
                None => back_color,
                Some(top) => {
                    let top_color = top.color.unwrap_or(back_color);
                    if top.color_calc_enabled {
                        if let Some(second) = candidates.get(1).and_then(|p| p.color) {
                            self.blend(top_color, second, top.color_calc_ratio)
                        } else {
                            self.blend(top_color, line_color, top.color_calc_ratio)
                        }
                    } else {
                        top_color
                    }
                }
            };
        }
    }

    /// Blends two colors. Additive mode ignores `ratio` (real hardware's additive blend has no
    /// rate control); rate mode weights `top` by `ratio / 31`.
    fn blend(&self, top: (u8, u8, u8), bottom: (u8, u8, u8), ratio: u8) -> (u8, u8, u8) {
        if self.color_calc_is_additive {
            (
                top.0.saturating_add(bottom.0),
                top.1.saturating_add(bottom.1),
                top.2.saturating_add(bottom.2),
            )
        } else {
            let ratio = u16::from(ratio.min(31));
            let weighted = |t: u8, b: u8| -> u8 {
                ((u16::from(t) * ratio + u16::from(b) * (31 - ratio)) / 31) as u8
            };
            (weighted(top.0, bottom.0), weighted(top.1, bottom.1), weighted(top.2, bottom.2))
        }
    }
}

impl Default for Vdp2 {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches a 16-bit write into the window register block owned by the parent [`super::Vdp`]
/// rather than `Vdp2` itself, since both VDP1 and VDP2 rasterizers read the same window mask
/// (spec.md §4.4 step 3). This block only carries the two shared window rectangles and the
/// sprite layer's own window mask; each NBG/RBG layer's window mask is packed into that layer's
/// own control word (see `Vdp2::write_register`).
pub fn apply_window_register(windows: &mut WindowRegs, offset: u32, value: u16) {
    match offset {
        0x00 => {
            windows.sprite_mask.w0_enabled = value.bit(0);
            windows.sprite_mask.w1_enabled = value.bit(1);
            windows.sprite_mask.and_logic = value.bit(2);
        }
        0x02 => windows.w0.0 = value as i16,
        0x04 => windows.w0.1 = value as i16,
        0x06 => windows.w0.2 = value as i16,
        0x08 => windows.w0.3 = value as i16,
        0x0A => windows.w1.0 = value as i16,
        0x0C => windows.w1.1 = value as i16,
        0x0E => windows.w1.2 = value as i16,
        0x10 => windows.w1.3 = value as i16,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_beats_nbg_at_equal_priority() {
        let mut vdp2 = Vdp2::new();
        vdp2.nbg[0].enabled = true;
        vdp2.nbg[0].priority = 3;
        vdp2.nbg[0].color_format_8bpp = true;
        // Write one nonzero 8bpp pixel at character 0, dot (0,0).
        vdp2.vram[0] = 5;

        let mut sprite_row = [None; SCREEN_WIDTH];
        sprite_row[0] = Some((10, 20, 30, 3));
        let windows = WindowRegs::default();
        let mut out = [(0u8, 0u8, 0u8); SCREEN_WIDTH];
        vdp2.render_scanline(0, &sprite_row, &windows, &mut out);
        assert_eq!(out[0], (10, 20, 30));
    }

    #[test]
    fn window_exclusion_falls_back_to_back_color() {
        let mut vdp2 = Vdp2::new();
        // Back color stays black (CRAM index 0, left zeroed). A second CRAM entry holds a
        // distinct color that the NBG0 layer points at, so a window-excluded pixel is
        // distinguishable from one that reaches compositing.
        vdp2.cram[4] = 0x7F;
        vdp2.cram[5] = 0xFF;
        vdp2.nbg[0].enabled = true;
        vdp2.nbg[0].priority = 1;
        vdp2.nbg[0].color_format_8bpp = true;
        vdp2.nbg[0].window_mask.w0_enabled = true;
        // Pattern name entry for the cell covering x=150 (cell_x = 150/8 = 18) points at
        // character 1; that character's row-0 dot-6 byte (150%8 = 6) carries palette index 2.
        let pattern_name_offset = 18 * 2;
        vdp2.vram[pattern_name_offset] = 0;
        vdp2.vram[pattern_name_offset + 1] = 1;
        let char_addr: usize = 64; // character 1 * 8 rows * 8 bytes/row.
        vdp2.vram[char_addr + 6] = 2;

        let sprite_row = [None; SCREEN_WIDTH];
        let windows = WindowRegs { w0: (100, 0, 200, 300), ..Default::default() };
        let mut out = [(0u8, 0u8, 0u8); SCREEN_WIDTH];
        vdp2.render_scanline(0, &sprite_row, &windows, &mut out);
        assert_eq!(out[0], (0, 0, 0));
        assert_ne!(out[150], (0, 0, 0));
    }

    #[test]
    fn rotation_background_samples_through_its_affine_transform() {
        let mut vdp2 = Vdp2::new();
        vdp2.rbg[0].enabled = true;
        vdp2.rbg[0].priority = 1;
        vdp2.rbg[0].color_format_8bpp = true;
        // Identity matrix (1.0 in 8.8 fixed point), no translation: screen coords pass through.
        vdp2.rbg[0].matrix_a = 0x0100;
        vdp2.rbg[0].matrix_d = 0x0100;
        vdp2.vram[0] = 9;

        let sprite_row = [None; SCREEN_WIDTH];
        let windows = WindowRegs::default();
        let mut out = [(0u8, 0u8, 0u8); SCREEN_WIDTH];
        vdp2.render_scanline(0, &sprite_row, &windows, &mut out);
        assert_ne!(out[0], (0, 0, 0));
    }

    #[test]
    fn bitmap_mode_samples_vram_directly_instead_of_the_character_hierarchy() {
        let mut vdp2 = Vdp2::new();
        vdp2.nbg[0].enabled = true;
        vdp2.nbg[0].priority = 1;
        vdp2.nbg[0].color_format_8bpp = true;
        vdp2.nbg[0].bitmap_mode = true;
        vdp2.cram[2] = 0x7F;
        vdp2.cram[3] = 0xFF;
        vdp2.vram[0] = 1; // Bitmap dot (0,0) directly, no pattern-name indirection.

        let sprite_row = [None; SCREEN_WIDTH];
        let windows = WindowRegs::default();
        let mut out = [(0u8, 0u8, 0u8); SCREEN_WIDTH];
        vdp2.render_scanline(0, &sprite_row, &windows, &mut out);
        assert_ne!(out[0], (0, 0, 0));
    }
}
