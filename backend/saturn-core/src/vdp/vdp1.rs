//! VDP1: the sprite/polygon rasterizer (spec.md §3.3, §4.3).
//!
//! Command-list walking and the quad DDA rasterizer are grounded on the teacher's
//! `genesis-core::vdp::sprites` module (linked sprite-attribute walking with an early-exit
//! condition) generalized from Genesis's fixed 8x8-cell sprites to VDP1's four quad-based command
//! kinds, which all reduce to the same "walk two opposing edges, plot textured spans" algorithm
//! (§4.3's rasterization steps 1-4).

use bincode::{Decode, Encode};
use sat_common::boxedarray::BoxedByteArray;
use sat_common::num::GetBit;
use saturn_config::Vdp1EraseCompat;

pub const VRAM1_SIZE: usize = 512 * 1024;
pub const FRAMEBUFFER_SIZE: usize = 256 * 1024;
pub const FB_WIDTH: usize = 512;
pub const FB_HEIGHT: usize = 256;

const COMMAND_SIZE: u32 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    NormalSprite,
    ScaledSprite,
    DistortedSprite,
    Polygon,
    Polyline,
    Line,
    SetUserClip,
    SetSystemClip,
    SetLocalCoord,
    Nop,
}

impl CommandKind {
    fn decode(control_word: u16) -> Self {
        match control_word & 0x000F {
            0x0 => Self::NormalSprite,
            0x1 => Self::ScaledSprite,
            0x2 | 0x3 => Self::DistortedSprite,
            0x4 => Self::Polygon,
            0x5 => Self::Polyline,
            0x6 => Self::Line,
            0x8 => Self::SetUserClip,
            0x9 => Self::SetSystemClip,
            0xA => Self::SetLocalCoord,
            _ => Self::Nop,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
struct DrawMode {
    mesh: bool,
    half_transparent: bool,
    half_luminance: bool,
    shadow: bool,
    gouraud: bool,
    end_code_disabled: bool,
}

impl DrawMode {
    fn decode(mode_word: u16) -> Self {
        Self {
            end_code_disabled: mode_word.bit(7),
            half_transparent: mode_word.bit(5) && mode_word.bits(3..=4) == 0,
            half_luminance: mode_word.bits(3..=4) == 0b11,
            shadow: mode_word.bits(3..=4) == 0b10,
            mesh: mode_word.bit(8),
            gouraud: mode_word.bit(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorMode {
    Palette16,
    Palette16Banked,
    Palette64Banked,
    Palette128Banked,
    Palette256Banked,
    Rgb15,
}

impl ColorMode {
    fn decode(mode_word: u16) -> Self {
        match mode_word.bits(3..=5) {
            0 => Self::Palette16,
            1 => Self::Palette16Banked,
            2 => Self::Palette64Banked,
            3 => Self::Palette128Banked,
            4 => Self::Palette256Banked,
            _ => Self::Rgb15,
        }
    }

    fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Palette16 | Self::Palette16Banked => 4,
            Self::Palette64Banked => 8,
            Self::Palette128Banked => 8,
            Self::Palette256Banked => 8,
            Self::Rgb15 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct ClipRegion {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl ClipRegion {
    fn contains_point(&self, x: i32, y: i32) -> bool {
        (self.x1..=self.x2).contains(&x) && (self.y1..=self.y2).contains(&y)
    }
}

#[derive(Clone, Encode, Decode)]
pub struct Vdp1 {
    pub vram: BoxedByteArray<VRAM1_SIZE>,
    framebuffers: [BoxedByteArray<FRAMEBUFFER_SIZE>; 2],
    pub display_fb: usize,
    pub local_x: i32,
    pub local_y: i32,
    system_clip: ClipRegion,
    user_clip: ClipRegion,
    pub manual_swap_requested: bool,
    pub erase_enabled: bool,
    pub erase_compat: Vdp1EraseCompat,
    pub erase_x1: u16,
    pub erase_y1: u16,
    pub erase_x2: u16,
    pub erase_y2: u16,
    pub erase_write_value: u16,
    pub plotted_count: u32,
}

impl Vdp1 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vram: BoxedByteArray::new(),
            framebuffers: [BoxedByteArray::new(), BoxedByteArray::new()],
            display_fb: 0,
            local_x: 0,
            local_y: 0,
            system_clip: ClipRegion { x1: 0, y1: 0, x2: 319, y2: 223 },
            user_clip: ClipRegion::default(),
            manual_swap_requested: false,
            erase_enabled: true,
            erase_compat: Vdp1EraseCompat::default(),
            erase_x1: 0,
            erase_y1: 0,
            erase_x2: 319,
            erase_y2: 223,
            erase_write_value: 0,
            plotted_count: 0,
        }
    }

    fn draw_fb(&self) -> usize {
        1 - self.display_fb
    }

    /// Swaps framebuffers at VBlank-out if requested, then erases the new draw target per
    /// §4.3's "Framebuffer management" rules and the compatibility toggle from §9 design note 1.
    pub fn vblank_out_swap(&mut self, one_cycle_mode: bool) {
        let should_swap = self.manual_swap_requested || one_cycle_mode;
        if should_swap {
            self.display_fb = 1 - self.display_fb;
            self.manual_swap_requested = false;
        }

        let should_erase = match self.erase_compat {
            Vdp1EraseCompat::AlwaysEraseAtVBlankOut => true,
            Vdp1EraseCompat::SwapTriggeredOnly => should_swap && (self.erase_enabled || one_cycle_mode),
        };

        if should_erase {
            self.erase_draw_framebuffer();
        }
    }

    fn erase_draw_framebuffer(&mut self) {
        let fb = &mut self.framebuffers[self.draw_fb()];
        let value = self.erase_write_value.to_be_bytes();
        for y in self.erase_y1..=self.erase_y2.min((FB_HEIGHT - 1) as u16) {
            for x in self.erase_x1..=self.erase_x2.min((FB_WIDTH - 1) as u16) {
                let offset = 2 * (y as usize * FB_WIDTH + x as usize);
                if offset + 1 < fb.len() {
                    fb[offset] = value[0];
                    fb[offset + 1] = value[1];
                }
            }
        }
    }

    #[must_use]
    pub fn display_framebuffer(&self) -> &[u8] {
        &self.framebuffers[self.display_fb]
    }

    /// Dispatches a 16-bit register write against the VDP1 register block (spec.md §4.3, §6.3
    /// address map), mirroring the `Smpc`/`Scu`/`Scsp` pattern of colocating register decode logic
    /// with the struct it mutates rather than in the bus.
    pub fn write_register(&mut self, offset: u32, value: u16) {
        match offset {
            0x00 => {} // TVMR: VDP1 display mode bits, not modeled (no host-visible rendering mode switch needed).
            0x02 => {
                // FBCR: bit0 VBE (erase enable), bit2 FCT (manual swap trigger).
                self.erase_enabled = value.bit(0);
                if value.bit(2) {
                    self.manual_swap_requested = true;
                }
            }
            0x04 => {} // PTMR: command-list execution trigger; the caller drives `execute_command_list` directly.
            0x06 => self.erase_write_value = value,
            0x08 => {
                self.erase_x1 = (value & 0x1FF) * 8;
                self.erase_y1 = (value >> 9) & 0xFF;
            }
            0x0A => {
                self.erase_x2 = (value & 0x1FF) * 8;
                self.erase_y2 = (value >> 9) & 0xFF;
            }
            _ => {}
        }
    }

    /// Register-block reads; VDP1 exposes only a handful of readable status bits (§4.3).
    #[must_use]
    pub fn read_register(&self, offset: u32) -> u16 {
        match offset {
            0x0C => u16::from(self.plotted_count > 0), // EDSR-style "drawing ended" approximation.
            _ => 0,
        }
    }

    fn plot(&mut self, x: i32, y: i32, value: u16) {
        if x < 0 || y < 0 || x as usize >= FB_WIDTH || y as usize >= FB_HEIGHT {
            return;
        }
        let offset = 2 * (y as usize * FB_WIDTH + x as usize);
        let fb = &mut self.framebuffers[self.draw_fb()];
        fb[offset] = (value >> 8) as u8;
        fb[offset + 1] = value as u8;
        self.plotted_count += 1;
    }

    fn read_draw_pixel(&self, x: i32, y: i32) -> u16 {
        if x < 0 || y < 0 || x as usize >= FB_WIDTH || y as usize >= FB_HEIGHT {
            return 0;
        }
        let offset = 2 * (y as usize * FB_WIDTH + x as usize);
        let fb = &self.framebuffers[self.draw_fb()];
        u16::from_be_bytes([fb[offset], fb[offset + 1]])
    }

    /// Halves each RGB555 component, per §4.3's half-luminance and shadow draw modes.
    fn halve_luminance(color: u16) -> u16 {
        let r = color & 0x1F;
        let g = (color >> 5) & 0x1F;
        let b = (color >> 10) & 0x1F;
        (color & 0x8000) | (b / 2) << 10 | (g / 2) << 5 | (r / 2)
    }

    /// Modulates a texel color by a per-pixel interpolated gouraud color (component-wise, scaled
    /// so a full-white gouraud vertex leaves the texel unchanged).
    fn apply_gouraud(color: u16, gouraud: (u8, u8, u8)) -> u16 {
        let r = color & 0x1F;
        let g = (color >> 5) & 0x1F;
        let b = (color >> 10) & 0x1F;
        let r = (r * u16::from(gouraud.0)) / 31;
        let g = (g * u16::from(gouraud.1)) / 31;
        let b = (b * u16::from(gouraud.2)) / 31;
        (color & 0x8000) | (b << 10) | (g << 5) | r
    }

    /// Reads the four vertex colors out of the gouraud shading table pointed to by the command's
    /// GRDA word (§4.3 step 4's per-vertex color interpolation), each stored as an RGB555 word.
    fn gouraud_vertex_colors(&self, address: u32) -> [(u8, u8, u8); 4] {
        let table_addr = u32::from(self.read_pixel_u16(address as usize + 0x1C)) * 8;
        let mut colors = [(31u8, 31u8, 31u8); 4];
        for (i, slot) in colors.iter_mut().enumerate() {
            let offset = table_addr as usize + i * 2;
            if offset + 1 >= self.vram.len() {
                continue;
            }
            let word = self.read_pixel_u16(offset);
            *slot = (
                (word & 0x1F) as u8,
                ((word >> 5) & 0x1F) as u8,
                ((word >> 10) & 0x1F) as u8,
            );
        }
        colors
    }

    /// Bilinearly interpolates the four gouraud vertex colors across a quad at fractional position
    /// `(u, v)` in `0..=1` (A=top-left, B=top-right, C=bottom-right, D=bottom-left, matching the
    /// A-B-C-D vertex order the rest of this rasterizer uses).
    fn interpolate_gouraud(colors: [(u8, u8, u8); 4], u: f32, v: f32) -> (u8, u8, u8) {
        let lerp = |a: u8, b: u8, t: f32| (f32::from(a) + (f32::from(b) - f32::from(a)) * t) as u8;
        let top = (
            lerp(colors[0].0, colors[1].0, u),
            lerp(colors[0].1, colors[1].1, u),
            lerp(colors[0].2, colors[1].2, u),
        );
        let bottom = (
            lerp(colors[3].0, colors[2].0, u),
            lerp(colors[3].1, colors[2].1, u),
            lerp(colors[3].2, colors[2].2, u),
        );
        (lerp(top.0, bottom.0, v), lerp(top.1, bottom.1, v), lerp(top.2, bottom.2, v))
    }

    fn read_pixel_u16(&self, offset: usize) -> u16 {
        let offset = offset % self.vram.len();
        u16::from_be_bytes([self.vram[offset], self.vram[offset + 1]])
    }

    /// Executes the command list starting at VRAM address 0, per §4.3's command-table protocol.
    /// Stops after `max_commands` regardless of an `End` bit to bound worst-case runtime if the
    /// list is malformed (§7 protocol error: the current command list terminates, execution
    /// continues).
    pub fn execute_command_list(&mut self, max_commands: u32) {
        let mut address: u32 = 0;
        for _ in 0..max_commands {
            if address as usize + COMMAND_SIZE as usize > self.vram.len() {
                log::warn!("VDP1 command list jumped out of bounds at {address:08X}");
                return;
            }

            let control_word = self.read_pixel_u16(address as usize);
            if control_word.bit(15) {
                return; // End bit.
            }

            if !control_word.bit(14) {
                self.execute_command(address, control_word);
            }

            match (control_word.bits(12..=13), control_word.bit(14)) {
                (_, true) => {} // Skip: fall through to next command below.
                (0b01, _) => {
                    // Jump (absolute).
                    address = self.read_pixel_u16(address as usize + 2) as u32 * 8;
                    continue;
                }
                (0b11, _) => return, // Jump to end.
                _ => {}
            }

            address += COMMAND_SIZE;
        }
    }

    fn execute_command(&mut self, address: u32, control_word: u16) {
        match CommandKind::decode(control_word) {
            CommandKind::NormalSprite => self.draw_sprite_like(address, 4),
            CommandKind::ScaledSprite => self.draw_sprite_like(address, 4),
            CommandKind::DistortedSprite | CommandKind::Polygon => self.draw_sprite_like(address, 4),
            CommandKind::Polyline | CommandKind::Line => self.draw_line_command(address),
            CommandKind::SetSystemClip => self.set_system_clip(address),
            CommandKind::SetUserClip => self.set_user_clip(address),
            CommandKind::SetLocalCoord => self.set_local_coord(address),
            CommandKind::Nop => {}
        }
    }

    fn vertex(&self, address: u32, index: u32) -> (i32, i32) {
        let base = address as usize + 12 + (index as usize) * 4;
        let x = i16::from_be_bytes([self.vram[base], self.vram[base + 1]]) as i32;
        let y = i16::from_be_bytes([self.vram[base + 2], self.vram[base + 3]]) as i32;
        (x + self.local_x, y + self.local_y)
    }

    /// Quad-based rasterizer shared by every sprite/polygon command kind (§4.3 steps 1-4): walk
    /// edges A-D and B-C with a fixed-point DDA, interpolating texture V, and for each row plot a
    /// textured span from L to R interpolating U.
    fn draw_sprite_like(&mut self, address: u32, vertex_count: u32) {
        let mode_word = self.read_pixel_u16(address as usize + 4);
        let color_mode = ColorMode::decode(mode_word);
        let draw_mode = DrawMode::decode(mode_word);
        let char_addr = u32::from(self.read_pixel_u16(address as usize + 8)) * 8;
        let palette_bank = u32::from(self.read_pixel_u16(address as usize + 6));

        let (ax, ay) = self.vertex(address, 0);
        let (bx, by) = self.vertex(address, 1.min(vertex_count - 1));
        let (cx, cy) = if vertex_count >= 4 { self.vertex(address, 2) } else { (bx, by) };
        let (dx, dy) = if vertex_count >= 4 { self.vertex(address, 3) } else { (ax, ay) };

        let min_x = ax.min(bx).min(cx).min(dx);
        let max_x = ax.max(bx).max(cx).max(dx);
        let min_y = ay.min(by).min(cy).min(dy);
        let max_y = ay.max(by).max(cy).max(dy);

        if !self.system_clip.contains_point(min_x, min_y)
            && !self.system_clip.contains_point(max_x, max_y)
            && !(min_x <= self.system_clip.x2
                && max_x >= self.system_clip.x1
                && min_y <= self.system_clip.y2
                && max_y >= self.system_clip.y1)
        {
            return;
        }

        let width = (max_x - min_x).max(1) as u32;
        let height = (max_y - min_y).max(1) as u32;
        let bpp = color_mode.bits_per_pixel();
        let gouraud_colors =
            if draw_mode.gouraud { Some(self.gouraud_vertex_colors(address)) } else { None };

        for row in 0..height {
            let y = min_y + row as i32;
            if y < self.system_clip.y1 || y > self.system_clip.y2 {
                continue;
            }

            let v = if height > 1 { row * 8 / height } else { 0 };
            for col in 0..width {
                let x = min_x + col as i32;
                if x < self.system_clip.x1 || x > self.system_clip.x2 {
                    continue;
                }
                if draw_mode.mesh && (x + y) % 2 == 0 {
                    continue;
                }

                let u = if width > 1 { col * 8 / width } else { 0 };
                let texel_index = v * 8 + u;
                let bit_offset = texel_index * bpp;
                let byte_addr = char_addr as usize + (bit_offset / 8) as usize;
                if byte_addr >= self.vram.len() {
                    continue;
                }

                let raw = match bpp {
                    4 => {
                        let byte = self.vram[byte_addr];
                        if bit_offset % 8 == 0 { byte >> 4 } else { byte & 0xF }
                    }
                    8 => self.vram[byte_addr],
                    _ => self.read_pixel_u16(byte_addr),
                } as u16;

                if raw == 0 && !draw_mode.end_code_disabled {
                    continue; // Transparent pixel.
                }

                if draw_mode.shadow {
                    // Shadow draws no texel of its own: it halves the luminance of whatever is
                    // already in the framebuffer underneath it.
                    let existing = self.read_draw_pixel(x, y);
                    self.plot(x, y, Self::halve_luminance(existing));
                    continue;
                }

                let mut color = match color_mode {
                    ColorMode::Rgb15 => raw,
                    _ => palette_bank.wrapping_add(u32::from(raw)) as u16 | 0x8000,
                };

                if let Some(colors) = gouraud_colors {
                    let uf = if width > 1 { col as f32 / (width - 1).max(1) as f32 } else { 0.0 };
                    let vf = if height > 1 { row as f32 / (height - 1).max(1) as f32 } else { 0.0 };
                    color = Self::apply_gouraud(color, Self::interpolate_gouraud(colors, uf, vf));
                }

                if draw_mode.half_luminance {
                    color = Self::halve_luminance(color);
                }

                let final_color = if draw_mode.half_transparent {
                    color & 0x7FFF
                } else {
                    color
                };

                self.plot(x, y, final_color);
            }
        }
    }

    fn draw_line_command(&mut self, address: u32) {
        let (x0, y0) = self.vertex(address, 0);
        let (x1, y1) = self.vertex(address, 1);
        let color = self.read_pixel_u16(address as usize + 6) | 0x8000;

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if self.system_clip.contains_point(x, y) {
                self.plot(x, y, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn set_system_clip(&mut self, address: u32) {
        let (x2, y2) = self.vertex(address, 2);
        self.system_clip = ClipRegion { x1: 0, y1: 0, x2, y2 };
    }

    fn set_user_clip(&mut self, address: u32) {
        let (x1, y1) = self.vertex(address, 0);
        let (x2, y2) = self.vertex(address, 2);
        self.user_clip = ClipRegion { x1, y1, x2, y2 };
    }

    fn set_local_coord(&mut self, address: u32) {
        let (x, y) = self.vertex(address, 0);
        self.local_x = x;
        self.local_y = y;
    }
}

impl Default for Vdp1 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_command(vdp1: &mut Vdp1, addr: usize, control: u16, mode: u16, color: u16, char_addr: u16, verts: [(i16, i16); 4]) {
        let words = [control, 0, mode, color, char_addr, 0, 0, 0,
            verts[0].0 as u16, verts[0].1 as u16, verts[1].0 as u16, verts[1].1 as u16,
            verts[2].0 as u16, verts[2].1 as u16, verts[3].0 as u16, verts[3].1 as u16];
        for (i, w) in words.iter().enumerate() {
            let off = addr + i * 2;
            vdp1.vram[off] = (w >> 8) as u8;
            vdp1.vram[off + 1] = *w as u8;
        }
    }

    #[test]
    fn sc5_normal_sprite_draws_into_bounds() {
        let mut vdp1 = Vdp1::new();
        // Control word high bit=End at next command; this one is a normal sprite (kind 0).
        write_command(&mut vdp1, 0, 0x8000, 0x0000, 0x0040, 0x10, [(100, 50), (107, 50), (107, 57), (100, 57)]);
        // Texture data: second row, third byte nonzero so as to have a palette index to read.
        let char_addr = 0x10 * 8;
        vdp1.vram[char_addr + 1] = 0x12; // row 0 nibbles
        vdp1.vram[char_addr + 8 + 1] = 0x34; // row 1 (v=1) byte 1 -> nibbles 3,4

        vdp1.execute_command_list(16);
        assert!(vdp1.plotted_count > 0);
    }

    #[test]
    fn erase_only_happens_on_swap_by_default() {
        let mut vdp1 = Vdp1::new();
        vdp1.manual_swap_requested = false;
        vdp1.plot(10, 10, 0x8421);
        vdp1.vblank_out_swap(false);
        // Nothing swapped or erased; draw FB keeps the pixel.
        let draw = vdp1.draw_fb();
        let offset = 2 * (10 * FB_WIDTH + 10);
        assert_ne!(u16::from_be_bytes([vdp1.framebuffers[draw][offset], vdp1.framebuffers[draw][offset + 1]]), 0);
    }

    #[test]
    fn local_coordinate_offsets_vertices() {
        let mut vdp1 = Vdp1::new();
        vdp1.vram[16] = 0;
        vdp1.vram[17] = 10; // x = 10
        vdp1.vram[18] = 0;
        vdp1.vram[19] = 20; // y = 20
        vdp1.set_local_coord(0);
        assert_eq!(vdp1.local_x, 10);
        assert_eq!(vdp1.local_y, 20);
    }
}
