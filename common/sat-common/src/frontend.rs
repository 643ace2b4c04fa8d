mod finitefloat;

use bincode::{Decode, Encode};
pub use finitefloat::{FiniteF32, FiniteF64};
use sat_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};
use std::fmt::{Debug, Display, Formatter};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable, Encode, Decode)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    #[must_use]
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DisplayArea {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Rendering options that are not required to be explicitly specified, unlike frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderFrameOptions {
    pub pixel_aspect_ratio: Option<FiniteF64>,
    pub deinterlace: bool,
}

pub trait Renderer {
    type Err;

    /// Render a completed video frame.
    ///
    /// # Errors
    ///
    /// This method will return an error if it is unable to render the frame.
    fn render_frame(
        &mut self,
        frame_buffer: &[Color],
        frame_size: FrameSize,
        options: RenderFrameOptions,
    ) -> Result<(), Self::Err>;
}

pub trait AudioOutput {
    type Err;

    /// Push a stereo audio sample, produced at exactly 44.1 kHz (§4.6).
    ///
    /// # Errors
    ///
    /// This method will return an error if it is unable to push the sample to the audio device.
    fn push_sample(&mut self, sample_l: f64, sample_r: f64) -> Result<(), Self::Err>;
}

pub trait SaveWriter {
    type Err;

    /// Read an array of bytes using the given extension (e.g. backup RAM, `"bkr"`).
    ///
    /// # Errors
    ///
    /// Will propagate any errors encountered while reading the file.
    fn load_bytes(&mut self, extension: &str) -> Result<Vec<u8>, Self::Err>;

    /// Write a slice of bytes using the given extension.
    ///
    /// # Errors
    ///
    /// Will propagate any errors encountered while writing the file.
    fn persist_bytes(&mut self, extension: &str, bytes: &[u8]) -> Result<(), Self::Err>;
}

pub trait PartialClone {
    /// Create a partial clone of `self`, which clones all emulation state but may not clone
    /// read-only fields such as ROMs/discs and frame buffers.
    #[must_use]
    fn partial_clone(&self) -> Self;
}

pub use sat_proc_macros::PartialClone;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumFromStr, EnumAll,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimingMode {
    #[default]
    Ntsc,
    Pal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEffect {
    None,
    FrameRendered,
}

pub type TickResult<Err> = Result<TickEffect, Err>;

/// Map a viewport-relative pointer position to a position within the rendered frame buffer,
/// used by the light gun peripheral (§6.2) to convert host cursor coordinates to Saturn screen
/// coordinates.
#[inline]
#[must_use]
pub fn viewport_position_to_frame_position(
    x: i32,
    y: i32,
    frame_size: FrameSize,
    display_area: DisplayArea,
) -> Option<(u16, u16)> {
    let display_left = display_area.x as i32;
    let display_right = display_left + display_area.width as i32;
    let display_top = display_area.y as i32;
    let display_bottom = display_top + display_area.height as i32;

    if !(display_left..display_right).contains(&x) || !(display_top..display_bottom).contains(&y) {
        return None;
    }

    let x: f64 = x.into();
    let y: f64 = y.into();
    let display_left: f64 = display_left.into();
    let display_width: f64 = display_area.width.into();
    let frame_width: f64 = frame_size.width.into();
    let display_top: f64 = display_top.into();
    let display_height: f64 = display_area.height.into();
    let frame_height: f64 = frame_size.height.into();

    let frame_x = ((x - display_left) * frame_width / display_width).round() as u16;
    let frame_y = ((y - display_top) * frame_height / display_height).round() as u16;

    Some((frame_x, frame_y))
}

impl Display for DisplayArea {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

pub trait EmulatorError: Debug + Display + Send + Sync + 'static {}

impl<T: Debug + Display + Send + Sync + 'static> EmulatorError for T {}
