//! Configuration types for the Saturn emulator core (spec.md §6, §9 design notes).
//!
//! Mirrors the shape of the teacher's per-system config crates: plain structs/enums carrying
//! `Encode`/`Decode` for save-state round-tripping plus `EnumAll`/`EnumDisplay`/`EnumFromStr` for
//! frontend settings UIs, aggregated into one `SaturnEmulatorConfig` passed into `Saturn::new` /
//! `Saturn::reload_config`.

use bincode::{Decode, Encode};
use sat_common::frontend::TimingMode;
use sat_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};

/// §6.1 `insert_cartridge` variant. The DRAM variants are the Saturn's "RAM expansion cart" family;
/// game carts with backup RAM or mask ROM use the other two.
#[derive(Debug, Clone, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CartridgeVariant {
    None,
    Dram8Mbit,
    Dram32Mbit,
    Dram48Mbit,
    Rom(Vec<u8>),
    BackupMemory(Vec<u8>),
}

impl Default for CartridgeVariant {
    fn default() -> Self {
        Self::None
    }
}

impl CartridgeVariant {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Dram8Mbit => "8Mbit DRAM",
            Self::Dram32Mbit => "32Mbit DRAM",
            Self::Dram48Mbit => "48Mbit DRAM",
            Self::Rom(..) => "ROM cartridge",
            Self::BackupMemory(..) => "Backup memory cartridge",
        }
    }
}

/// §6.1 peripheral port device catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumFromStr, EnumAll,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeripheralKind {
    #[default]
    ControlPad,
    AnalogPad,
    ArcadeRacer,
    MissionStick,
    ShuttleMouse,
    VirtuaGun,
    None,
}

/// §6.2 `PeripheralReport` tagged union. Button fields use the released=1 convention documented
/// there; bit layout is Up/Down/Left/Right/A/B/C/X/Y/Z/L/R/Start from bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum PeripheralReport {
    ControlPad { buttons: u16 },
    AnalogPad { buttons: u16, analog_flag: bool, x: u8, y: u8, l: u8, r: u8 },
    ArcadeRacer { buttons: u16, wheel: u8 },
    MissionStick { buttons: u16, six_axis_flag: bool, x1: u8, y1: u8, z1: u8, x2: u8, y2: u8, z2: u8 },
    ShuttleMouse { dx: i16, dy: i16, left: bool, right: bool, middle: bool, start: bool },
    VirtuaGun { trigger: bool, start: bool, reload: bool, x: u16, y: u16 },
    None,
}

impl PeripheralReport {
    /// `(0xFFFF, 0xFFFF)` means the light gun is pointed off-screen (§6.2).
    pub const GUN_OFFSCREEN: (u16, u16) = (0xFFFF, 0xFFFF);

    #[must_use]
    pub fn kind(&self) -> PeripheralKind {
        match self {
            Self::ControlPad { .. } => PeripheralKind::ControlPad,
            Self::AnalogPad { .. } => PeripheralKind::AnalogPad,
            Self::ArcadeRacer { .. } => PeripheralKind::ArcadeRacer,
            Self::MissionStick { .. } => PeripheralKind::MissionStick,
            Self::ShuttleMouse { .. } => PeripheralKind::ShuttleMouse,
            Self::VirtuaGun { .. } => PeripheralKind::VirtuaGun,
            Self::None => PeripheralKind::None,
        }
    }

    #[must_use]
    pub fn released() -> Self {
        Self::ControlPad { buttons: ControlPadButton::ALL_RELEASED }
    }
}

/// Button bit layout shared by `ControlPad`/`AnalogPad`/`ArcadeRacer`/`MissionStick` (§6.2),
/// released=1.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPadButton {
    Up = 1 << 0,
    Down = 1 << 1,
    Left = 1 << 2,
    Right = 1 << 3,
    A = 1 << 4,
    B = 1 << 5,
    C = 1 << 6,
    X = 1 << 7,
    Y = 1 << 8,
    Z = 1 << 9,
    L = 1 << 10,
    R = 1 << 11,
    Start = 1 << 12,
}

impl ControlPadButton {
    pub const ALL_RELEASED: u16 = 0x1FFF;
}

/// §6.4 region hint; the loader/game-database collaborator supplies the actual value, the core
/// only needs it to pick NTSC vs. PAL timing and the SMPC area code (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumAll)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SaturnRegion {
    #[default]
    Japan,
    Americas,
    Europe,
    AsiaNtsc,
    AsiaPal,
}

impl SaturnRegion {
    #[must_use]
    pub fn timing_mode(self) -> TimingMode {
        match self {
            Self::Japan | Self::Americas | Self::AsiaNtsc => TimingMode::Ntsc,
            Self::Europe | Self::AsiaPal => TimingMode::Pal,
        }
    }

    /// SMPC area code byte (§6.3 persistent SMPC data).
    #[must_use]
    pub fn area_code(self) -> u8 {
        match self {
            Self::Japan => 0x1,
            Self::AsiaNtsc => 0x2,
            Self::Americas => 0x4,
            Self::AsiaPal => 0x5,
            Self::Europe => 0x6,
        }
    }
}

/// Which CD block implementation to run (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumAll)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CdBlockModel {
    #[default]
    Hle,
    Lle,
}

/// §9 design note 1: the source has a commented-out unconditional VDP1 framebuffer erase at
/// VBlank-out. The conservative default only erases when a swap was triggered or manual erase was
/// requested; this toggle exposes the alternative for games that need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumAll)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vdp1EraseCompat {
    #[default]
    SwapTriggeredOnly,
    AlwaysEraseAtVBlankOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaturnEmulatorConfig {
    pub region: SaturnRegion,
    pub cd_block_model: CdBlockModel,
    pub forced_timing_mode: Option<TimingMode>,
    pub threaded_vdp_renderer: bool,
    pub vdp1_erase_compat: Vdp1EraseCompat,
    /// §9 design note 3: the source advances VDP1 commands at 1/12 of the normal rate to work
    /// around one title's FMV timing. Documented as a compatibility hack, off by default.
    pub vdp1_slow_fmv_hack: bool,
    pub deinterlace: bool,
    pub p1: PeripheralKind,
    pub p2: PeripheralKind,
}

impl Default for SaturnEmulatorConfig {
    fn default() -> Self {
        Self {
            region: SaturnRegion::default(),
            cd_block_model: CdBlockModel::default(),
            forced_timing_mode: None,
            threaded_vdp_renderer: false,
            vdp1_erase_compat: Vdp1EraseCompat::default(),
            vdp1_slow_fmv_hack: false,
            deinterlace: false,
            p1: PeripheralKind::ControlPad,
            p2: PeripheralKind::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_area_codes_are_distinct() {
        let mut codes: Vec<u8> = SaturnRegion::ALL.iter().map(|r| r.area_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), SaturnRegion::ALL.len());
    }

    #[test]
    fn released_report_has_all_release_bits_set() {
        assert_eq!(PeripheralReport::released().kind(), PeripheralKind::ControlPad);
    }
}
