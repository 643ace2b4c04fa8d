//! Save-state encoding (spec.md §3.7, §4.8, §6.3).
//!
//! Grounded on the teacher's `jgnes-core::serialize` module: a fixed little-endian, fixed-int
//! bincode `Configuration`, one `encode_into_std_write`/`decode_from_std_read` call per component,
//! wrapped in a `thiserror` enum over bincode's own error types. The magic/version header and the
//! hash-gated refusal to apply a mismatched state are new — no teacher component validates a save
//! state against the ROM/disc it was taken against before applying it.

use crate::api::Saturn;
use crate::cartridge::Cartridge;
use crate::cdblock::CdBlock;
use crate::input::InputState;
use crate::memory::Memory;
use crate::scheduler::Scheduler;
use crate::scsp::Scsp;
use crate::scu::Scu;
use crate::smpc::Smpc;
use crate::vdp::Vdp;
use bincode::config::{Configuration, Fixint, LittleEndian};
use bincode::error::DecodeError;
use disc::Disc;
use sh2_emu::Sh2;
use std::io::Cursor;
use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

const MAGIC: u32 = u32::from_le_bytes(*b"YMRS");
const VERSION: u32 = 1;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_little_endian().with_fixed_int_encoding();

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("save state has an invalid magic number")]
    BadMagic,
    #[error("save state version {found} is not supported by this build (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("save state was taken against a different IPL ROM than is currently loaded")]
    IplMismatch,
    #[error("save state was taken against a different CD-block ROM than is currently loaded")]
    CdBlockRomMismatch,
    #[error("save state was taken against a different disc than is currently loaded")]
    DiscMismatch,
    #[error("failed to decode save state: {source}")]
    Decode {
        #[from]
        source: DecodeError,
    },
}

fn hash_bytes(bytes: &[u8]) -> u128 {
    let mut hasher = Xxh3::new();
    hasher.update(bytes);
    hasher.digest128()
}

fn push<T: bincode::Encode>(buf: &mut Vec<u8>, value: &T) {
    bincode::encode_into_std_write(value, buf, BINCODE_CONFIG)
        .expect("encoding into an in-memory buffer cannot fail");
}

/// Encodes every serializable component in the order declared by §4.8: scheduler, both SH-2 cores,
/// SCU, SMPC, VDP, SCSP, CD block (which owns the SH-1/YGR/drive state for the LLE variant),
/// memory (which owns backup RAM alongside WRAM and the IPL image), then cartridge and input state
/// (persisted for completeness though not named in §4.8), a zero spillover-cycle placeholder (this
/// core's main loop always advances each SH-2 by exactly one cycle per scheduler tick, so there is
/// never a fractional cycle left over to carry across a save), and finally the disc content hash.
#[must_use]
pub fn save_state(saturn: &mut Saturn) -> Vec<u8> {
    let mut buf = Vec::new();

    push(&mut buf, &MAGIC);
    push(&mut buf, &VERSION);
    push(&mut buf, &hash_bytes(saturn.ipl_bytes()));
    let cdblock_rom_hash: Option<u128> = saturn.cdblock_rom_bytes().map(hash_bytes);
    push(&mut buf, &cdblock_rom_hash);

    let (scheduler, _scu, _smpc, _vdp, _scsp, _cdblock, _memory) = saturn.components_mut();
    push(&mut buf, &*scheduler);

    let (sh2_master, sh2_slave) = saturn.sh2_cores_mut();
    push(&mut buf, &*sh2_master);
    push(&mut buf, &*sh2_slave);

    let (_scheduler, scu, smpc, vdp, scsp, cdblock, memory) = saturn.components_mut();
    push(&mut buf, &*scu);
    push(&mut buf, &*smpc);
    push(&mut buf, &*vdp);
    push(&mut buf, &*scsp);
    push(&mut buf, &*cdblock);
    push(&mut buf, &*memory);

    push(&mut buf, &*saturn.cartridge_mut());
    push(&mut buf, &*saturn.input_mut());

    let spillover_cycles: u64 = 0;
    push(&mut buf, &spillover_cycles);

    let disc_hash: Option<u128> = saturn.disc_mut().as_mut().map(Disc::hash);
    push(&mut buf, &disc_hash);

    buf
}

/// Decodes and validates every field named by [`save_state`] before applying any of it to
/// `saturn`, per §4.8's "`validate_state` must report every field that would fail before any side
/// effect".
pub fn load_state(saturn: &mut Saturn, bytes: &[u8]) -> Result<(), LoadError> {
    let mut cursor = Cursor::new(bytes);

    let magic: u32 = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    if magic != MAGIC {
        return Err(LoadError::BadMagic);
    }
    let version: u32 = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    if version != VERSION {
        return Err(LoadError::UnsupportedVersion { found: version, expected: VERSION });
    }

    let ipl_hash: u128 = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    if ipl_hash != hash_bytes(saturn.ipl_bytes()) {
        return Err(LoadError::IplMismatch);
    }

    let cdblock_rom_hash: Option<u128> = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    if let Some(expected) = cdblock_rom_hash {
        if saturn.cdblock_rom_bytes().map(hash_bytes) != Some(expected) {
            return Err(LoadError::CdBlockRomMismatch);
        }
    }

    let scheduler: Scheduler = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let sh2_master: Sh2 = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let sh2_slave: Sh2 = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let scu: Scu = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let smpc: Smpc = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let vdp: Vdp = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let scsp: Scsp = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let cdblock: CdBlock = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let memory: Memory = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let cartridge: Cartridge = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let input: InputState = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    let _spillover_cycles: u64 = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;

    let disc_hash: Option<u128> = bincode::decode_from_std_read(&mut cursor, BINCODE_CONFIG)?;
    match (disc_hash, saturn.disc_mut().as_mut().map(Disc::hash)) {
        (None, None) => {}
        (Some(expected), Some(current)) if expected == current => {}
        _ => return Err(LoadError::DiscMismatch),
    }

    // Every field validated; apply.
    let (scheduler_slot, scu_slot, smpc_slot, vdp_slot, scsp_slot, cdblock_slot, memory_slot) =
        saturn.components_mut();
    *scheduler_slot = scheduler;
    *scu_slot = scu;
    *smpc_slot = smpc;
    *vdp_slot = vdp;
    *scsp_slot = scsp;
    *cdblock_slot = cdblock;
    *memory_slot = memory;

    let (sh2_master_slot, sh2_slave_slot) = saturn.sh2_cores_mut();
    *sh2_master_slot = sh2_master;
    *sh2_slave_slot = sh2_slave;

    *saturn.cartridge_mut() = cartridge;
    *saturn.input_mut() = input;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_common::frontend::{SaveWriter, TimingMode};
    use saturn_config::SaturnEmulatorConfig;

    struct NullSaveWriter;

    impl SaveWriter for NullSaveWriter {
        type Err = std::convert::Infallible;

        fn load_bytes(&mut self, _extension: &str) -> Result<Vec<u8>, Self::Err> {
            Ok(Vec::new())
        }

        fn persist_bytes(&mut self, _extension: &str, _bytes: &[u8]) -> Result<(), Self::Err> {
            Ok(())
        }
    }

    fn new_saturn() -> Saturn {
        let mut writer = NullSaveWriter;
        Saturn::new(SaturnEmulatorConfig::default(), &mut writer)
    }

    #[test]
    fn round_trip_preserves_magic_and_rejects_truncated_buffers() {
        let mut saturn = new_saturn();
        let state = save_state(&mut saturn);
        assert!(state.len() > 8);
        assert!(matches!(load_state(&mut saturn, &state[..4]), Err(LoadError::Decode { .. })));
    }

    #[test]
    fn load_state_rejects_ipl_mismatch() {
        let mut saturn = new_saturn();
        let state = save_state(&mut saturn);

        saturn.load_ipl(&[0xFFu8; crate::memory::IPL_SIZE]);
        assert!(matches!(load_state(&mut saturn, &state), Err(LoadError::IplMismatch)));
    }

    #[test]
    fn round_trip_restores_peripheral_reports() {
        use sat_common::input::Player;
        use saturn_config::{PeripheralKind, PeripheralReport};

        let mut saturn = new_saturn();
        saturn.connect(Player::One, PeripheralKind::ControlPad);
        saturn.set_input_report(Player::One, PeripheralReport::ControlPad { buttons: 0x0042 });
        let state = save_state(&mut saturn);

        saturn.set_input_report(Player::One, PeripheralReport::ControlPad { buttons: 0x1FFF });
        load_state(&mut saturn, &state).unwrap();

        let input: &mut InputState = saturn.input_mut();
        assert_eq!(input.port1.report, PeripheralReport::ControlPad { buttons: 0x0042 });
    }

    #[test]
    fn timing_mode_defaults_follow_region() {
        let saturn = new_saturn();
        assert_eq!(saturn.timing_mode(), TimingMode::Ntsc);
    }

    #[test]
    fn save_load_save_round_trip_is_bit_exact() {
        let mut saturn = new_saturn();
        saturn.load_ipl(&[0x42u8; crate::memory::IPL_SIZE]);

        let first = save_state(&mut saturn);
        load_state(&mut saturn, &first).unwrap();
        let second = save_state(&mut saturn);

        assert_eq!(first, second);
    }
}
