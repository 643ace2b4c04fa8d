//! SCSP: 32-channel PCM synthesizer, embedded DSP, and the register window that drives both
//! (spec.md §4.6).
//!
//! Grounded on the teacher's `segacd-core::rf5c164` module for the "sound RAM + per-channel
//! register block + master volume" shape, generalized from RF5C164's 8 channels to the SCSP's 32
//! and from a flat volume/pan pair to full ADSR/LFO (carried by [`channel::Channel`]). The
//! embedded DSP ([`dsp::ScspDsp`]) sits between the channel mixer and the final stereo output, per
//! §4.6's "filtered by the DSP" step.

pub mod channel;
pub mod dsp;

use bincode::{Decode, Encode};
use channel::Channel;
use dsp::ScspDsp;
use sat_common::boxedarray::BoxedByteArray;

pub const SOUND_RAM_SIZE: usize = 512 * 1024;
pub const NUM_CHANNELS: usize = 32;

/// Byte stride of one channel's register block (spec.md §4.6 supplement; not present in
/// `original_source`, see DESIGN.md).
const CHANNEL_STRIDE: u32 = 0x20;
const CHANNEL_REGS_SIZE: u32 = CHANNEL_STRIDE * NUM_CHANNELS as u32;

const REG_KYONEX: u32 = CHANNEL_REGS_SIZE;
const REG_MASTER_VOLUME: u32 = CHANNEL_REGS_SIZE + 2;
const REG_MONO: u32 = CHANNEL_REGS_SIZE + 3;
const REG_DSP_PROGRAM_BASE: u32 = CHANNEL_REGS_SIZE + 0x100;

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
struct PendingKey {
    on: bool,
    off: bool,
}

#[derive(Clone, Encode, Decode)]
pub struct Scsp {
    pub sound_ram: BoxedByteArray<SOUND_RAM_SIZE>,
    pub channels: [Channel; NUM_CHANNELS],
    pub dsp: ScspDsp,
    pub master_volume: u8,
    pub mono: bool,
    pending_key: [PendingKey; NUM_CHANNELS],
}

impl Scsp {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sound_ram: BoxedByteArray::new(),
            channels: std::array::from_fn(|_| Channel::new()),
            dsp: ScspDsp::new(),
            master_volume: 15,
            mono: false,
            pending_key: [PendingKey::default(); NUM_CHANNELS],
        }
    }

    #[must_use]
    pub fn read_byte(&self, address: u32) -> u8 {
        let offset = address & 0x000F_FFFF;
        if offset < CHANNEL_REGS_SIZE {
            return self.read_channel_byte(offset);
        }
        match offset {
            REG_MASTER_VOLUME => self.master_volume,
            REG_MONO => u8::from(self.mono),
            _ => 0,
        }
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        let offset = address & 0x000F_FFFF;
        if offset < CHANNEL_REGS_SIZE {
            self.write_channel_byte(offset, value);
            return;
        }
        if offset >= REG_DSP_PROGRAM_BASE {
            self.write_dsp_program_byte(offset - REG_DSP_PROGRAM_BASE, value);
            return;
        }
        match offset {
            REG_KYONEX => self.apply_pending_key_events(),
            REG_MASTER_VOLUME => self.master_volume = value & 0x0F,
            REG_MONO => self.mono = value & 1 != 0,
            _ => {}
        }
    }

    /// `DSP` program words are loaded 4 bytes at a time (§4.6's DSP program RAM); byte writes
    /// accumulate into a staging longword that commits on the 4th byte, mirroring how VDP2
    /// register writes must be composed from the bus's byte-granular RMW path (§4.7).
    fn write_dsp_program_byte(&mut self, program_byte_offset: u32, value: u8) {
        let word_index = (program_byte_offset / 4) as usize;
        let lane = program_byte_offset % 4;
        let Some(slot) = self.dsp.program.get_mut(word_index) else { return };
        let mut word = u32::from(slot.coefficient as u16)
            | (u32::from(slot.input_select) << 16)
            | (u32::from(slot.ring_buffer_address) << 24);
        let mut bytes = word.to_be_bytes();
        bytes[lane as usize] = value;
        word = u32::from_be_bytes(bytes);
        slot.coefficient = (word & 0xFFFF) as i16;
        slot.input_select = ((word >> 16) & 0xFF) as u8;
        slot.ring_buffer_address = ((word >> 24) & 0xFF) as u16;
    }

    fn channel_index(offset: u32) -> (usize, u32) {
        ((offset / CHANNEL_STRIDE) as usize, offset % CHANNEL_STRIDE)
    }

    fn read_channel_byte(&self, offset: u32) -> u8 {
        let (index, reg) = Self::channel_index(offset);
        let channel = &self.channels[index];
        match reg {
            0x00 => u8::from(channel.enabled),
            0x01 => channel.loop_mode as u8,
            0x02 => (channel.start_address >> 16) as u8,
            0x03 => (channel.start_address >> 8) as u8,
            0x04 => channel.start_address as u8,
            0x05 => (channel.loop_start >> 8) as u8,
            0x06 => channel.loop_start as u8,
            0x07 => (channel.loop_end >> 8) as u8,
            0x08 => channel.loop_end as u8,
            0x09 => channel.adsr.attack_rate,
            0x0A => channel.adsr.decay_rate,
            0x0B => channel.adsr.sustain_rate,
            0x0C => channel.adsr.release_rate,
            0x0D => channel.adsr.sustain_level,
            0x0E => channel.lfo_rate,
            0x0F => channel.pan,
            0x10 => channel.volume,
            0x11 => u8::from(channel.eight_bit_samples),
            0x12 => channel.step_granularity,
            _ => 0,
        }
    }

    /// Key-on/off are staged into `pending_key` rather than applied immediately: real hardware
    /// only latches them when `KYONEX` is written, so every flagged channel starts/releases in the
    /// same sample tick regardless of register-write order (spec.md §4.6 channel model).
    fn write_channel_byte(&mut self, offset: u32, value: u8) {
        let (index, reg) = Self::channel_index(offset);
        let channel = &mut self.channels[index];
        match reg {
            0x00 => {
                self.pending_key[index].on = value & 1 != 0;
                self.pending_key[index].off = value & 2 != 0;
            }
            0x01 => {
                channel.loop_mode = match value & 0x3 {
                    0 => channel::LoopMode::None,
                    1 => channel::LoopMode::Normal,
                    2 => channel::LoopMode::Reverse,
                    _ => channel::LoopMode::PingPong,
                };
            }
            0x02 => channel.start_address = (channel.start_address & 0x00_FFFF) | (u32::from(value) << 16),
            0x03 => channel.start_address = (channel.start_address & 0xFF_00FF) | (u32::from(value) << 8),
            0x04 => channel.start_address = (channel.start_address & 0xFF_FF00) | u32::from(value),
            0x05 => channel.loop_start = (channel.loop_start & 0x00FF) | (u32::from(value) << 8),
            0x06 => channel.loop_start = (channel.loop_start & 0xFF00) | u32::from(value),
            0x07 => channel.loop_end = (channel.loop_end & 0x00FF) | (u32::from(value) << 8),
            0x08 => channel.loop_end = (channel.loop_end & 0xFF00) | u32::from(value),
            0x09 => channel.adsr.attack_rate = value & 0x1F,
            0x0A => channel.adsr.decay_rate = value & 0x1F,
            0x0B => channel.adsr.sustain_rate = value & 0x1F,
            0x0C => channel.adsr.release_rate = value & 0x1F,
            0x0D => channel.adsr.sustain_level = value & 0x1F,
            0x0E => channel.lfo_rate = value,
            0x0F => channel.pan = value & 0x1F,
            0x10 => channel.volume = value & 0x0F,
            0x11 => channel.eight_bit_samples = value & 1 != 0,
            0x12 => channel.step_granularity = (value & 0x7).min(5),
            _ => {}
        }
    }

    fn apply_pending_key_events(&mut self) {
        for (channel, pending) in self.channels.iter_mut().zip(self.pending_key.iter_mut()) {
            if pending.on {
                channel.key_on();
            } else if pending.off {
                channel.key_off();
            }
            *pending = PendingKey::default();
        }
    }

    pub fn load_dsp_program_word(&mut self, index: usize, word: u32) {
        if let Some(slot) = self.dsp.program.get_mut(index) {
            slot.coefficient = (word & 0xFFFF) as i16;
            slot.input_select = ((word >> 16) & 0xFF) as u8;
            slot.ring_buffer_address = ((word >> 24) & 0xFF) as u16;
        }
    }

    /// Mixes every enabled channel's `(l, r)` pair, runs the sum through the embedded DSP, and
    /// applies the master volume. Called once per `ScspSampleTick` scheduler event at exactly
    /// 44.1 kHz (spec.md §4.6).
    pub fn tick_sample(&mut self) -> (f64, f64) {
        let mut mix_l = 0.0;
        let mut mix_r = 0.0;
        for channel in &mut self.channels {
            let (l, r) = channel.tick(&self.sound_ram);
            mix_l += l;
            mix_r += r;
        }

        let filtered = self.dsp.step((mix_l + mix_r) / 2.0);
        let master = f64::from(self.master_volume) / 15.0;

        if self.mono {
            (filtered * master, filtered * master)
        } else {
            (mix_l * master, mix_r * master)
        }
    }
}

impl Default for Scsp {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scsp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scsp")
            .field("master_volume", &self.master_volume)
            .field("mono", &self.mono)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kyonex_applies_every_pending_key_on_at_once() {
        let mut scsp = Scsp::new();
        scsp.write_byte(0 * CHANNEL_STRIDE, 0x01); // channel 0 key-on pending
        scsp.write_byte(1 * CHANNEL_STRIDE, 0x01); // channel 1 key-on pending
        assert!(!scsp.channels[0].enabled);
        assert!(!scsp.channels[1].enabled);

        scsp.write_byte(REG_KYONEX, 1);

        assert!(scsp.channels[0].enabled);
        assert!(scsp.channels[1].enabled);
    }

    #[test]
    fn silent_system_produces_silence() {
        let mut scsp = Scsp::new();
        assert_eq!(scsp.tick_sample(), (0.0, 0.0));
    }

    #[test]
    fn master_volume_scales_output() {
        let mut scsp = Scsp::new();
        scsp.channels[0].volume = 15;
        scsp.channels[0].pan = 16;
        scsp.channels[0].envelope_phase = channel::EnvelopePhase::Sustain;
        scsp.channels[0].envelope_level = 0;
        scsp.channels[0].enabled = true;
        scsp.sound_ram[0] = 255;

        scsp.master_volume = 15;
        let (loud_l, _) = scsp.tick_sample();

        scsp.channels[0].enabled = true;
        scsp.master_volume = 1;
        let (quiet_l, _) = scsp.tick_sample();

        assert!(loud_l.abs() >= quiet_l.abs());
    }
}
