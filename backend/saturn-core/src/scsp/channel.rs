//! One of the SCSP's 32 PCM voices: loop mode, 8.24 fixed-point sample position, ADSR envelope,
//! LFO, and pan (spec.md §4.6).
//!
//! Grounded on the teacher's `segacd-core::rf5c164::Channel`: a fixed-point `current_address` plus
//! `address_increment` advanced every tick, with an explicit loop check against the waveform data
//! rather than a separate loop-point comparison, generalized here to ADSR/LFO-modulated amplitude
//! instead of RF5C164's flat master/pan volume.

use bincode::{Decode, Encode};

const ADDRESS_FRACTIONAL_BITS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum LoopMode {
    #[default]
    None,
    Normal,
    Reverse,
    PingPong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum EnvelopePhase {
    Attack,
    Decay,
    Sustain,
    Release,
    Off,
}

#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct Adsr {
    pub attack_rate: u8,
    pub decay_rate: u8,
    pub sustain_rate: u8,
    pub release_rate: u8,
    pub sustain_level: u8,
}

impl Default for Adsr {
    fn default() -> Self {
        Self { attack_rate: 31, decay_rate: 0, sustain_rate: 0, release_rate: 31, sustain_level: 31 }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Channel {
    pub enabled: bool,
    pub loop_mode: LoopMode,
    pub start_address: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate_ratio: u32, // 8.24 fixed-point increment per tick.
    pub current_address: u64,  // 8.24 fixed-point.
    pub reverse: bool,
    pub adsr: Adsr,
    pub envelope_phase: EnvelopePhase,
    pub envelope_level: u8, // 0..=31, attenuation (31 = silent).
    pub lfo_rate: u8,
    pub lfo_phase: u16,
    pub pan: u8, // 0 = full left, 31 = full right, per-channel 5-bit pan.
    pub volume: u8,
    pub eight_bit_samples: bool,
    /// Step granularity (0..=5): the envelope generator and LFO advance once every `2^n` sample
    /// ticks instead of every tick, trading modulation resolution for throughput (spec.md §4.6).
    pub step_granularity: u8,
    granularity_counter: u8,
}

impl Channel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: false,
            loop_mode: LoopMode::None,
            start_address: 0,
            loop_start: 0,
            loop_end: 0,
            sample_rate_ratio: 1 << ADDRESS_FRACTIONAL_BITS,
            current_address: 0,
            reverse: false,
            adsr: Adsr::default(),
            envelope_phase: EnvelopePhase::Off,
            envelope_level: 31,
            lfo_rate: 0,
            lfo_phase: 0,
            pan: 16,
            volume: 0,
            eight_bit_samples: true,
            step_granularity: 0,
            granularity_counter: 0,
        }
    }

    pub fn key_on(&mut self) {
        self.enabled = true;
        self.current_address = u64::from(self.start_address) << ADDRESS_FRACTIONAL_BITS;
        self.reverse = matches!(self.loop_mode, LoopMode::Reverse);
        self.envelope_phase = EnvelopePhase::Attack;
        self.envelope_level = 31;
    }

    pub fn key_off(&mut self) {
        if self.enabled {
            self.envelope_phase = EnvelopePhase::Release;
        }
    }

    /// Advances one sample tick: steps the envelope generator, the LFO, and the sample position,
    /// applying the loop-point wraparound per `loop_mode`.
    pub fn tick(&mut self, sample_ram: &[u8]) -> (f64, f64) {
        if !self.enabled {
            return (0.0, 0.0);
        }

        let decimation = 1u8 << self.step_granularity.min(5);
        self.granularity_counter = self.granularity_counter.wrapping_add(1);
        if self.granularity_counter % decimation == 0 {
            self.step_envelope();
            self.step_lfo();
        }

        let sample_index = (self.current_address >> ADDRESS_FRACTIONAL_BITS) as usize;
        let raw = self.read_sample(sample_ram, sample_index);

        let step = u64::from(self.sample_rate_ratio);
        if self.reverse {
            self.current_address = self.current_address.saturating_sub(step);
        } else {
            self.current_address += step;
        }
        self.apply_loop_wraparound();

        if self.envelope_phase == EnvelopePhase::Off {
            self.enabled = false;
        }

        let attenuation = f64::from(31 - self.envelope_level) / 31.0;
        let amplitude = raw * attenuation * f64::from(self.volume) / 15.0;

        let pan_ratio = f64::from(self.pan) / 31.0;
        (amplitude * (1.0 - pan_ratio), amplitude * pan_ratio)
    }

    fn read_sample(&self, sample_ram: &[u8], index: usize) -> f64 {
        if sample_ram.is_empty() {
            return 0.0;
        }
        if self.eight_bit_samples {
            let byte = sample_ram[index % sample_ram.len()];
            (f64::from(byte) - 128.0) / 128.0
        } else {
            let byte_index = (index * 2) % sample_ram.len();
            let lo = sample_ram[byte_index];
            let hi = sample_ram[(byte_index + 1) % sample_ram.len()];
            let sample = i16::from_le_bytes([lo, hi]);
            f64::from(sample) / f64::from(i16::MAX)
        }
    }

    fn apply_loop_wraparound(&mut self) {
        let loop_end_fixed = u64::from(self.loop_end) << ADDRESS_FRACTIONAL_BITS;
        let loop_start_fixed = u64::from(self.loop_start) << ADDRESS_FRACTIONAL_BITS;

        match self.loop_mode {
            LoopMode::None => {
                if self.current_address >= loop_end_fixed {
                    self.envelope_phase = EnvelopePhase::Off;
                }
            }
            LoopMode::Normal => {
                if self.current_address >= loop_end_fixed {
                    self.current_address = loop_start_fixed;
                }
            }
            LoopMode::Reverse => {
                if self.current_address <= loop_start_fixed {
                    self.current_address = loop_end_fixed;
                }
            }
            LoopMode::PingPong => {
                if !self.reverse && self.current_address >= loop_end_fixed {
                    self.reverse = true;
                } else if self.reverse && self.current_address <= loop_start_fixed {
                    self.reverse = false;
                }
            }
        }
    }

    fn step_envelope(&mut self) {
        match self.envelope_phase {
            EnvelopePhase::Attack => {
                self.envelope_level = self.envelope_level.saturating_sub(step_size(self.adsr.attack_rate));
                if self.envelope_level == 0 {
                    self.envelope_phase = EnvelopePhase::Decay;
                }
            }
            EnvelopePhase::Decay => {
                if self.envelope_level < self.adsr.sustain_level {
                    self.envelope_level = self.envelope_level.saturating_add(step_size(self.adsr.decay_rate));
                } else {
                    self.envelope_phase = EnvelopePhase::Sustain;
                }
            }
            EnvelopePhase::Sustain => {
                self.envelope_level =
                    self.envelope_level.saturating_add(step_size(self.adsr.sustain_rate)).min(31);
            }
            EnvelopePhase::Release => {
                self.envelope_level = self.envelope_level.saturating_add(step_size(self.adsr.release_rate)).min(31);
                if self.envelope_level >= 31 {
                    self.envelope_phase = EnvelopePhase::Off;
                }
            }
            EnvelopePhase::Off => {}
        }
    }

    fn step_lfo(&mut self) {
        if self.lfo_rate > 0 {
            self.lfo_phase = self.lfo_phase.wrapping_add(u16::from(self.lfo_rate));
        }
    }
}

/// Envelope step size derived from a 5-bit rate, coarser at low rates (rate 0 barely moves).
fn step_size(rate: u8) -> u8 {
    (rate / 4).max(1)
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_on_resets_position_to_start_address() {
        let mut channel = Channel::new();
        channel.start_address = 100;
        channel.key_on();
        assert_eq!(channel.current_address >> ADDRESS_FRACTIONAL_BITS, 100);
    }

    #[test]
    fn disabled_channel_produces_silence() {
        let mut channel = Channel::new();
        let (l, r) = channel.tick(&[0xFF; 16]);
        assert_eq!((l, r), (0.0, 0.0));
    }

    #[test]
    fn normal_loop_wraps_to_loop_start() {
        let mut channel = Channel::new();
        channel.loop_mode = LoopMode::Normal;
        channel.loop_start = 2;
        channel.loop_end = 4;
        channel.sample_rate_ratio = 1 << ADDRESS_FRACTIONAL_BITS;
        channel.key_on();
        channel.current_address = 4u64 << ADDRESS_FRACTIONAL_BITS;
        channel.apply_loop_wraparound();
        assert_eq!(channel.current_address >> ADDRESS_FRACTIONAL_BITS, 2);
    }

    #[test]
    fn coarser_granularity_holds_the_envelope_between_ticks() {
        let mut coarse = Channel::new();
        coarse.envelope_phase = EnvelopePhase::Attack;
        coarse.adsr.attack_rate = 4;
        coarse.step_granularity = 3; // decimation factor of 8.
        coarse.enabled = true;

        // Held steady for the first 7 ticks of the 8-tick decimation window.
        for _ in 0..7 {
            coarse.tick(&[0; 16]);
            assert_eq!(coarse.envelope_level, 31);
        }

        // The envelope only advances on the 8th tick, once per decimation window.
        coarse.tick(&[0; 16]);
        assert!(coarse.envelope_level < 31);
    }

    #[test]
    fn pan_hard_left_silences_the_right_channel() {
        let mut channel = Channel::new();
        channel.volume = 15;
        channel.pan = 0;
        channel.envelope_phase = EnvelopePhase::Sustain;
        channel.envelope_level = 0;
        channel.enabled = true;
        let (_, r) = channel.tick(&[200; 16]);
        assert_eq!(r, 0.0);
    }
}
