//! SCSP's embedded sound DSP: a small fixed-point coefficient/delay-line processor that runs once
//! per sample after the 32 channels are mixed (spec.md §4.6 "filtered by the DSP").
//!
//! Grounded structurally on `scu::dsp::ScuDsp` (one "step" per instruction word, a small register
//! file, RAM banks addressed by a pointer), generalized from the SCU DSP's integer ALU to a
//! fixed-point multiply-accumulate suited to audio filtering, then finished by one of
//! [`dsp::design::butterworth`]'s IIR filters for the final low-pass stage real hardware's analog
//! output filter performs.

use bincode::{Decode, Encode};
use dsp::iir::IirFilter;

const PROGRAM_STEPS: usize = 128;
const RING_BUFFER_SIZE: usize = 1 << 13;

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct DspInstruction {
    pub input_select: u8,
    pub coefficient: i16,
    pub ring_buffer_address: u16,
}

#[derive(Clone, Encode, Decode)]
pub struct ScspDsp {
    pub program: Vec<DspInstruction>,
    ring_buffer: Vec<f64>,
    ring_pointer: usize,
    pc: usize,
    accumulator: f64,
    output_filter: IirFilter<3>,
}

impl ScspDsp {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: vec![DspInstruction::default(); PROGRAM_STEPS],
            ring_buffer: vec![0.0; RING_BUFFER_SIZE],
            ring_pointer: 0,
            pc: 0,
            accumulator: 0.0,
            output_filter: output_low_pass(44_100.0),
        }
    }

    /// Runs exactly one program step (spec.md analog of the SCU DSP's "a single step corresponds
    /// to one instruction"), folding `mixer_input` into the ring buffer and accumulator, then
    /// passing the result through the fixed output low-pass stage.
    pub fn step(&mut self, mixer_input: f64) -> f64 {
        if self.program.is_empty() {
            return self.output_filter.filter(mixer_input);
        }

        let instruction = self.program[self.pc % self.program.len()];
        let delayed = self.ring_buffer[self.ring_pointer];
        let coefficient = f64::from(instruction.coefficient) / f64::from(i16::MAX);

        self.accumulator = mixer_input + delayed * coefficient;
        self.ring_buffer[self.ring_pointer] = self.accumulator;
        self.ring_pointer = (self.ring_pointer + 1) % self.ring_buffer.len();
        self.pc = (self.pc + 1) % self.program.len();

        self.output_filter.filter(self.accumulator)
    }
}

impl Default for ScspDsp {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the fixed final-stage low-pass filter real Saturn hardware implements with an analog
/// reconstruction filter after the DAC, per spec.md §4.6's "filtered by the DSP" step.
#[must_use]
pub fn output_low_pass(sample_rate: f64) -> IirFilter<3> {
    dsp::design::butterworth(18_000.0, sample_rate, dsp::design::FilterType::LowPass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_with_empty_program_skips_the_ring_buffer() {
        let mut dsp = ScspDsp::new();
        dsp.program.clear();
        // With no program, a DC input should settle near its own value after the low-pass stage
        // reaches steady state, without ever touching the ring buffer/accumulator path.
        let mut last = 0.0;
        for _ in 0..256 {
            last = dsp.step(0.5);
        }
        assert!((last - 0.5).abs() < 0.05);
        assert_eq!(dsp.ring_pointer, 0);
    }

    #[test]
    fn ring_pointer_advances_every_step() {
        let mut dsp = ScspDsp::new();
        dsp.step(1.0);
        assert_eq!(dsp.ring_pointer, 1);
    }
}
