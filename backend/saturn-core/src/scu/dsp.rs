//! SCU DSP: 32-bit operation-word instruction set over a small register file, program RAM, and
//! four 64-word data RAM banks (spec.md §4.4, SPEC_FULL supplement).
//!
//! The instruction word layout (top 2 bits select operation / load-immediate / DMA / jump, the
//! operation word further splitting into ALU / X-bus / Y-bus / D1-bus fields) follows the publicly
//! documented SCU DSP opcode format; no `original_source` file enumerates it (see DESIGN.md). One
//! "DSP step" advances exactly one instruction, matching spec.md §4.4's "a single step corresponds
//! to one instruction".

use bincode::{Decode, Encode};

const PROGRAM_RAM_WORDS: usize = 256;
const DATA_RAM_BANKS: usize = 4;
const DATA_RAM_WORDS_PER_BANK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum DspAluOp {
    #[default]
    Nop,
    And,
    Or,
    Xor,
    Add,
    Sub,
    Ad2,
    Sr,
    Rr,
    Rl,
    Rl8,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ScuDsp {
    pub program_ram: Vec<u32>,
    pub data_ram: [[u32; DATA_RAM_WORDS_PER_BANK]; DATA_RAM_BANKS],
    /// `CT0..CT3`: per-bank data RAM pointers.
    pub data_pointers: [u8; DATA_RAM_BANKS],
    pub pc: u8,
    pub ac: i64,
    pub p: i64,
    pub ra: u32,
    pub wa: u32,
    /// X-bus input latch, loaded from data RAM when an operation word's X-bus field is enabled.
    pub rx: i32,
    /// Y-bus input latch, loaded from data RAM when an operation word's Y-bus field is enabled.
    pub ry: i32,
    /// Loop counter (`LOP`); nonzero means a `DJNZ`-style jump is pending.
    pub lop: u16,
    pub top: bool,
    pub sign: bool,
    pub zero: bool,
    pub carry: bool,
    pub overflow: bool,
    pub running: bool,
    pub end_flag: bool,
    pub program_paused: bool,
}

impl ScuDsp {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program_ram: vec![0; PROGRAM_RAM_WORDS],
            data_ram: [[0; DATA_RAM_WORDS_PER_BANK]; DATA_RAM_BANKS],
            data_pointers: [0; DATA_RAM_BANKS],
            pc: 0,
            ac: 0,
            p: 0,
            ra: 0,
            wa: 0,
            rx: 0,
            ry: 0,
            lop: 0,
            top: false,
            sign: false,
            zero: true,
            carry: false,
            overflow: false,
            running: false,
            end_flag: false,
            program_paused: false,
        }
    }

    pub fn load_program_word(&mut self, address: u8, word: u32) {
        self.program_ram[address as usize] = word;
    }

    pub fn start(&mut self) {
        self.pc = 0;
        self.running = true;
        self.end_flag = false;
    }

    /// Executes exactly one instruction if the DSP is running (spec.md §4.4).
    pub fn step(&mut self) {
        if !self.running || self.program_paused {
            return;
        }

        let word = self.program_ram[self.pc as usize];
        self.pc = self.pc.wrapping_add(1);

        match word >> 30 {
            0b00 => self.execute_operation(word),
            0b10 => self.execute_load_immediate(word),
            0b11 => self.execute_dma(word),
            _ => self.execute_jump(word),
        }
    }

    /// Reads one word from a data RAM bank, honoring the `CT` auto-increment pointer.
    fn read_data_ram_auto(&mut self, bank: usize) -> u32 {
        let ptr = self.data_pointers[bank] as usize % DATA_RAM_WORDS_PER_BANK;
        let value = self.data_ram[bank][ptr];
        self.data_pointers[bank] = ((ptr + 1) % DATA_RAM_WORDS_PER_BANK) as u8;
        value
    }

    /// Writes one word to a data RAM bank, either through the `CT` auto-increment pointer or the
    /// `WA` direct-address register depending on the D1-bus addressing mode bit.
    fn write_data_ram(&mut self, bank: usize, direct: bool, value: u32) {
        let index = if direct {
            self.wa as usize % DATA_RAM_WORDS_PER_BANK
        } else {
            self.data_pointers[bank] as usize % DATA_RAM_WORDS_PER_BANK
        };
        self.data_ram[bank][index] = value;
        if !direct {
            self.data_pointers[bank] =
                ((index + 1) % DATA_RAM_WORDS_PER_BANK) as u8;
        }
    }

    /// Operation word layout below the ALU field (bits 29..26, unchanged): an X-bus read, a Y-bus
    /// read, and a D1-bus write can all be issued alongside the ALU op in the same cycle. This bit
    /// assignment is this core's own and is not drawn from a verified hardware reference (see
    /// DESIGN.md); a dedicated END bit replaces guessing program end from an operand's parity.
    fn execute_operation(&mut self, word: u32) {
        let alu_field = (word >> 26) & 0xF;
        let alu_op = match alu_field {
            0x0 => DspAluOp::Nop,
            0x1 => DspAluOp::And,
            0x2 => DspAluOp::Or,
            0x3 => DspAluOp::Xor,
            0x4 => DspAluOp::Add,
            0x5 => DspAluOp::Sub,
            0x6 => DspAluOp::Ad2,
            0x9 => DspAluOp::Sr,
            0xA => DspAluOp::Rr,
            0xB => DspAluOp::Rl,
            0xC => DspAluOp::Rl8,
            _ => DspAluOp::Nop,
        };

        let x_bus_enabled = word & (1 << 25) != 0;
        let x_bus_bank = ((word >> 23) & 0x3) as usize;
        let y_bus_enabled = word & (1 << 22) != 0;
        let y_bus_bank = ((word >> 20) & 0x3) as usize;
        let d1_bus_enabled = word & (1 << 19) != 0;
        let d1_bus_bank = ((word >> 17) & 0x3) as usize;
        let d1_bus_direct = word & (1 << 16) != 0;
        let end_flag = word & (1 << 15) != 0;

        if x_bus_enabled {
            self.rx = self.read_data_ram_auto(x_bus_bank) as i32;
        }
        if y_bus_enabled {
            self.ry = self.read_data_ram_auto(y_bus_bank) as i32;
        }
        if x_bus_enabled && y_bus_enabled {
            self.p = i64::from(self.rx) * i64::from(self.ry);
        }

        self.apply_alu(alu_op);

        if d1_bus_enabled {
            self.write_data_ram(d1_bus_bank, d1_bus_direct, self.ac as u32);
        }

        if end_flag {
            self.end_flag = true;
            self.running = false;
        }
    }

    fn apply_alu(&mut self, op: DspAluOp) {
        let operand = self.p;
        self.ac = match op {
            DspAluOp::Nop => self.ac,
            DspAluOp::And => self.ac & operand,
            DspAluOp::Or => self.ac | operand,
            DspAluOp::Xor => self.ac ^ operand,
            DspAluOp::Add => self.ac.wrapping_add(operand),
            DspAluOp::Sub => self.ac.wrapping_sub(operand),
            DspAluOp::Ad2 => self.ac.wrapping_add(operand),
            DspAluOp::Sr => self.ac >> 1,
            DspAluOp::Rr => (self.ac >> 1) | (i64::from(self.carry) << 45),
            DspAluOp::Rl => self.ac << 1,
            DspAluOp::Rl8 => self.ac.rotate_left(8),
        };

        self.zero = self.ac == 0;
        self.sign = self.ac < 0;
    }

    fn execute_load_immediate(&mut self, word: u32) {
        let dest = (word >> 26) & 0xF;
        let imm = i32::from(word as i16) as i64;
        match dest {
            0 => self.p = imm,
            1 => self.ra = imm as u32,
            2 => self.wa = imm as u32,
            _ => self.ac = imm,
        }
    }

    /// Copies `len` words between two data RAM banks, each side walking its own `CT` pointer.
    /// Real SCU DSP DMA also reaches out over the bus to work RAM and the program RAM; this core
    /// models only the data-RAM-to-data-RAM path, since nothing in this crate drives the DSP's
    /// program across the external bus (see DESIGN.md).
    fn execute_dma(&mut self, word: u32) {
        let src_bank = ((word >> 8) & 0x3) as usize;
        let dest_bank = ((word >> 10) & 0x3) as usize;
        let len = (word & 0xFF) as usize;
        for _ in 0..len {
            let value = self.read_data_ram_auto(src_bank);
            self.write_data_ram(dest_bank, false, value);
        }
    }

    fn execute_jump(&mut self, word: u32) {
        let target = ((word >> 2) & 0xFF) as u8;
        let condition_code = word & 0x3;
        let take = match condition_code {
            0 => true,
            1 => self.zero,
            2 => self.sign,
            _ => self.carry,
        };
        if take {
            self.pc = target;
        }
    }
}

impl Default for ScuDsp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_jump_sets_pc() {
        let mut dsp = ScuDsp::new();
        dsp.load_program_word(0, 0xC000_0000 | (5 << 2));
        dsp.start();
        dsp.step();
        assert_eq!(dsp.pc, 5);
    }

    #[test]
    fn add_accumulates_into_ac() {
        let mut dsp = ScuDsp::new();
        dsp.p = 10;
        dsp.ac = 5;
        dsp.apply_alu(DspAluOp::Add);
        assert_eq!(dsp.ac, 15);
        assert!(!dsp.zero);
    }

    #[test]
    fn step_is_a_no_op_when_not_running() {
        let mut dsp = ScuDsp::new();
        dsp.load_program_word(0, 0xC000_0008);
        dsp.step();
        assert_eq!(dsp.pc, 0);
    }

    #[test]
    fn end_bit_stops_the_dsp() {
        let mut dsp = ScuDsp::new();
        dsp.load_program_word(0, 1 << 15);
        dsp.start();
        dsp.step();
        assert!(dsp.end_flag);
        assert!(!dsp.running);
    }

    #[test]
    fn x_and_y_bus_reads_feed_the_multiplier() {
        let mut dsp = ScuDsp::new();
        dsp.data_ram[0][0] = 6;
        dsp.data_ram[1][0] = 7;
        let word = (1 << 25) | (1 << 22);
        dsp.load_program_word(0, word);
        dsp.start();
        dsp.step();
        assert_eq!(dsp.rx, 6);
        assert_eq!(dsp.ry, 7);
        assert_eq!(dsp.p, 42);
    }

    #[test]
    fn d1_bus_write_lands_in_the_selected_bank() {
        let mut dsp = ScuDsp::new();
        dsp.ac = 0x1234;
        let word = 1 << 19;
        dsp.load_program_word(0, word);
        dsp.start();
        dsp.step();
        assert_eq!(dsp.data_ram[0][0], 0x1234);
        assert_eq!(dsp.data_pointers[0], 1);
    }

    #[test]
    fn dma_copies_words_between_banks() {
        let mut dsp = ScuDsp::new();
        dsp.data_ram[0][0] = 0xAA;
        dsp.data_ram[0][1] = 0xBB;
        let word = (0b11u32 << 30) | (1 << 10) | (0 << 8) | 2;
        dsp.load_program_word(0, word);
        dsp.start();
        dsp.step();
        assert_eq!(dsp.data_ram[1][0], 0xAA);
        assert_eq!(dsp.data_ram[1][1], 0xBB);
    }
}
