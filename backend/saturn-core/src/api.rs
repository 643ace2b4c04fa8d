//! Saturn public interface and main loop (spec.md §6.1).
//!
//! Grounded on the teacher's `genesis-core::api::GenesisEmulator`: a `new_bus!`-style macro
//! constructing a freshly-borrowed [`Bus`] per CPU step so the borrow checker never sees a whole
//! `&mut Saturn`, a `GenesisError<RErr, AErr, SErr>`-style error enum via `thiserror`, and a
//! `create`-style constructor that restores persisted backup RAM through the `SaveWriter`
//! collaborator before running the reset vector fetch. The scheduler-event dispatch loop is new:
//! the teacher drives one CPU instruction per `tick` call, where this core drains every
//! scheduler-ready event first and only then steps both SH-2 cores by one tick (spec.md §4.1,
//! §5's "single-threaded at the logical simulator level").

use crate::bus::{Bus, BusSignals};
use crate::cartridge::Cartridge;
use crate::cdblock::CdBlock;
use crate::input::InputState;
use crate::memory::Memory;
use crate::savestate::{self, LoadError};
use crate::scheduler::{Scheduler, SchedulerEvent};
use crate::scsp::Scsp;
use crate::scu::{Scu, ScuInterrupt};
use crate::smpc::Smpc;
use crate::vdp::Vdp;
use crate::new_bus;
use disc::Disc;
use sat_common::frontend::{AudioOutput, RenderFrameOptions, Renderer, SaveWriter};
use sat_common::input::Player;
use saturn_config::{CartridgeVariant, PeripheralKind, PeripheralReport, SaturnEmulatorConfig};
use sh2_emu::Sh2;
use thiserror::Error;

/// SH-2 master clock in Hz. Every scheduler tick is one SH-2 cycle (§4.1, §4.2's "assume 1 cycle
/// per instruction"); sourced from public Saturn hardware documentation, not `original_source`
/// (see DESIGN.md).
pub const MASTER_CLOCK_HZ: u64 = 28_636_363;
const SCSP_SAMPLE_RATE_HZ: u64 = 44_100;
const SCSP_SAMPLE_PERIOD: u64 = MASTER_CLOCK_HZ / SCSP_SAMPLE_RATE_HZ;
/// DSP stepping granularity is not documented anywhere in `original_source`; one step per 512
/// master cycles keeps it comfortably faster than audio/video timing without modeling the DSP's
/// real per-instruction latency (see DESIGN.md).
const SCU_DSP_STEP_PERIOD: u64 = 512;
/// Approximate CD drive physics tick period; ordering (not absolute latency) is what §9 design
/// note 2 asks callers to preserve.
const CD_DRIVE_STEP_PERIOD: u64 = MASTER_CLOCK_HZ / 75; // one step per Red Book sector boundary (75 Hz)

/// Bounds one frame's worth of VDP1 command-list walking so a malformed or runaway list cannot
/// stall `run_frame` (spec.md §4.3, §7 protocol-error handling).
const VDP1_MAX_COMMANDS_PER_FRAME: u32 = 16_384;

#[derive(Debug, Error)]
pub enum SaturnError<RErr, AErr> {
    #[error("Rendering error: {0}")]
    Render(RErr),
    #[error("Audio output error: {0}")]
    Audio(AErr),
}

/// Owns every bus-mapped device plus the two SH-2 cores driving them (spec.md §2 system overview).
/// `disc` is kept outside the components it feeds (CD block, save-state hashing) since [`Disc`]
/// cannot itself be serialized (§4.8: only its content hash is persisted).
pub struct Saturn {
    memory: Memory,
    cartridge: Cartridge,
    scu: Scu,
    smpc: Smpc,
    vdp: Vdp,
    scsp: Scsp,
    cdblock: CdBlock,
    disc: Option<Disc>,
    scheduler: Scheduler,
    sh2_master: Sh2,
    sh2_slave: Sh2,
    input: InputState,
    config: SaturnEmulatorConfig,
    /// Raw CD-block firmware image; not executed (the CD block is behaviorally modeled, see
    /// `cdblock/hle.rs`'s doc comment), kept only so its hash can gate save-state loads (§4.8).
    cdblock_rom: Option<Vec<u8>>,
    pending_reset_signal: bool,
}

impl Saturn {
    /// Builds a fresh console with nothing loaded: no IPL ROM, no cartridge, no disc. Call
    /// [`Self::load_ipl`] before the first [`Self::run_frame`] (§7: "BIOS-missing is the only
    /// condition that prevents `run_frame`").
    #[must_use]
    pub fn new<S: SaveWriter>(config: SaturnEmulatorConfig, save_writer: &mut S) -> Self {
        let timing_mode = config.forced_timing_mode.unwrap_or_else(|| config.region.timing_mode());

        let mut memory = Memory::new();
        if let Ok(backup) = save_writer.load_bytes("bkr") {
            memory.load_backup_ram(&backup);
        }

        let cdblock = match config.cd_block_model {
            saturn_config::CdBlockModel::Hle => CdBlock::new_hle(),
            saturn_config::CdBlockModel::Lle => CdBlock::new_lle(),
        };

        let mut saturn = Self {
            memory,
            cartridge: Cartridge::default(),
            scu: Scu::new(),
            smpc: Smpc::new(config.region),
            vdp: Vdp::new(timing_mode),
            scsp: Scsp::new(),
            cdblock,
            disc: None,
            scheduler: Scheduler::new(),
            sh2_master: Sh2::new("master".to_string()),
            sh2_slave: Sh2::new("slave".to_string()),
            input: InputState::new(config.p1, config.p2),
            cdblock_rom: None,
            config,
            pending_reset_signal: true,
        };
        saturn.vdp.deinterlace = saturn.config.deinterlace;
        saturn.schedule_initial_events();
        saturn
    }

    fn schedule_initial_events(&mut self) {
        self.scheduler.schedule_from_now(SchedulerEvent::VdpPhaseChange, crate::vdp::phase::H_ACTIVE_DWELL);
        self.scheduler.schedule_from_now(SchedulerEvent::ScspSampleTick, SCSP_SAMPLE_PERIOD);
        if matches!(self.cdblock, CdBlock::Lle(_)) {
            self.scheduler.schedule_from_now(SchedulerEvent::CdDriveStep, CD_DRIVE_STEP_PERIOD);
        }
    }

    /// Resets the system. A soft reset reinitializes every peripheral and re-arms the SH-2 vector
    /// fetch but leaves work RAM intact; a hard reset additionally clears both WRAM banks. Exact
    /// hard/soft boundaries are not documented in `original_source` (see DESIGN.md); this follows
    /// the real console's behavior of work RAM surviving a soft reset.
    pub fn reset(&mut self, hard_reset: bool) {
        if hard_reset {
            self.memory.wram_low.fill(0);
            self.memory.wram_high.fill(0);
        }
        self.scu = Scu::new();
        self.smpc = Smpc::new(self.config.region);
        self.vdp = Vdp::new(self.timing_mode());
        self.vdp.deinterlace = self.config.deinterlace;
        self.scsp = Scsp::new();
        self.scheduler = Scheduler::new();
        self.pending_reset_signal = true;
        self.schedule_initial_events();
    }

    #[must_use]
    pub fn timing_mode(&self) -> sat_common::frontend::TimingMode {
        self.config.forced_timing_mode.unwrap_or_else(|| self.config.region.timing_mode())
    }

    pub fn load_ipl(&mut self, bytes: &[u8]) {
        self.memory.load_ipl(bytes);
    }

    pub fn load_cdblock_rom(&mut self, bytes: Vec<u8>) {
        self.cdblock_rom = Some(bytes);
    }

    pub fn load_disc(&mut self, disc: Disc) {
        self.disc = Some(disc);
        self.cdblock.close_tray();
    }

    pub fn eject_disc(&mut self) {
        self.disc = None;
    }

    pub fn open_tray(&mut self) {
        self.cdblock.open_tray();
    }

    pub fn close_tray(&mut self) {
        self.cdblock.close_tray();
    }

    pub fn insert_cartridge(&mut self, variant: CartridgeVariant) {
        self.cartridge = Cartridge::from_variant(variant);
    }

    pub fn connect(&mut self, player: Player, kind: PeripheralKind) {
        match player {
            Player::One => self.input.port1.connect(kind),
            Player::Two => self.input.port2.connect(kind),
        }
    }

    /// Delivers a peripheral report (§6.2). Taken immediately rather than buffered: the SMPC
    /// copies the most recent report into its `INTBACK` reply the next time it runs that command,
    /// so the only ordering guarantee needed is "latest report wins before the next `INTBACK`".
    pub fn set_input_report(&mut self, player: Player, report: PeripheralReport) {
        self.input.set_report(player, report);
        match player {
            Player::One => self.smpc.p1_report = self.input.port1.report,
            Player::Two => self.smpc.p2_report = self.input.port2.report,
        }
    }

    #[must_use]
    pub fn save_state(&mut self) -> Vec<u8> {
        savestate::save_state(self)
    }

    /// # Errors
    ///
    /// Returns [`LoadError`] if the buffer's magic/version don't match, or if the disc/ROM hashes
    /// embedded in it don't match what is currently loaded (§4.8, §7).
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        savestate::load_state(self, bytes)
    }

    pub(crate) fn ipl_bytes(&self) -> &[u8] {
        &self.memory.ipl[..]
    }

    pub(crate) fn cdblock_rom_bytes(&self) -> Option<&[u8]> {
        self.cdblock_rom.as_deref()
    }

    pub(crate) fn disc_mut(&mut self) -> &mut Option<Disc> {
        &mut self.disc
    }

    pub(crate) fn components_mut(
        &mut self,
    ) -> (&mut Scheduler, &mut Scu, &mut Smpc, &mut Vdp, &mut Scsp, &mut CdBlock, &mut Memory) {
        (&mut self.scheduler, &mut self.scu, &mut self.smpc, &mut self.vdp, &mut self.scsp, &mut self.cdblock, &mut self.memory)
    }

    pub(crate) fn sh2_cores_mut(&mut self) -> (&mut Sh2, &mut Sh2) {
        (&mut self.sh2_master, &mut self.sh2_slave)
    }

    pub(crate) fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cartridge
    }

    pub(crate) fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Advances the system until one video frame has been produced, per spec.md §6.1. Drains
    /// every scheduler-ready event, then steps both SH-2 cores (the slave only if the SMPC has it
    /// enabled) by one cycle, then advances the scheduler's clock by one cycle, repeating until a
    /// `VdpPhaseChange` event reports `frame_complete`.
    ///
    /// # Errors
    ///
    /// Propagates whatever the renderer or audio output return from their respective callbacks.
    pub fn run_frame<R: Renderer, A: AudioOutput>(
        &mut self,
        renderer: &mut R,
        audio: &mut A,
    ) -> Result<(), SaturnError<R::Err, A::Err>> {
        loop {
            while let Some((event, time)) = self.scheduler.pop_ready() {
                if self.handle_scheduler_event(event, time, renderer, audio)? {
                    return Ok(());
                }
            }

            self.step_cpus();
            self.scheduler.tick(1);
        }
    }

    fn handle_scheduler_event<R: Renderer, A: AudioOutput>(
        &mut self,
        event: SchedulerEvent,
        time: u64,
        renderer: &mut R,
        audio: &mut A,
    ) -> Result<bool, SaturnError<R::Err, A::Err>> {
        match event {
            SchedulerEvent::VdpPhaseChange => {
                let result = self.vdp.advance();
                self.scheduler.reschedule_from_previous(
                    SchedulerEvent::VdpPhaseChange,
                    time,
                    result.next_dwell,
                );

                if result.hblank_in {
                    self.scu.raise(ScuInterrupt::HBlankIn);
                }
                if result.vblank_in {
                    self.scu.raise(ScuInterrupt::VBlankIn);
                    if let Some(to_352) = self.smpc.apply_latched_clock_change() {
                        log::info!(
                            "Applying latched clock change to {} dots/line",
                            if to_352 { 352 } else { 320 }
                        );
                    }
                }
                if result.vblank_out {
                    self.scu.raise(ScuInterrupt::VBlankOut);
                    self.vdp.vdp1.execute_command_list(VDP1_MAX_COMMANDS_PER_FRAME);
                    self.scu.raise(ScuInterrupt::SpriteDrawEnd);
                }

                if result.frame_complete {
                    let options = RenderFrameOptions {
                        deinterlace: self.vdp.deinterlace,
                        ..Default::default()
                    };
                    renderer
                        .render_frame(&self.vdp.composite_frame(), self.vdp.frame_size(), options)
                        .map_err(SaturnError::Render)?;
                    return Ok(true);
                }
            }
            SchedulerEvent::ScspSampleTick => {
                let (l, r) = self.scsp.tick_sample();
                audio.push_sample(l, r).map_err(SaturnError::Audio)?;
                self.scheduler.reschedule_from_previous(
                    SchedulerEvent::ScspSampleTick,
                    time,
                    SCSP_SAMPLE_PERIOD,
                );
            }
            SchedulerEvent::ScuDspStep => {
                self.scu.step_dsp();
                if self.scu.dsp.running {
                    self.scheduler.reschedule_from_previous(
                        SchedulerEvent::ScuDspStep,
                        time,
                        SCU_DSP_STEP_PERIOD,
                    );
                }
            }
            SchedulerEvent::CdDriveStep => {
                self.cdblock.step_drive(&mut self.disc);
                self.scheduler.reschedule_from_previous(
                    SchedulerEvent::CdDriveStep,
                    time,
                    CD_DRIVE_STEP_PERIOD,
                );
            }
            SchedulerEvent::CdSectorReady => {
                self.cdblock.step_sector(&mut self.disc);
            }
            SchedulerEvent::SmpcCommandComplete => {
                if self.smpc.complete_pending_command() {
                    self.scu.raise(ScuInterrupt::SystemManager);
                }
            }
            // `Vdp1DrawStep`/`ScspDspStep` are declared scheduler events with no independent
            // driving role in this core: VDP1 command lists run once per frame at VBlank-out
            // (see the `VdpPhaseChange` arm above) and the SCSP's DSP is stepped inline from
            // `Scsp::tick_sample` (see DESIGN.md).
            SchedulerEvent::Vdp1DrawStep
            | SchedulerEvent::ScspDspStep
            | SchedulerEvent::SmpcClockChangeLatch
            | SchedulerEvent::Dummy => {}
        }
        Ok(false)
    }

    fn step_cpus(&mut self) {
        let reset = self.pending_reset_signal;
        self.pending_reset_signal = false;
        let interrupt_level = self.scu.pending_level();

        {
            let mut bus = new_bus!(self, BusSignals { reset, interrupt_level });
            self.sh2_master.execute(1, &mut bus);
            self.sh2_master.tick_peripherals(1, &mut bus);
        }

        if self.smpc.slave_enabled {
            let mut bus = new_bus!(self, BusSignals { reset, interrupt_level });
            self.sh2_slave.execute(1, &mut bus);
            self.sh2_slave.tick_peripherals(1, &mut bus);
        }

        self.run_dma();
    }

    /// Runs any eligible SCU DMA channel through the full bus. `Scu` is taken out of `self` for
    /// the duration of the call since [`Bus`] already holds a mutable borrow of it; this is the
    /// same trick [`Default`]-backed "take, use the rest, put back" pattern the teacher uses
    /// wherever a sub-device needs to drive the bus it is itself mapped onto.
    fn run_dma(&mut self) {
        if self.scu.dma.iter().all(|channel| !channel.eligible()) {
            return;
        }

        let mut scu = std::mem::take(&mut self.scu);
        {
            let mut bus = new_bus!(self, BusSignals { reset: false, interrupt_level: 0 });
            scu.run_dma(|addr| bus.read_byte(addr), |addr, value| bus.write_byte(addr, value));
        }
        self.scu = scu;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_common::frontend::{Color, FrameSize};

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

    struct CountingRenderer {
        frames: u32,
    }

    impl Renderer for CountingRenderer {
        type Err = std::convert::Infallible;

        fn render_frame(
            &mut self,
            _frame_buffer: &[Color],
            _frame_size: FrameSize,
            _options: RenderFrameOptions,
        ) -> Result<(), Self::Err> {
            self.frames += 1;
            Ok(())
        }
    }

    struct NullAudio;

    impl AudioOutput for NullAudio {
        type Err = std::convert::Infallible;

        fn push_sample(&mut self, _sample_l: f64, _sample_r: f64) -> Result<(), Self::Err> {
            Ok(())
        }
    }

    /// Builds IPL content whose reset vectors point past the vector table at a region filled with
    /// NOPs, so the master SH-2 has well-defined (if pointless) instructions to execute instead of
    /// whatever an all-zero image would decode to.
    fn nop_loop_ipl() -> Vec<u8> {
        const RESET_PC: u32 = 0x100;
        const RESET_SP: u32 = 0x0020_0000;
        const NOP: [u8; 2] = [0x00, 0x09];

        let mut ipl = vec![0u8; crate::memory::IPL_SIZE];
        ipl[0..4].copy_from_slice(&RESET_PC.to_be_bytes());
        ipl[4..8].copy_from_slice(&RESET_SP.to_be_bytes());

        let mut offset = RESET_PC as usize;
        while offset + 2 <= ipl.len() {
            ipl[offset..offset + 2].copy_from_slice(&NOP);
            offset += 2;
        }
        ipl
    }

    #[test]
    fn run_frame_eventually_renders_a_frame() {
        let mut writer = NullSaveWriter;
        let mut saturn = Saturn::new(SaturnEmulatorConfig::default(), &mut writer);
        saturn.load_ipl(&nop_loop_ipl());

        let mut renderer = CountingRenderer { frames: 0 };
        let mut audio = NullAudio;
        saturn.run_frame(&mut renderer, &mut audio).unwrap();

        assert_eq!(renderer.frames, 1);
    }

    #[test]
    fn boots_and_renders_many_frames_with_no_disc_inserted() {
        let mut writer = NullSaveWriter;
        let mut saturn = Saturn::new(SaturnEmulatorConfig::default(), &mut writer);
        saturn.load_ipl(&nop_loop_ipl());
        assert!(saturn.disc_mut().is_none());

        let mut renderer = CountingRenderer { frames: 0 };
        let mut audio = NullAudio;
        for _ in 0..60 {
            saturn.run_frame(&mut renderer, &mut audio).unwrap();
        }

        assert_eq!(renderer.frames, 60);
    }

    #[test]
    fn connecting_a_peripheral_is_reflected_in_input_state() {
        let mut writer = NullSaveWriter;
        let mut saturn = Saturn::new(SaturnEmulatorConfig::default(), &mut writer);
        saturn.connect(Player::Two, PeripheralKind::ControlPad);
        saturn.set_input_report(
            Player::Two,
            PeripheralReport::ControlPad { buttons: 0x1FFE },
        );
        assert_eq!(saturn.input.port2.report, PeripheralReport::ControlPad { buttons: 0x1FFE });
    }
}
