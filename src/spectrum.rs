/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::fmt;
use std::io::{self, Read, Write};

use log::debug;

use picospec_core::clock::{FTs, MonotonicClock, PacingGovernor};
use picospec_core::cpu::Cpu;
use picospec_core::memory::{BankedMemory, ZxMemoryError};
use picospec_core::model::ComputerModel;
use picospec_core::video::BorderColor;
use picospec_formats::tap::TapPulseIter;
use picospec_formats::z80::{self, Z80Version};

use crate::bus::SpectrumBus;
use crate::config::SpectrumConfig;
use crate::io::{KeyboardInterface, ZXKeyboardMap};

mod snapshot;

use snapshot::SnapshotStaging;

/// The ZX Spectrum 48k/128k emulator instance.
///
/// The CPU implementation `P` is driven by [ZxSpectrum::step] and accesses memory and I/O
/// ports through a [SpectrumBus]. The [PacingGovernor] with a clock `C` keeps the emulation
/// in sync with real time when moderated.
pub struct ZxSpectrum<P, C> {
    cpu: P,
    bus: SpectrumBus,
    governor: PacingGovernor<C>,
    frame_tstates: FTs,
    frames: u64,
    muted: bool,
}

impl<P: fmt::Debug, C: fmt::Debug> fmt::Debug for ZxSpectrum<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZxSpectrum")
            .field("cpu", &self.cpu)
            .field("bus", &self.bus)
            .field("governor", &self.governor)
            .field("frame_tstates", &self.frame_tstates)
            .field("frames", &self.frames)
            .field("muted", &self.muted)
            .finish()
    }
}

impl<P: Cpu, C: MonotonicClock> ZxSpectrum<P, C> {
    /// Creates a machine according to `config`, with the CPU in its power-on state.
    ///
    /// ROMs should be installed with [ZxSpectrum::load_rom] before running.
    pub fn new(mut cpu: P, clock: C, config: SpectrumConfig) -> Self {
        let model = config.model;
        let mut governor = PacingGovernor::new(clock, model.cpu_hz());
        governor.moderate(config.moderate);
        cpu.reset();
        ZxSpectrum {
            cpu,
            bus: SpectrumBus::new(model),
            governor,
            frame_tstates: 0,
            frames: 0,
            muted: config.muted
        }
    }

    pub fn model(&self) -> ComputerModel {
        self.bus.memory_ref().model()
    }
    /// Installs ROM `data` of the given `model`. The ROM becomes visible after the next reset
    /// to that model.
    pub fn load_rom(&mut self, model: ComputerModel, data: &[u8]) -> Result<(), ZxMemoryError> {
        self.bus.memory_mut().load_rom(model, data)
    }
    /// Powers the machine on as the given `model`.
    ///
    /// RAM is cleared, the memory paging, the port latch and the tape input are reset.
    pub fn reset(&mut self, model: ComputerModel) {
        debug!("reset: {}", model);
        self.bus.memory_mut().reset(model);
        self.bus.reset_ports();
        self.cpu.reset();
        self.frame_tstates = 0;
        self.governor.set_cpu_hz(model.cpu_hz());
    }
    /// Executes a single CPU instruction and returns the number of T-states it took.
    ///
    /// The tape input is moved forward by the same number of T-states and, when moderated,
    /// the call blocks until the real time catches up with the emulation.
    pub fn step(&mut self) -> u32 {
        let tstates = self.cpu.step(&mut self.bus);
        self.bus.ear_in_mut().advance(tstates);
        self.frame_tstates = self.frame_tstates.wrapping_add(tstates as FTs);
        self.governor.synchronize(tstates);
        tstates
    }
    /// Requests the maskable interrupt.
    pub fn interrupt(&mut self) {
        self.cpu.interrupt()
    }
    /// Executes instructions until the end of the current frame, then requests the interrupt.
    ///
    /// Returns the number of T-states executed. T-states executed past the end of the frame
    /// are accounted for in the next one.
    pub fn run_frame(&mut self) -> u32 {
        let frame_tstates = self.model().frame_tstates();
        let mut tstates = 0;
        while self.frame_tstates < frame_tstates {
            tstates += self.step();
        }
        self.frame_tstates -= frame_tstates;
        self.frames = self.frames.wrapping_add(1);
        self.interrupt();
        tstates
    }
    /// Returns the T-state counter relative to the beginning of the current frame.
    pub fn frame_tstates(&self) -> FTs {
        self.frame_tstates
    }
    /// Returns the number of frames completed by [ZxSpectrum::run_frame].
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn moderate(&mut self, on: bool) {
        self.governor.moderate(on)
    }
    /// Returns `true` if the emulation is now moderated.
    pub fn toggle_moderate(&mut self) -> bool {
        let on = self.governor.toggle_moderate();
        debug!("moderate: {}", on);
        on
    }

    pub fn is_moderated(&self) -> bool {
        self.governor.is_moderated()
    }
    /// Returns `true` if the sound is now muted.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        debug!("muted: {}", self.muted);
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
    /// Returns the speaker level driven by the EAR output, `false` when muted.
    pub fn speaker_level(&self) -> bool {
        !self.muted && self.bus.speaker_level()
    }

    pub fn border_color(&self) -> BorderColor {
        self.bus.border_color()
    }
    /// Returns the last byte written to the ULA port.
    pub fn port_latch(&self) -> u8 {
        self.bus.port_latch()
    }
    /// Returns the screen memory currently displayed.
    pub fn screen_ref(&self) -> &[u8] {
        self.bus.memory_ref().screen_ref()
    }

    pub fn memory_ref(&self) -> &BankedMemory {
        self.bus.memory_ref()
    }

    pub fn memory_mut(&mut self) -> &mut BankedMemory {
        self.bus.memory_mut()
    }

    pub fn cpu_ref(&self) -> &P {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut P {
        &mut self.cpu
    }

    pub fn bus_ref(&self) -> &SpectrumBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SpectrumBus {
        &mut self.bus
    }

    pub fn governor_ref(&self) -> &PacingGovernor<C> {
        &self.governor
    }

    pub fn governor_mut(&mut self) -> &mut PacingGovernor<C> {
        &mut self.governor
    }
    /// Replaces the state of the machine with a **Z80** snapshot read from `rd`.
    ///
    /// The machine is left untouched if the snapshot can't be read.
    pub fn load_z80<R: Read>(&mut self, rd: R) -> io::Result<Z80Version> {
        let mut staging = SnapshotStaging::default();
        let version = z80::load_z80(rd, &mut staging)?;
        staging.commit(self)?;
        debug!("loaded Z80 {:?} snapshot of {}", version, self.model());
        Ok(version)
    }
    /// Writes the state of the machine as a **Z80** snapshot of the given `version` to `wr`.
    pub fn save_z80<W: Write>(&self, version: Z80Version, wr: W) -> io::Result<()> {
        z80::save_z80(version, self, wr)
    }
    /// Parses **TAP** `data` and starts playing it on the tape input.
    ///
    /// Returns the number of chunks queued. Any tape already playing is stopped.
    /// On error nothing is changed.
    pub fn load_tap<T: AsRef<[u8]>>(&mut self, data: T) -> io::Result<usize> {
        let pulses = TapPulseIter::new(data)?;
        let chunks = pulses.chunk_count();
        debug!("tape: {} chunks", chunks);
        self.bus.ear_in_mut().feed(pulses);
        Ok(chunks)
    }

    pub fn is_tape_playing(&self) -> bool {
        self.bus.ear_in_ref().is_playing()
    }
    /// Stops playing the tape, the tape input goes low.
    pub fn stop_tape(&mut self) {
        self.bus.ear_in_mut().stop()
    }
}

impl<P, C> KeyboardInterface for ZxSpectrum<P, C> {
    fn get_key_state(&self) -> ZXKeyboardMap {
        self.bus.get_key_state()
    }

    fn set_key_state(&mut self, keymap: ZXKeyboardMap) {
        self.bus.set_key_state(keymap)
    }
}
