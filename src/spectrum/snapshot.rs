/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::Infallible;
use std::io::Read;

use log::debug;

use picospec_core::clock::{FTs, MonotonicClock};
use picospec_core::cpu::{Cpu, Z80Registers};
use picospec_core::memory::{BANK_SIZE, RAM_BANKS_MAX, ZxMemoryError};
use picospec_core::model::ComputerModel;
use picospec_core::video::BorderColor;
use picospec_formats::snapshot::{SnapshotCreator, SnapshotLoader};
use picospec_formats::z80::PAGING_PORT;

use super::ZxSpectrum;

/// Collects the state read from a snapshot, so it can be applied only after the whole
/// file has been read.
#[derive(Debug, Default)]
pub(super) struct SnapshotStaging {
    model: ComputerModel,
    border: BorderColor,
    regs: Z80Registers,
    ram: [Option<Box<[u8]>>; RAM_BANKS_MAX],
    clock: FTs,
    paging: u8,
}

impl SnapshotStaging {
    /// Replaces the state of `spectrum` with the collected one.
    pub fn commit<P: Cpu, C: MonotonicClock>(
            self,
            spectrum: &mut ZxSpectrum<P, C>
        ) -> Result<(), ZxMemoryError>
    {
        let model = self.model;
        let memory = spectrum.bus.memory_mut();
        memory.reset(model);
        for (bank, page) in self.ram.iter().enumerate() {
            if let Some(page) = page {
                memory.ram_bank_mut(bank)?.copy_from_slice(page);
            }
        }
        memory.set_paging(self.paging);
        spectrum.bus.reset_ports();
        spectrum.bus.set_port_latch(self.border.bits());
        spectrum.cpu.set_registers(&self.regs);
        spectrum.frame_tstates = self.clock.rem_euclid(model.frame_tstates());
        spectrum.governor.set_cpu_hz(model.cpu_hz());
        Ok(())
    }
}

impl SnapshotLoader for SnapshotStaging {
    type Error = Infallible;

    fn select_model(&mut self, model: ComputerModel, border: BorderColor) -> Result<(), Self::Error> {
        *self = SnapshotStaging { model, border, ..SnapshotStaging::default() };
        Ok(())
    }

    fn read_into_memory<R: Read>(&mut self, bank: u8, mut reader: R) -> Result<(), ZxMemoryError> {
        if !self.model.has_ram_bank(bank) {
            return Err(ZxMemoryError::InvalidBankIndex)
        }
        let mut page = vec![0u8; BANK_SIZE].into_boxed_slice();
        reader.read_exact(&mut page)?;
        self.ram[bank as usize] = Some(page);
        Ok(())
    }

    fn assign_cpu(&mut self, regs: Z80Registers) {
        self.regs = regs;
    }

    fn set_clock(&mut self, tstates: FTs) {
        self.clock = tstates;
    }

    fn write_port(&mut self, port: u16, data: u8) {
        if port == PAGING_PORT {
            self.paging = data;
        }
        else {
            debug!("snapshot: ignoring port write {:04x}: {:02x}", port, data);
        }
    }
}

impl<P: Cpu, C: MonotonicClock> SnapshotCreator for ZxSpectrum<P, C> {
    fn model(&self) -> ComputerModel {
        ZxSpectrum::model(self)
    }

    fn cpu(&self) -> Z80Registers {
        self.cpu.registers()
    }

    fn current_clock(&self) -> FTs {
        self.frame_tstates
    }

    fn border_color(&self) -> BorderColor {
        self.bus.border_color()
    }

    fn paging(&self) -> u8 {
        self.bus.memory_ref().paging()
    }

    fn memory_ref(&self, bank: u8) -> Result<&[u8], ZxMemoryError> {
        self.bus.memory_ref().ram_bank_ref(bank as usize)
    }
}
