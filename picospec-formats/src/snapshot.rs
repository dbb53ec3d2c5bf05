/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Common snapshot formats utilities.
use std::io::Read;

pub use picospec_core::model::ComputerModel;
use picospec_core::clock::FTs;
use picospec_core::cpu::Z80Registers;
use picospec_core::video::BorderColor;
use picospec_core::memory::ZxMemoryError;

/// The methods can be called more than one time.
pub trait SnapshotCreator {
    fn model(&self) -> ComputerModel;
    fn cpu(&self) -> Z80Registers;
    /// Returns the T-state counter relative to the beginning of the current frame.
    fn current_clock(&self) -> FTs;
    fn border_color(&self) -> BorderColor;
    /// Returns the last value written to the 128k memory paging port.
    fn paging(&self) -> u8;
    /// Should return the whole content of the RAM `bank`.
    fn memory_ref(&self, bank: u8) -> Result<&[u8], ZxMemoryError>;
}

/// Implement this trait to be able to load snapshot from files supported by this crate.
///
/// The method [SnapshotLoader::select_model] is always being called first.
/// Then the other methods are being called in unspecified order.
/// Not every method is always being called though.
///
/// Loading may fail at any point after [SnapshotLoader::select_model] was called, so an implementation
/// should collect the state and apply it only after the loader function has returned successfully.
pub trait SnapshotLoader {
    /// The error type returned by the [SnapshotLoader::select_model] method.
    type Error: Into<Box<dyn std::error::Error + Send + Sync + 'static>>;
    /// Should prepare the emulated `model` with the given `border` color.
    ///
    /// If the model can not be emulated this method should return an `Err(Self::Error)`.
    fn select_model(
        &mut self,
        model: ComputerModel,
        border: BorderColor
    ) -> Result<(), Self::Error>;
    /// Should read exactly 16kb of the RAM `bank` content from the given `reader`.
    fn read_into_memory<R: Read>(&mut self, bank: u8, reader: R) -> Result<(), ZxMemoryError>;
    /// Should set the CPU registers.
    ///
    /// This method should not fail.
    fn assign_cpu(&mut self, regs: Z80Registers);
    /// Should set the frame T-states clock to the value given in `tstates`.
    ///
    /// This method should not fail.
    fn set_clock(&mut self, tstates: FTs);
    /// Should emulate sending the `data` to the given `port`.
    ///
    /// This method should not fail.
    fn write_port(&mut self, port: u16, data: u8);
}
