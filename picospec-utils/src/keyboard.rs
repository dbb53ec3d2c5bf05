/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Keyboard related utilities.
//!
//! The [hid] module maps USB HID boot protocol keyboard reports onto the ZX Spectrum keyboard
//! and dispatches the function key commands.
use std::io;

use picospec::clock::MonotonicClock;
use picospec::cpu::Cpu;
use picospec::io::KeyboardInterface;
use picospec::model::ComputerModel;
use picospec::ZxSpectrum;

pub mod hid;

/// The machine controls available to the keyboard command keys.
pub trait HidTarget: KeyboardInterface {
    /// Should toggle the sound and return `true` if it is now muted.
    fn toggle_mute(&mut self) -> bool;
    /// Should toggle the real time synchronization and return `true` if it is now enabled.
    fn toggle_moderate(&mut self) -> bool;
    /// Should reset the machine to the given `model`.
    fn reset(&mut self, model: ComputerModel);
}

/// Storage of numbered machine snapshots.
pub trait QuickSave<T: ?Sized> {
    fn save(&mut self, target: &mut T, slot: u8) -> io::Result<()>;
    fn load(&mut self, target: &mut T, slot: u8) -> io::Result<()>;
}

/// Navigation over a list of snapshot files.
pub trait SnapshotList<T: ?Sized> {
    /// Should (re)load the current snapshot.
    fn curr(&mut self, target: &mut T) -> io::Result<()>;
    /// Should load the previous snapshot from the list.
    fn prev(&mut self, target: &mut T) -> io::Result<()>;
    /// Should load the next snapshot from the list.
    fn next(&mut self, target: &mut T) -> io::Result<()>;
}

impl<P: Cpu, C: MonotonicClock> HidTarget for ZxSpectrum<P, C> {
    fn toggle_mute(&mut self) -> bool {
        ZxSpectrum::toggle_mute(self)
    }

    fn toggle_moderate(&mut self) -> bool {
        ZxSpectrum::toggle_moderate(self)
    }

    fn reset(&mut self, model: ComputerModel) {
        ZxSpectrum::reset(self, model)
    }
}
