/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! The system bus: memory and I/O port access on behalf of the CPU.
use picospec_core::chip::{EarIn, UlaPortFlags};
use picospec_core::cpu::{Io, Memory};
use picospec_core::memory::BankedMemory;
use picospec_core::model::ComputerModel;
use picospec_core::video::BorderColor;

use crate::io::{KeyboardInterface, ZXKeyboardMap};

/// The low byte of the ULA port address.
pub const ULA_PORT: u8 = 0xFE;
/// The low byte of the Kempston joystick port address.
pub const JOYSTICK_PORT: u8 = 0x1F;
/// The value read from the joystick port: no direction, no fire.
pub const JOYSTICK_IDLE: u8 = 0x00;
/// The value read from ports without a device.
pub const OPEN_BUS: u8 = 0xFF;

/// Routes CPU memory accesses to the [BankedMemory] and decodes I/O ports.
///
/// Ports are decoded by the low byte of the address only:
///
/// * `0xFE` reads the keyboard half-rows selected by the high byte, with the EAR input level on bit 6;
///   writes the border color and the EAR/MIC outputs.
/// * `0x1F` reads an idle Kempston joystick.
/// * any other port reads `0xFF`, writes are ignored.
#[derive(Debug, Default)]
pub struct SpectrumBus {
    memory: BankedMemory,
    keyboard: ZXKeyboardMap,
    ear_in: EarIn,
    port254: u8,
}

impl SpectrumBus {
    pub fn new(model: ComputerModel) -> Self {
        SpectrumBus {
            memory: BankedMemory::new(model),
            ..SpectrumBus::default()
        }
    }

    pub fn memory_ref(&self) -> &BankedMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut BankedMemory {
        &mut self.memory
    }

    pub fn ear_in_ref(&self) -> &EarIn {
        &self.ear_in
    }

    pub fn ear_in_mut(&mut self) -> &mut EarIn {
        &mut self.ear_in
    }
    /// Returns the last byte written to the ULA port.
    #[inline]
    pub fn port_latch(&self) -> u8 {
        self.port254
    }
    /// Sets the ULA port latch as if `data` was written to port `0xFE`.
    #[inline]
    pub fn set_port_latch(&mut self, data: u8) {
        self.port254 = data;
    }

    pub fn border_color(&self) -> BorderColor {
        UlaPortFlags::from_bits_retain(self.port254).into()
    }
    /// Returns the state of the EAR output (the speaker).
    pub fn speaker_level(&self) -> bool {
        UlaPortFlags::from_bits_retain(self.port254).contains(UlaPortFlags::EAR_OUT)
    }
    /// Clears the port latch and silences the EAR input.
    pub fn reset_ports(&mut self) {
        self.port254 = 0;
        self.ear_in.stop();
    }

    fn read_ula_port(&self, port: u16) -> u8 {
        let keys = self.keyboard.read_keyboard((port >> 8) as u8) & !UlaPortFlags::EAR_IN.bits();
        if self.ear_in.ear() {
            keys | UlaPortFlags::EAR_IN.bits()
        }
        else {
            keys
        }
    }
}

impl Memory for SpectrumBus {
    #[inline(always)]
    fn read_mem(&mut self, addr: u16) -> u8 {
        self.memory.read_byte(addr)
    }

    #[inline(always)]
    fn write_mem(&mut self, addr: u16, data: u8) {
        self.memory.write_byte(addr, data)
    }
}

impl Io for SpectrumBus {
    fn read_io(&mut self, port: u16) -> u8 {
        match port as u8 {
            ULA_PORT => self.read_ula_port(port),
            JOYSTICK_PORT => JOYSTICK_IDLE,
            _ => OPEN_BUS
        }
    }

    fn write_io(&mut self, port: u16, data: u8) {
        if port as u8 == ULA_PORT {
            self.port254 = data;
        }
    }
}

impl KeyboardInterface for SpectrumBus {
    fn get_key_state(&self) -> ZXKeyboardMap {
        self.keyboard
    }

    fn set_key_state(&mut self, keymap: ZXKeyboardMap) {
        self.keyboard = keymap;
    }
}
