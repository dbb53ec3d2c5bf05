/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! The contract between the emulated CPU and the rest of the machine.
//!
//! The instruction interpreter itself is not a part of this library. It is attached to
//! the machine via the [Cpu] trait and talks back to the machine through [Memory] and [Io].
use core::convert::TryFrom;
use core::fmt;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

/// Memory access from the CPU's perspective.
pub trait Memory {
    /// Reads a byte from the 16-bit logical address space.
    fn read_mem(&mut self, addr: u16) -> u8;
    /// Writes a byte to the 16-bit logical address space.
    fn write_mem(&mut self, addr: u16, data: u8);
    /// Reads a little endian word. The second byte address wraps around at `0xFFFF`.
    #[inline]
    fn read_mem16(&mut self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read_mem(addr), self.read_mem(addr.wrapping_add(1))])
    }
    /// Writes a little endian word. The second byte address wraps around at `0xFFFF`.
    #[inline]
    fn write_mem16(&mut self, addr: u16, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write_mem(addr, lo);
        self.write_mem(addr.wrapping_add(1), hi);
    }
}

/// I/O port access from the CPU's perspective.
pub trait Io {
    fn read_io(&mut self, port: u16) -> u8;
    fn write_io(&mut self, port: u16, data: u8);
}

/// The interface of the CPU instruction interpreter.
pub trait Cpu {
    /// Brings the CPU into its power-on state.
    fn reset(&mut self);
    /// Executes the next instruction, accessing memory and ports via `bus`.
    ///
    /// Returns the number of T-states consumed.
    fn step<B: Memory + Io>(&mut self, bus: &mut B) -> u32;
    /// Requests a maskable interrupt which is taken before the next instruction.
    fn interrupt(&mut self);
    /// Returns a copy of the CPU registers.
    fn registers(&self) -> Z80Registers;
    /// Replaces the CPU registers.
    fn set_registers(&mut self, regs: &Z80Registers);
}

/// The interrupt mode.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InterruptMode {
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8InterruptModeError(pub u8);

/// The Z80 register file as seen by snapshot formats.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Z80Registers {
    pub a: u8,
    pub f: u8,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub a_alt: u8,
    pub f_alt: u8,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    /// The memory refresh register, all 8 bits.
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: InterruptMode,
}

impl Default for InterruptMode {
    fn default() -> Self {
        InterruptMode::Mode0
    }
}

impl std::error::Error for TryFromU8InterruptModeError {}

impl fmt::Display for TryFromU8InterruptModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `InterruptMode`", self.0)
    }
}

impl TryFrom<u8> for InterruptMode {
    type Error = TryFromU8InterruptModeError;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        Ok(match mode {
            0 => InterruptMode::Mode0,
            1 => InterruptMode::Mode1,
            2 => InterruptMode::Mode2,
            _ => return Err(TryFromU8InterruptModeError(mode))
        })
    }
}

impl From<InterruptMode> for u8 {
    fn from(im: InterruptMode) -> Self {
        im as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat([u8;0x10000]);

    impl Memory for Flat {
        fn read_mem(&mut self, addr: u16) -> u8 {
            self.0[addr as usize]
        }

        fn write_mem(&mut self, addr: u16, data: u8) {
            self.0[addr as usize] = data;
        }
    }

    #[test]
    fn word_access_is_little_endian_and_wraps() {
        let mut mem = Flat([0;0x10000]);
        mem.write_mem16(0x8000, 0x1234);
        assert_eq!(mem.0[0x8000], 0x34);
        assert_eq!(mem.0[0x8001], 0x12);
        assert_eq!(mem.read_mem16(0x8000), 0x1234);
        mem.write_mem16(0xFFFF, 0xABCD);
        assert_eq!(mem.0[0xFFFF], 0xCD);
        assert_eq!(mem.0[0x0000], 0xAB);
        assert_eq!(mem.read_mem16(0xFFFF), 0xABCD);
    }

    #[test]
    fn interrupt_mode_conversion_works() {
        for im in 0..3u8 {
            assert_eq!(u8::from(InterruptMode::try_from(im).unwrap()), im);
        }
        assert_eq!(InterruptMode::try_from(3), Err(TryFromU8InterruptModeError(3)));
    }
}
