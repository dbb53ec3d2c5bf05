/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::TryFrom;
use std::io::{self, Read, Result};

use bitflags::bitflags;

use picospec_core::clock::FTs;
use picospec_core::cpu::{InterruptMode, Z80Registers};
use picospec_core::video::BorderColor;

use crate::{StructRead, StructWrite};
use crate::snapshot::ComputerModel;

pub const PAGE_SIZE: usize = 0x4000;
/// The size of the memory image of a version 1 file: 3 pages of the 48k RAM.
pub const MEMORY_V1_SIZE: usize = 3 * PAGE_SIZE;

/// The revision of a **Z80** file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Z80Version {
    /// 30 byte header followed by a single 48k memory image.
    V1,
    /// 23 byte extended header followed by memory pages.
    V2,
    /// 54 or 55 byte extended header followed by memory pages.
    V3
}

bitflags! {
    #[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Flags1: u8 {
        const R_HIGH_BIT     = 0b0000_0001;
        const BORDER_COLOR   = 0b0000_1110;
        const BASIC_SAMROM   = 0b0001_0000;
        const MEM_COMPRESSED = 0b0010_0000;
    }
}

bitflags! {
    #[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Flags2: u8 {
        const INTR_MODE_MASK   = 0b0000_0011;
        const ISSUE2_EMULATION = 0b0000_0100;
        const DOUBLE_INTERRUPT = 0b0000_1000;
        const VIDEO_SYNC       = 0b0011_0000;
        const JOYSTICK_MODEL   = 0b1100_0000;
    }
}

bitflags! {
    #[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Flags3: u8 {
        const REG_R_EMU     = 0b0000_0001;
        const LDIR_EMU      = 0b0000_0010;
        const AY_SOUND_EMU  = 0b0000_0100;
        const AY_FULLER_BOX = 0b0100_0000;
        const ALT_HW_MODE   = 0b1000_0000;
    }
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
#[repr(packed)]
pub struct Header {
    pub a: u8,
    pub f: u8,
    pub bc: [u8;2],
    pub hl: [u8;2],
    pub pc: [u8;2],
    pub sp: [u8;2],
    pub i: u8,
    pub r7: u8,
    pub flags1: u8,
    pub de: [u8;2],
    pub bc_alt: [u8;2],
    pub de_alt: [u8;2],
    pub hl_alt: [u8;2],
    pub a_alt: u8,
    pub f_alt: u8,
    pub iy: [u8;2],
    pub ix: [u8;2],
    pub iff1: u8,
    pub iff2: u8,
    pub flags2: u8
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
#[repr(packed)]
pub struct HeaderEx {
    // version 2,3
    pub pc: [u8;2],
    pub hw_mode: u8,
    pub port1: u8,
    pub ifrom: u8,
    pub flags3: u8,
    pub ay_sel_reg: u8,
    pub ay_regs: [u8;16],
    // version 3
    pub ts_lo: [u8;2],
    pub ts_hi: u8,
    pub flags4: u8,
    pub mgt_rom: u8,
    pub mf_rom: u8,
    pub fn1: u8,
    pub fn2: u8,
    pub joy_bindings: [u8;10],
    pub joy_ascii: [u8;10],
    pub mgt_type: u8,
    pub disciple1: u8,
    pub disciple2: u8,
    pub port2: u8,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
#[repr(packed)]
pub struct MemoryHeader {
    length: [u8;2],
    page: u8
}

/// The end marker of a version 1 compressed memory image.
pub const MEMORY_V1_TERM: &[u8] = &[0, 0xED, 0xED, 0];
/// The value of the memory page length indicating an uncompressed page.
pub const MEMORY_RAW_LENGTH: u16 = u16::MAX;

// Structs must be packed and consist of `u8` or/and arrays of `u8` primitives only.
unsafe impl StructRead for Header {}
unsafe impl StructRead for HeaderEx {}
unsafe impl StructRead for MemoryHeader {}
unsafe impl StructWrite for Header {}
unsafe impl StructWrite for HeaderEx {}
unsafe impl StructWrite for MemoryHeader {}

impl Z80Version {
    /// Returns the length of the extended header written for this version.
    pub fn header_ex_len(self) -> Option<u16> {
        match self {
            Z80Version::V1 => None,
            Z80Version::V2 => Some(23),
            Z80Version::V3 => Some(54),
        }
    }
}

impl From<u8> for Flags1 {
    fn from(mut byte: u8) -> Self {
        // some old emulators saved 255 here
        if byte == u8::MAX {
            byte = 1;
        }
        Flags1::from_bits_retain(byte)
    }
}

impl Flags1 {
    pub fn with_border_color(self, border: BorderColor) -> Self {
        (self - Flags1::BORDER_COLOR) | Flags1::from_bits_retain(u8::from(border) << 1)
    }

    pub fn with_refresh_high_bit(mut self, r: u8) -> Self {
        self.set(Flags1::R_HIGH_BIT, r & 0x80 != 0);
        self
    }

    pub fn border_color(self) -> BorderColor {
        BorderColor::from_bits_truncate((self & Flags1::BORDER_COLOR).bits() >> 1)
    }

    pub fn is_mem_compressed(self) -> bool {
        self.intersects(Flags1::MEM_COMPRESSED)
    }

    pub fn mix_r(self, r: u8) -> u8 {
        (r & 0x7F) | ((self & Flags1::R_HIGH_BIT).bits() << 7)
    }
}

impl From<u8> for Flags2 {
    fn from(byte: u8) -> Self {
        Flags2::from_bits_retain(byte)
    }
}

impl Flags2 {
    pub fn with_interrupt_mode(self, im: InterruptMode) -> Self {
        (self - Flags2::INTR_MODE_MASK) | Flags2::from_bits_retain(im.into())
    }

    pub fn interrupt_mode(self) -> Result<InterruptMode> {
        InterruptMode::try_from((self & Flags2::INTR_MODE_MASK).bits())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid interrupt mode"))
    }
}

impl From<u8> for Flags3 {
    fn from(byte: u8) -> Self {
        Flags3::from_bits_retain(byte)
    }
}

impl Flags3 {
    pub fn is_alt_hw_mode(self) -> bool {
        self.intersects(Flags3::ALT_HW_MODE)
    }
}

impl Header {
    /// Decodes the CPU registers.
    ///
    /// `pc` is taken from the header as is, it's `0` in the extended versions.
    pub fn registers(&self) -> Result<Z80Registers> {
        let flags2 = Flags2::from(self.flags2);
        Ok(Z80Registers {
            a: self.a,
            f: self.f,
            bc: u16::from_le_bytes(self.bc),
            de: u16::from_le_bytes(self.de),
            hl: u16::from_le_bytes(self.hl),
            a_alt: self.a_alt,
            f_alt: self.f_alt,
            bc_alt: u16::from_le_bytes(self.bc_alt),
            de_alt: u16::from_le_bytes(self.de_alt),
            hl_alt: u16::from_le_bytes(self.hl_alt),
            ix: u16::from_le_bytes(self.ix),
            iy: u16::from_le_bytes(self.iy),
            sp: u16::from_le_bytes(self.sp),
            pc: u16::from_le_bytes(self.pc),
            i: self.i,
            r: Flags1::from(self.flags1).mix_r(self.r7),
            iff1: self.iff1 != 0,
            iff2: self.iff2 != 0,
            im: flags2.interrupt_mode()?
        })
    }
    /// Creates a header from the CPU registers.
    pub fn new(version: Z80Version, regs: &Z80Registers, border: BorderColor) -> Self {
        let flags1 = if version == Z80Version::V1 {
            Flags1::MEM_COMPRESSED
        }
        else {
            Flags1::empty()
        }
        .with_border_color(border)
        .with_refresh_high_bit(regs.r);
        let flags2 = Flags2::empty().with_interrupt_mode(regs.im);
        let pc = if version == Z80Version::V1 { regs.pc } else { 0 };
        Header {
            a: regs.a,
            f: regs.f,
            bc: regs.bc.to_le_bytes(),
            hl: regs.hl.to_le_bytes(),
            pc: pc.to_le_bytes(),
            sp: regs.sp.to_le_bytes(),
            i: regs.i,
            r7: regs.r & 0x7F,
            flags1: flags1.bits(),
            de: regs.de.to_le_bytes(),
            bc_alt: regs.bc_alt.to_le_bytes(),
            de_alt: regs.de_alt.to_le_bytes(),
            hl_alt: regs.hl_alt.to_le_bytes(),
            a_alt: regs.a_alt,
            f_alt: regs.f_alt,
            iy: regs.iy.to_le_bytes(),
            ix: regs.ix.to_le_bytes(),
            iff1: if regs.iff1 { !0 } else { 0 },
            iff2: if regs.iff2 { !0 } else { 0 },
            flags2: flags2.bits()
        }
    }
}

/// Converts the V3 T-state counter to the frame T-state counter.
///
/// The low counter counts down from the end of each quarter of a frame, the high counter
/// indicates the quarter.
pub fn z80_to_cycles(ts_lo: u16, ts_hi: u8, model: ComputerModel) -> FTs {
    let total_ts = model.frame_tstates();
    let qts = total_ts / 4;
    let qcountdown = ts_lo as FTs;
    (((ts_hi as FTs + 1) % 4 + 1) * qts - (qcountdown + 1))
    .rem_euclid(total_ts)
}

/// Converts the frame T-state counter to the V3 T-state counters.
pub fn cycles_to_z80(ts: FTs, model: ComputerModel) -> (u16, u8) {
    let total_ts = model.frame_tstates();
    let qts = total_ts / 4;
    let ts_lo = (qts - ts.rem_euclid(qts) - 1) as u16;
    let ts_hi = (ts.rem_euclid(total_ts) / qts - 1).rem_euclid(4) as u8;
    (ts_lo, ts_hi)
}

/// Reads the extended header length and the extended header.
pub fn load_header_ex<R: Read>(mut rd: R) -> Result<(Z80Version, u16, HeaderEx)> {
    let mut header_length = [0u8;2];
    rd.read_exact(&mut header_length)?;
    let header_length = u16::from_le_bytes(header_length);
    let version = match header_length {
        23    => Z80Version::V2,
        54|55 => Z80Version::V3,
        _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid extended header size"))
    };
    let mut header_ex = HeaderEx::default();
    header_ex.read_struct_with_limit(rd.by_ref(), header_length as usize)?;
    Ok((version, header_length, header_ex))
}

/// Reads a **Z80** V2/V3 memory header and returns `(length, page, is_compressed)` on success.
///
/// Returns `None` at the end of the stream.
pub fn load_mem_header<R: Read>(rd: R) -> Result<Option<(usize, u8, bool)>> {
    let mut header = MemoryHeader::default();
    if header.read_struct_or_nothing(rd)? {
        Ok(Some(match u16::from_le_bytes(header.length) {
            MEMORY_RAW_LENGTH => (PAGE_SIZE, header.page, false),
            length => (length as usize, header.page, true)
        }))
    }
    else {
        Ok(None)
    }
}

impl MemoryHeader {
    pub fn new(length: u16, page: u8) -> Self {
        let length = length.to_le_bytes();
        MemoryHeader { length, page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::TryInto;

    #[test]
    fn z80_cycles_works() {
        for model in &[ComputerModel::Spectrum48, ComputerModel::Spectrum128] {
            let frame_ts = model.frame_tstates();
            let qts: u16 = (frame_ts / 4).try_into().unwrap();
            for ts in (0..frame_ts).step_by(7) {
                let (lo, hi) = cycles_to_z80(ts, *model);
                assert!(hi <= 3);
                assert!(lo < qts);
                assert_eq!(z80_to_cycles(lo, hi, *model), ts);
            }
        }
    }

    #[test]
    fn header_sizes_are_correct() {
        assert_eq!(core::mem::size_of::<Header>(), 30);
        assert_eq!(core::mem::size_of::<HeaderEx>(), 55);
        assert_eq!(core::mem::size_of::<MemoryHeader>(), 3);
    }

    #[test]
    fn header_registers_work() {
        let regs = Z80Registers {
            a: 1, f: 2, bc: 0x0304, de: 0x0506, hl: 0x0708,
            a_alt: 9, f_alt: 10, bc_alt: 0x0B0C, de_alt: 0x0D0E, hl_alt: 0x0F10,
            ix: 0x1112, iy: 0x1314, sp: 0xFFF0, pc: 0x8000,
            i: 0x3F, r: 0xC5, iff1: true, iff2: false, im: InterruptMode::Mode2
        };
        let header = Header::new(Z80Version::V1, &regs, BorderColor::YELLOW);
        assert_eq!(header.r7, 0x45);
        assert_eq!(header.flags1, 0b0010_1101);
        assert_eq!(header.iff1, 0xFF);
        assert_eq!(header.registers().unwrap(), regs);
        assert_eq!(Flags1::from(header.flags1).border_color(), BorderColor::YELLOW);
        let header = Header::new(Z80Version::V3, &regs, BorderColor::BLUE);
        assert_eq!(u16::from_le_bytes(header.pc), 0);
        assert!(!Flags1::from(header.flags1).is_mem_compressed());
    }

    #[test]
    fn flags1_legacy_value_works() {
        let flags1 = Flags1::from(0xFF);
        assert_eq!(flags1, Flags1::R_HIGH_BIT);
        assert_eq!(flags1.border_color(), BorderColor::BLACK);
        assert_eq!(flags1.mix_r(0x7F), 0xFF);
    }

    #[test]
    fn invalid_header_ex_length_is_an_error() {
        let data = [24u8, 0];
        let err = load_header_ex(&data[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let data = [23u8, 0, 1, 2];
        let err = load_header_ex(&data[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
