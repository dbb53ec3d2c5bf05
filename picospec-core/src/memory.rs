/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! # Memory API
//!
//! The [BankedMemory] is a statically sized physical memory of 16kb banks, large enough for
//! every supported [ComputerModel], together with a page table of four logical slots
//! mapping the 64kb address space onto it.
//!
//! Each slot holds a base offset chosen so that translating an address is a single
//! addition: `physical = address + page_base[address >> 14]`.
use core::fmt;
use std::io;

use crate::model::ComputerModel;
use crate::video::SCREEN_SIZE;

/// The size of a single memory bank and of a logical page slot.
pub const BANK_SIZE: usize = 0x4000;
/// The number of logical page slots.
pub const SLOTS: usize = 4;
/// The number of physical ROM banks: 48k ROM, followed by 128k ROM 0 and ROM 1.
pub const ROM_BANKS_MAX: usize = 3;
/// The number of physical RAM banks.
pub const RAM_BANKS_MAX: usize = 8;

const ROM48_BANK: usize = 0;
const ROM128_BANK: usize = 1;
const RAM_BASE: usize = ROM_BANKS_MAX;
const PHYS_BANKS: usize = ROM_BANKS_MAX + RAM_BANKS_MAX;
/// The RAM bank holding the screen.
pub const SCREEN_BANK: usize = 5;
/// The RAM bank holding the shadow screen of the 128k model.
pub const SHADOW_SCREEN_BANK: usize = 7;

/// 128k paging latch: bits 0-2 select the RAM bank at `0xC000`.
pub const PAGING_RAM_MASK: u8 = 0b0000_0111;
/// 128k paging latch: selects the shadow screen bank.
pub const PAGING_SCREEN: u8 = 0b0000_1000;
/// 128k paging latch: selects the ROM 1.
pub const PAGING_ROM: u8 = 0b0001_0000;

#[derive(Debug)]
pub enum ZxMemoryError {
    InvalidSlotIndex,
    InvalidBankIndex,
    InvalidRomSize,
    Io(io::Error)
}

impl std::error::Error for ZxMemoryError {}

impl fmt::Display for ZxMemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            ZxMemoryError::InvalidSlotIndex => "Memory slot index is out of range",
            ZxMemoryError::InvalidBankIndex => "Memory bank index is out of range",
            ZxMemoryError::InvalidRomSize => "ROM size doesn't match the computer model",
            ZxMemoryError::Io(err) => return err.fmt(f)
        })
    }
}

impl From<ZxMemoryError> for io::Error {
    fn from(err: ZxMemoryError) -> Self {
        match err {
            ZxMemoryError::Io(err) => err,
            e => io::Error::new(io::ErrorKind::InvalidInput, e)
        }
    }
}

impl From<io::Error> for ZxMemoryError {
    fn from(err: io::Error) -> Self {
        ZxMemoryError::Io(err)
    }
}

pub type Result<T> = core::result::Result<T, ZxMemoryError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemoryKind {
    Rom,
    Ram
}

/// The banked memory: 3 ROM banks and 8 RAM banks plus the page table.
#[derive(Clone)]
pub struct BankedMemory {
    mem: Box<[u8]>,
    page_base: [u32;SLOTS],
    model: ComputerModel,
    paging: u8,
}

impl fmt::Debug for BankedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankedMemory")
            .field("mem", &self.mem.len())
            .field("page_base", &self.page_base)
            .field("model", &self.model)
            .field("paging", &self.paging)
            .finish()
    }
}

impl Default for BankedMemory {
    fn default() -> Self {
        BankedMemory::new(ComputerModel::default())
    }
}

#[inline(always)]
fn base_of(phys_bank: usize, slot: usize) -> u32 {
    ((phys_bank * BANK_SIZE) as u32).wrapping_sub((slot << 14) as u32)
}

impl BankedMemory {
    /// Creates a zeroed memory with the power-on page table of `model`.
    pub fn new(model: ComputerModel) -> Self {
        let mem = vec![0u8; PHYS_BANKS * BANK_SIZE].into_boxed_slice();
        let mut memory = BankedMemory { mem, page_base: [0;SLOTS], model, paging: 0 };
        memory.reset(model);
        memory
    }
    /// Returns the model the memory was last reset to.
    #[inline]
    pub fn model(&self) -> ComputerModel {
        self.model
    }
    /// Clears RAM and installs the power-on page table of `model`.
    ///
    /// ROM contents are preserved.
    pub fn reset(&mut self, model: ComputerModel) {
        self.model = model;
        self.paging = 0;
        for byte in self.mem[RAM_BASE * BANK_SIZE..].iter_mut() {
            *byte = 0;
        }
        let rom = match model {
            ComputerModel::Spectrum48 => ROM48_BANK,
            ComputerModel::Spectrum128 => ROM128_BANK
        };
        self.page_base[0] = base_of(rom, 0);
        self.page_base[1] = base_of(RAM_BASE + 5, 1);
        self.page_base[2] = base_of(RAM_BASE + 2, 2);
        self.page_base[3] = base_of(RAM_BASE, 3);
    }
    /// Installs ROM `data` for the `model`. The data length must be exactly the size of
    /// all ROM banks of the model.
    pub fn load_rom(&mut self, model: ComputerModel, data: &[u8]) -> Result<()> {
        if data.len() != model.rom_banks() * BANK_SIZE {
            return Err(ZxMemoryError::InvalidRomSize)
        }
        let start = match model {
            ComputerModel::Spectrum48 => ROM48_BANK,
            ComputerModel::Spectrum128 => ROM128_BANK
        } * BANK_SIZE;
        self.mem[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
    /// Installs a 16kb bank into one of the four logical slots.
    pub fn set_bank(&mut self, slot: usize, kind: MemoryKind, bank: usize) -> Result<()> {
        if slot >= SLOTS {
            return Err(ZxMemoryError::InvalidSlotIndex)
        }
        let phys_bank = match kind {
            MemoryKind::Rom if bank < ROM_BANKS_MAX => bank,
            MemoryKind::Ram if bank < RAM_BANKS_MAX => RAM_BASE + bank,
            _ => return Err(ZxMemoryError::InvalidBankIndex)
        };
        self.page_base[slot] = base_of(phys_bank, slot);
        Ok(())
    }
    /// Returns the kind and the index of the bank installed in the logical `slot`.
    pub fn page_bank(&self, slot: usize) -> Result<(MemoryKind, usize)> {
        let base = self.page_base.get(slot).ok_or(ZxMemoryError::InvalidSlotIndex)?;
        let phys_bank = base.wrapping_add((slot << 14) as u32) as usize / BANK_SIZE;
        Ok(if phys_bank < RAM_BASE {
            (MemoryKind::Rom, phys_bank)
        }
        else {
            (MemoryKind::Ram, phys_bank - RAM_BASE)
        })
    }
    /// Applies the value of the 128k paging latch.
    ///
    /// Does nothing on the 48k model.
    pub fn set_paging(&mut self, value: u8) {
        if self.model != ComputerModel::Spectrum128 {
            return
        }
        self.paging = value;
        let rom = ROM128_BANK + (value & PAGING_ROM != 0) as usize;
        self.page_base[0] = base_of(rom, 0);
        self.page_base[3] = base_of(RAM_BASE + (value & PAGING_RAM_MASK) as usize, 3);
    }
    /// Returns the last value of the 128k paging latch.
    #[inline]
    pub fn paging(&self) -> u8 {
        self.paging
    }

    #[inline(always)]
    fn translate(&self, addr: u16) -> usize {
        (addr as u32).wrapping_add(self.page_base[(addr >> 14) as usize]) as usize
    }

    #[inline]
    pub fn read_byte(&self, addr: u16) -> u8 {
        self.mem[self.translate(addr)]
    }
    /// Writes below `0x4000` are ignored.
    #[inline]
    pub fn write_byte(&mut self, addr: u16, data: u8) {
        if addr < 0x4000 {
            return
        }
        let index = self.translate(addr);
        self.mem[index] = data;
    }
    /// Reads a little endian word, wrapping around at the end of the address space.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }
    /// Writes a little endian word, wrapping around at the end of the address space.
    pub fn write_word(&mut self, addr: u16, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write_byte(addr, lo);
        self.write_byte(addr.wrapping_add(1), hi);
    }

    pub fn ram_bank_ref(&self, bank: usize) -> Result<&[u8]> {
        let range = ram_range(bank)?;
        Ok(&self.mem[range])
    }

    pub fn ram_bank_mut(&mut self, bank: usize) -> Result<&mut [u8]> {
        let range = ram_range(bank)?;
        Ok(&mut self.mem[range])
    }

    pub fn rom_bank_ref(&self, bank: usize) -> Result<&[u8]> {
        if bank >= ROM_BANKS_MAX {
            return Err(ZxMemoryError::InvalidBankIndex)
        }
        let start = bank * BANK_SIZE;
        Ok(&self.mem[start..start + BANK_SIZE])
    }
    /// Returns the screen memory: pixels followed by attributes.
    pub fn screen_ref(&self) -> &[u8] {
        let bank = if self.paging & PAGING_SCREEN != 0 {
            SHADOW_SCREEN_BANK
        }
        else {
            SCREEN_BANK
        };
        let start = (RAM_BASE + bank) * BANK_SIZE;
        &self.mem[start..start + SCREEN_SIZE]
    }
}

fn ram_range(bank: usize) -> Result<core::ops::Range<usize>> {
    if bank >= RAM_BANKS_MAX {
        return Err(ZxMemoryError::InvalidBankIndex)
    }
    let start = (RAM_BASE + bank) * BANK_SIZE;
    Ok(start..start + BANK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rom(mem: &mut BankedMemory, model: ComputerModel) {
        let rom: Vec<u8> = (0..model.rom_banks() * BANK_SIZE).map(|i| (i >> 14) as u8 + 0xA0).collect();
        mem.load_rom(model, &rom).unwrap();
    }

    #[test]
    fn memory_translation_works() {
        for &model in &[ComputerModel::Spectrum48, ComputerModel::Spectrum128] {
            let mut mem = BankedMemory::new(model);
            assert_eq!(mem.page_bank(1).unwrap(), (MemoryKind::Ram, 5));
            assert_eq!(mem.page_bank(2).unwrap(), (MemoryKind::Ram, 2));
            assert_eq!(mem.page_bank(3).unwrap(), (MemoryKind::Ram, 0));
            for addr in (0x4000..=0xFFFFu16).step_by(97) {
                mem.write_byte(addr, addr as u8 ^ 0x5A);
                assert_eq!(mem.read_byte(addr), addr as u8 ^ 0x5A);
            }
            mem.write_byte(0x4000, 0xFF);
            assert_eq!(mem.screen_ref()[0], 0xFF);
            mem.write_byte(0x8001, 0x42);
            assert_eq!(mem.ram_bank_ref(2).unwrap()[1], 0x42);
            mem.write_byte(0xFFFF, 0x24);
            assert_eq!(mem.ram_bank_ref(0).unwrap()[BANK_SIZE - 1], 0x24);
        }
    }

    #[test]
    fn rom_is_write_protected() {
        let mut mem = BankedMemory::new(ComputerModel::Spectrum128);
        fill_rom(&mut mem, ComputerModel::Spectrum128);
        fill_rom(&mut mem, ComputerModel::Spectrum48);
        for slot_bank in 0..RAM_BANKS_MAX {
            mem.set_bank(0, MemoryKind::Ram, slot_bank).unwrap();
            let before = mem.ram_bank_ref(slot_bank).unwrap().to_vec();
            for addr in (0..0x4000u16).step_by(31) {
                mem.write_byte(addr, !mem.read_byte(addr));
            }
            assert_eq!(mem.ram_bank_ref(slot_bank).unwrap(), &before[..]);
        }
        mem.reset(ComputerModel::Spectrum48);
        assert_eq!(mem.read_byte(0), 0xA0);
        mem.write_word(0x3FFF, 0x1234);
        assert_eq!(mem.read_byte(0x3FFF), 0xA0);
        assert_eq!(mem.read_byte(0x4000), 0x12);
        // wraps around into ROM
        mem.write_word(0xFFFF, 0x5678);
        assert_eq!(mem.read_byte(0xFFFF), 0x78);
        assert_eq!(mem.read_word(0xFFFF), 0xA078);
    }

    #[test]
    fn paging_works() {
        let mut mem = BankedMemory::new(ComputerModel::Spectrum128);
        fill_rom(&mut mem, ComputerModel::Spectrum128);
        assert_eq!(mem.read_byte(0), 0xA0);
        mem.set_paging(PAGING_ROM | PAGING_SCREEN | 7);
        assert_eq!(mem.read_byte(0), 0xA1);
        assert_eq!(mem.page_bank(0).unwrap(), (MemoryKind::Rom, 2));
        assert_eq!(mem.page_bank(3).unwrap(), (MemoryKind::Ram, 7));
        mem.write_byte(0xC000, 0x77);
        assert_eq!(mem.screen_ref()[0], 0x77);
        assert_eq!(mem.paging(), 0x1F);
        let mut mem48 = BankedMemory::new(ComputerModel::Spectrum48);
        mem48.set_paging(7);
        assert_eq!(mem48.page_bank(3).unwrap(), (MemoryKind::Ram, 0));
        assert_eq!(mem48.paging(), 0);
    }

    #[test]
    fn memory_errors_work() {
        let mut mem = BankedMemory::default();
        assert!(matches!(mem.set_bank(4, MemoryKind::Ram, 0), Err(ZxMemoryError::InvalidSlotIndex)));
        assert!(matches!(mem.set_bank(1, MemoryKind::Ram, 8), Err(ZxMemoryError::InvalidBankIndex)));
        assert!(matches!(mem.set_bank(1, MemoryKind::Rom, 3), Err(ZxMemoryError::InvalidBankIndex)));
        assert!(matches!(mem.load_rom(ComputerModel::Spectrum128, &[0;BANK_SIZE]), Err(ZxMemoryError::InvalidRomSize)));
        let err: io::Error = ZxMemoryError::InvalidBankIndex.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        mem.write_byte(0x4000, 1);
        mem.reset(ComputerModel::Spectrum48);
        assert_eq!(mem.read_byte(0x4000), 0);
    }
}
