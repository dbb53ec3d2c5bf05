/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Emulated hardware models.
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use crate::clock::FTs;

/// An emulated computer model.
///
/// Both models share a single statically sized physical memory; the model selects
/// how many of its banks are in use, how they are paged in and how snapshot pages
/// are numbered.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(try_from = "String", into = "&'static str"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputerModel {
    Spectrum48,
    Spectrum128,
}

/// The error returned when parsing a [ComputerModel] fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseComputerModelError;

/// RAM banks of the 48k model in the order of logical addresses `0x4000`, `0x8000` and `0xC000`.
pub const RAM48_BANKS: [u8;3] = [5, 2, 0];

impl Default for ComputerModel {
    fn default() -> Self {
        ComputerModel::Spectrum48
    }
}

impl ComputerModel {
    /// Returns the number of 16kb ROM banks.
    pub fn rom_banks(self) -> usize {
        match self {
            ComputerModel::Spectrum48 => 1,
            ComputerModel::Spectrum128 => 2,
        }
    }
    /// Returns the number of 16kb RAM banks in use by this model.
    pub fn ram_banks(self) -> usize {
        match self {
            ComputerModel::Spectrum48 => 3,
            ComputerModel::Spectrum128 => 8,
        }
    }
    /// Returns the CPU clock frequency in Hz.
    pub fn cpu_hz(self) -> u32 {
        match self {
            ComputerModel::Spectrum48 => 3_500_000,
            ComputerModel::Spectrum128 => 3_546_900,
        }
    }
    /// Returns the number of T-states per single frame.
    pub fn frame_tstates(self) -> FTs {
        match self {
            ComputerModel::Spectrum48 => 69888,
            ComputerModel::Spectrum128 => 70908,
        }
    }
    /// Returns `true` if the given RAM `bank` exists in this model.
    pub fn has_ram_bank(self, bank: u8) -> bool {
        match self {
            ComputerModel::Spectrum48 => RAM48_BANKS.contains(&bank),
            ComputerModel::Spectrum128 => bank < 8,
        }
    }
    /// Maps a **Z80** snapshot page id to a RAM bank.
    ///
    /// Returns `None` for pages that don't hold RAM of this model (ROMs, interfaces).
    pub fn page_to_ram_bank(self, page: u8) -> Option<u8> {
        match (self, page) {
            (ComputerModel::Spectrum48, 8) => Some(5),
            (ComputerModel::Spectrum48, 4) => Some(2),
            (ComputerModel::Spectrum48, 5) => Some(0),
            (ComputerModel::Spectrum128, 3..=10) => Some(page - 3),
            _ => None
        }
    }
    /// Maps a RAM bank to a **Z80** snapshot page id.
    pub fn ram_bank_to_page(self, bank: u8) -> Option<u8> {
        match (self, bank) {
            (ComputerModel::Spectrum48, 5) => Some(8),
            (ComputerModel::Spectrum48, 2) => Some(4),
            (ComputerModel::Spectrum48, 0) => Some(5),
            (ComputerModel::Spectrum128, 0..=7) => Some(bank + 3),
            _ => None
        }
    }
    /// Returns RAM banks in the order they are written to snapshot files.
    pub fn snapshot_ram_banks(self) -> &'static [u8] {
        match self {
            ComputerModel::Spectrum48 => &RAM48_BANKS,
            ComputerModel::Spectrum128 => &[0, 1, 2, 3, 4, 5, 6, 7],
        }
    }
    /// Returns the hardware mode discriminant of the extended header.
    ///
    /// `header_ex_len` is the length of the extended header: 23 or 54/55.
    pub fn hw_mode(self, header_ex_len: u16) -> u8 {
        match (self, header_ex_len) {
            (ComputerModel::Spectrum48, _) => 0,
            (ComputerModel::Spectrum128, 23) => 3,
            (ComputerModel::Spectrum128, _) => 4,
        }
    }
    /// Selects a model from the hardware mode discriminant of the extended header.
    ///
    /// The 16k variants (`alt_hw` set on a 48k mode) and anything but the plain 48k or 128k
    /// hardware (and their Interface 1 or +2 flavours) are not supported.
    pub fn from_hw_mode(hw_mode: u8, header_ex_len: u16, alt_hw: bool) -> Option<Self> {
        use ComputerModel::*;
        let is_v2 = header_ex_len == 23;
        Some(match hw_mode {
            0|1 if !alt_hw => Spectrum48,
            3|4 if is_v2 => Spectrum128,
            4|5 => Spectrum128,
            12 => Spectrum128,
            _ => return None
        })
    }
}

impl From<ComputerModel> for &str {
    fn from(model: ComputerModel) -> Self {
        match model {
            ComputerModel::Spectrum48  => "ZX Spectrum 48k",
            ComputerModel::Spectrum128 => "ZX Spectrum 128k",
        }
    }
}

impl fmt::Display for ComputerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}

impl std::error::Error for ParseComputerModelError {}

impl fmt::Display for ParseComputerModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized computer model")
    }
}

impl FromStr for ComputerModel {
    type Err = ParseComputerModelError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        let name = name.strip_prefix("ZX Spectrum").unwrap_or(name).trim();
        if name.eq_ignore_ascii_case("48k") || name == "48" {
            Ok(ComputerModel::Spectrum48)
        }
        else if name.eq_ignore_ascii_case("128k") || name == "128" {
            Ok(ComputerModel::Spectrum128)
        }
        else {
            Err(ParseComputerModelError)
        }
    }
}

impl core::convert::TryFrom<String> for ComputerModel {
    type Error = ParseComputerModelError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computer_model_parse_works() {
        assert_eq!("48k".parse::<ComputerModel>(), Ok(ComputerModel::Spectrum48));
        assert_eq!("128K".parse::<ComputerModel>(), Ok(ComputerModel::Spectrum128));
        for model in &[ComputerModel::Spectrum48, ComputerModel::Spectrum128] {
            assert_eq!(model.to_string().parse::<ComputerModel>(), Ok(*model));
        }
        assert_eq!("+3".parse::<ComputerModel>(), Err(ParseComputerModelError));
    }

    #[test]
    fn page_ids_map_both_ways() {
        for model in &[ComputerModel::Spectrum48, ComputerModel::Spectrum128] {
            assert_eq!(model.snapshot_ram_banks().len(), model.ram_banks());
            for &bank in model.snapshot_ram_banks() {
                assert!(model.has_ram_bank(bank));
                let page = model.ram_bank_to_page(bank).unwrap();
                assert_eq!(model.page_to_ram_bank(page), Some(bank));
            }
        }
        assert_eq!(ComputerModel::Spectrum48.page_to_ram_bank(3), None);
        assert_eq!(ComputerModel::Spectrum128.page_to_ram_bank(11), None);
    }

    #[test]
    fn hw_mode_selects_model() {
        use ComputerModel::*;
        assert_eq!(ComputerModel::from_hw_mode(0, 23, false), Some(Spectrum48));
        assert_eq!(ComputerModel::from_hw_mode(0, 54, true), None);
        assert_eq!(ComputerModel::from_hw_mode(3, 23, false), Some(Spectrum128));
        assert_eq!(ComputerModel::from_hw_mode(3, 54, false), None);
        assert_eq!(ComputerModel::from_hw_mode(4, 55, false), Some(Spectrum128));
        assert_eq!(ComputerModel::from_hw_mode(7, 54, false), None);
        for &len in &[23, 54, 55] {
            for model in &[Spectrum48, Spectrum128] {
                assert_eq!(ComputerModel::from_hw_mode(model.hw_mode(len), len, false), Some(*model));
            }
        }
    }

    #[cfg(feature = "snapshot")]
    #[test]
    fn computer_model_serde_works() {
        let name = serde_json::to_string(&ComputerModel::Spectrum128).unwrap();
        assert_eq!(name, r#""ZX Spectrum 128k""#);
        let model: ComputerModel = serde_json::from_str(&name).unwrap();
        assert_eq!(model, ComputerModel::Spectrum128);
        let model: ComputerModel = serde_json::from_str(r#""48k""#).unwrap();
        assert_eq!(model, ComputerModel::Spectrum48);
        assert!(serde_json::from_str::<ComputerModel>(r#""+2A""#).is_err());
    }
}
