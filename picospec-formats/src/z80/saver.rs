/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::TryFrom;
use std::io::{self, Write, Result};

use log::warn;

use crate::snapshot::*;
use crate::StructWrite;
use super::common::*;
use super::compress::*;

fn save_ram_pages<W: Write, S: SnapshotCreator>(
        mut wr: W,
        snapshot: &S,
        model: ComputerModel
    ) -> Result<()>
{
    let mut buf = Vec::with_capacity(PAGE_SIZE);
    for &bank in model.snapshot_ram_banks() {
        let page = match model.ram_bank_to_page(bank) {
            Some(page) => page,
            None => {
                warn!("Z80: no page for RAM bank {}", bank);
                continue
            }
        };
        buf.clear();
        let mem_slice = snapshot.memory_ref(bank)?;
        compress_write_all(mem_slice, &mut buf)?;
        let (mem_head, slice) = match u16::try_from(buf.len()) {
            Ok(length) if buf.len() < mem_slice.len() => (MemoryHeader::new(length, page), &buf[..]),
            _ => (MemoryHeader::new(MEMORY_RAW_LENGTH, page), mem_slice)
        };
        mem_head.write_struct(wr.by_ref())?;
        wr.write_all(slice)?;
    }
    Ok(())
}

/// Saves a **Z80** file version 1 into `wr` from the provided reference to a `snapshot` struct
/// implementing [SnapshotCreator].
///
/// # Errors
/// This function may return an error from attempts to write the file.
/// Only 48k snapshots with a non-zero program counter can be saved in version 1.
pub fn save_z80v1<C: SnapshotCreator, W: Write>(
        snapshot: &C,
        mut wr: W
    ) -> Result<()>
{
    let model = snapshot.model();
    if model != ComputerModel::Spectrum48 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput,
                        "Z80: can't create a version 1 snapshot of this computer model"))
    }
    let regs = snapshot.cpu();
    if regs.pc == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput,
                        "Z80: can't create a version 1 snapshot with PC at 0"))
    }
    let header = Header::new(Z80Version::V1, &regs, snapshot.border_color());
    header.write_struct(wr.by_ref())?;
    let mut image = Vec::with_capacity(MEMORY_V1_SIZE);
    for &bank in model.snapshot_ram_banks() {
        image.extend_from_slice(snapshot.memory_ref(bank)?);
    }
    compress_write_all(&image, wr.by_ref())?;
    wr.write_all(MEMORY_V1_TERM)?;
    wr.flush()
}

fn save_z80_ex<C: SnapshotCreator, W: Write>(
        version: Z80Version,
        snapshot: &C,
        mut wr: W
    ) -> Result<()>
{
    let ex_len = match version.header_ex_len() {
        Some(len) => len,
        None => return save_z80v1(snapshot, wr)
    };
    let model = snapshot.model();
    let regs = snapshot.cpu();
    let header = Header::new(version, &regs, snapshot.border_color());

    let mut head_ex = HeaderEx::default();
    head_ex.pc = regs.pc.to_le_bytes();
    head_ex.hw_mode = model.hw_mode(ex_len);
    if model == ComputerModel::Spectrum128 {
        head_ex.port1 = snapshot.paging();
    }
    if version == Z80Version::V3 {
        let (ts_lo, ts_hi) = cycles_to_z80(snapshot.current_clock(), model);
        head_ex.ts_lo = ts_lo.to_le_bytes();
        head_ex.ts_hi = ts_hi;
        head_ex.fn1 = !0;
        head_ex.fn2 = !0;
    }

    header.write_struct(wr.by_ref())?;
    wr.write_all(&ex_len.to_le_bytes())?;
    head_ex.write_struct_with_limit(wr.by_ref(), ex_len as usize)?;
    save_ram_pages(wr.by_ref(), snapshot, model)?;
    wr.flush()
}

/// Saves a **Z80** file version 2 into `wr` from the provided reference to a `snapshot` struct
/// implementing [SnapshotCreator].
pub fn save_z80v2<C: SnapshotCreator, W: Write>(snapshot: &C, wr: W) -> Result<()> {
    save_z80_ex(Z80Version::V2, snapshot, wr)
}

/// Saves a **Z80** file version 3 into `wr` from the provided reference to a `snapshot` struct
/// implementing [SnapshotCreator].
///
/// The frame T-state counter is preserved in this version.
pub fn save_z80v3<C: SnapshotCreator, W: Write>(snapshot: &C, wr: W) -> Result<()> {
    save_z80_ex(Z80Version::V3, snapshot, wr)
}

/// Saves a **Z80** file of the given `version`.
pub fn save_z80<C: SnapshotCreator, W: Write>(
        version: Z80Version,
        snapshot: &C,
        wr: W
    ) -> Result<()>
{
    save_z80_ex(version, snapshot, wr)
}
