/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use std::io::{self, Read, Result};

use log::{debug, warn};

use crate::snapshot::*;
use crate::{ReadExactEx, StructRead};

use super::common::*;
use super::decompress::*;

/// The port of the 128k memory paging latch.
pub const PAGING_PORT: u16 = 0x7ffd;

fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Reads from `rd` until `buf` is full, then checks that `rd` has nothing more to give.
fn read_exact_and_end<R: Read>(mut rd: R, buf: &mut [u8]) -> Result<bool> {
    if rd.read_exact_or_to_end(buf)? != buf.len() {
        return Err(invalid_data("Z80: memory image is too short"))
    }
    let mut probe = [0u8;1];
    Ok(rd.read(&mut probe)? == 0)
}

/// Loads a **Z80** file into the provided snapshot `loader` from a source.
///
/// Returns the version of the file that has been loaded.
///
/// # Errors
/// Malformed headers, unsupported hardware modes and memory pages or memory images of
/// the wrong size result in an [io::ErrorKind::InvalidData] error. The `loader` may have been
/// partially fed by then.
pub fn load_z80<R: Read, S: SnapshotLoader>(
        mut rd: R,
        loader: &mut S
    ) -> Result<Z80Version>
{
    let header = Header::read_new_struct(rd.by_ref())?;
    let mut regs = header.registers()?;
    let mut version = Z80Version::V1;
    let mut model = ComputerModel::Spectrum48;

    let header_ex = if regs.pc == 0 {
        let (ver, ex_len, head_ex) = load_header_ex(rd.by_ref())?;
        version = ver;
        regs.pc = u16::from_le_bytes(head_ex.pc);
        let alt_hw = Flags3::from(head_ex.flags3).is_alt_hw_mode();
        model = ComputerModel::from_hw_mode(head_ex.hw_mode, ex_len, alt_hw)
                .ok_or_else(|| invalid_data("Z80: unsupported hardware mode"))?;
        Some(head_ex)
    }
    else {
        None
    };
    debug!("Z80: {:?} {}", version, model);

    let flags1 = Flags1::from(header.flags1);
    loader.select_model(model, flags1.border_color())
          .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    loader.assign_cpu(regs);

    let mut buf = Vec::new();
    if version == Z80Version::V1 {
        let mut image = vec![0u8; MEMORY_V1_SIZE];
        let is_end = if flags1.is_mem_compressed() {
            rd.read_to_end(&mut buf)?;
            let data = match buf.len().checked_sub(MEMORY_V1_TERM.len()) {
                Some(end) if &buf[end..] == MEMORY_V1_TERM => &buf[..end],
                _ => &buf[..]
            };
            read_exact_and_end(MemDecompress::new(data), &mut image)?
        }
        else {
            read_exact_and_end(rd.by_ref(), &mut image)?
        };
        if !is_end {
            warn!("Z80: ignoring data after the 48k memory image");
        }
        for (&bank, page) in model.snapshot_ram_banks().iter().zip(image.chunks(PAGE_SIZE)) {
            loader.read_into_memory(bank, page)?;
        }
    }
    else {
        let mut page_buf = vec![0u8; PAGE_SIZE];
        while let Some((len, page, is_compressed)) = load_mem_header(rd.by_ref())? {
            let bank = model.page_to_ram_bank(page)
                            .ok_or_else(|| invalid_data("Z80: unsupported memory page"))?;
            debug!("Z80: page: {} bank: {} length: {}", page, bank, len);
            if is_compressed {
                buf.resize(len, 0);
                rd.read_exact(&mut buf)?;
                if !read_exact_and_end(MemDecompress::new(&buf), &mut page_buf)? {
                    return Err(invalid_data("Z80: memory page is too long"))
                }
            }
            else {
                rd.read_exact(&mut page_buf)?;
            }
            loader.read_into_memory(bank, &page_buf[..])?;
        }
    }

    if let Some(head_ex) = header_ex {
        if version == Z80Version::V3 {
            let ts = z80_to_cycles(u16::from_le_bytes(head_ex.ts_lo), head_ex.ts_hi, model);
            loader.set_clock(ts);
        }
        if model == ComputerModel::Spectrum128 {
            loader.write_port(PAGING_PORT, head_ex.port1);
        }
    }
    Ok(version)
}
