/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use std::io::{Error, ErrorKind, Read, Result};
use memchr::memchr;

const ESCAPE: u8 = 0xED;

/// Decodes the **Z80** escape encoding via the [Read] interface.
///
/// An incomplete `ED ED` sequence at the end of the data is an [ErrorKind::InvalidData] error,
/// reported once the bytes preceding it have been read.
pub(super) struct MemDecompress<'a> {
    data: &'a [u8],
    fill: u8,
    repeat: usize
}

impl<'a> MemDecompress<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        MemDecompress { data, fill: 0, repeat: 0 }
    }
}

/// Returns the number of bytes before the next `ED ED` sequence.
fn literal_len(data: &[u8]) -> usize {
    let mut index = 0;
    while let Some(found) = memchr(ESCAPE, &data[index..]) {
        let pos = index + found;
        if let Some(&ESCAPE) = data.get(pos + 1) {
            return pos
        }
        index = pos + 1;
    }
    data.len()
}

impl<'a> Read for MemDecompress<'a> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let target = &mut buf[filled..];
            if self.repeat != 0 {
                let len = self.repeat.min(target.len());
                for p in target[..len].iter_mut() {
                    *p = self.fill;
                }
                self.repeat -= len;
                filled += len;
                continue
            }
            let data = self.data;
            match data {
                [] => break,
                [ESCAPE, ESCAPE, repeat, fill, rest @ ..] => {
                    self.repeat = *repeat as usize;
                    self.fill = *fill;
                    self.data = rest;
                }
                [ESCAPE, ESCAPE]|[ESCAPE, ESCAPE, _] => {
                    if filled == 0 {
                        return Err(Error::new(ErrorKind::InvalidData, "Z80: incomplete escape sequence"))
                    }
                    break
                }
                _ => {
                    let len = literal_len(data).min(target.len());
                    target[..len].copy_from_slice(&data[..len]);
                    self.data = &data[len..];
                    filled += len;
                }
            }
        }
        Ok(filled)
    }
}
