/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
/*! **TAP** file format utilities.

# TAP format

A **TAP** file consists of blocks of data each prepended by a 2 byte (LSB) block length indicator.
Those blocks will be referenced here as *TAP chunks*.

The first byte of each block is a `flag` byte: `0x00` for header blocks and `0xff` for data blocks.
After the flag byte the actual data follows, after which a checksum byte, calculated such that
XORing all the data bytes together (including the flag byte) produces `0`.

## *TAPE* pulses

[TapPulseIter] turns all *TAP chunks* of a file into the signal expected by the Spectrum's ROM
loading routines: lead tone, two sync pulses and two pulses for each bit of data, with a pause
between chunks.

```no_run
use picospec_formats::tap::*;

let data = std::fs::read("some.tap")?;
let pulses = TapPulseIter::new(data)?;
println!("{} chunks", pulses.chunk_count());
# Ok::<(), std::io::Error>(())
```
*/
use core::borrow::Borrow;
use core::fmt;
use core::ops::Range;
use std::io::{Cursor, Error, ErrorKind, Result};

use log::debug;

use picospec_core::chip::Pulse;

pub mod pulse;

use pulse::{ReadEncPulseIter, consts::PAUSE_PULSE_LENGTH};

pub const HEAD_BLOCK_FLAG: u8 = 0x00;
pub const DATA_BLOCK_FLAG: u8 = 0xFF;

/// Calculates bit toggle checksum from the given iterator of `u8`.
pub fn checksum<I: IntoIterator<Item=B>, B: Borrow<u8>>(iter: I) -> u8 {
    iter.into_iter().fold(0, |acc, x| acc ^ x.borrow())
}

/// A *TAP chunk* wrapper over a byte container, without the length prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TapChunk<T> {
    data: T
}

/// Iterates over *TAP chunks* of a byte container.
///
/// Zero length chunks are skipped. A chunk with a length prefix larger than the rest of
/// the data yields an [ErrorKind::UnexpectedEof] error, after which the iterator is done.
#[derive(Clone, Debug)]
pub struct TapChunkIter<'a> {
    data: &'a [u8],
    position: usize
}

/// Encodes all *TAP chunks* of a file as a sequence of [Pulse]s.
///
/// Each chunk starts with a high level and the level alternates with each pulse.
/// A low level pause separates consecutive chunks.
pub struct TapPulseIter {
    chunks: std::vec::IntoIter<Vec<u8>>,
    pulses: ReadEncPulseIter<Cursor<Vec<u8>>>,
    chunk_count: usize,
    level: bool
}

impl<T> From<T> for TapChunk<T> {
    fn from(data: T) -> Self {
        TapChunk { data }
    }
}

impl<T: AsRef<[u8]>> TapChunk<T> {
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_ref()
    }
    /// Returns the flag byte.
    pub fn flag(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    pub fn is_head(&self) -> bool {
        self.flag() == Some(HEAD_BLOCK_FLAG)
    }

    pub fn is_data(&self) -> bool {
        !self.is_head()
    }
    /// Returns `true` if the chunk's checksum byte is valid.
    pub fn is_valid(&self) -> bool {
        !self.as_slice().is_empty() && checksum(self.as_slice()) == 0
    }
}

impl<T: AsRef<[u8]>> fmt::Display for TapChunk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} block: {} bytes{}",
            if self.is_head() { "header" } else { "data" },
            self.as_slice().len(),
            if self.is_valid() { "" } else { ", invalid checksum" })
    }
}

impl<'a> TapChunkIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        TapChunkIter { data, position: 0 }
    }

    fn next_range(&mut self) -> Option<Result<Range<usize>>> {
        loop {
            let rest = self.data.get(self.position..)?;
            let size = match rest {
                [] => return None,
                [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]) as usize,
                _ => {
                    self.position = self.data.len();
                    return Some(Err(Error::new(ErrorKind::UnexpectedEof, "TAP: truncated chunk length")))
                }
            };
            let start = self.position + 2;
            if size > self.data.len() - start {
                self.position = self.data.len();
                return Some(Err(Error::new(ErrorKind::UnexpectedEof, "TAP: truncated chunk")))
            }
            self.position = start + size;
            if size != 0 {
                return Some(Ok(start..start + size))
            }
        }
    }
}

impl<'a> From<&'a [u8]> for TapChunkIter<'a> {
    fn from(data: &'a [u8]) -> Self {
        TapChunkIter::new(data)
    }
}

impl<'a> Iterator for TapChunkIter<'a> {
    type Item = Result<TapChunk<&'a [u8]>>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        self.next_range().map(|res| res.map(|range| TapChunk::from(&data[range])))
    }
}

impl TapPulseIter {
    /// Parses *TAP* data and creates the pulse iterator.
    ///
    /// # Errors
    /// The whole data is validated first: a truncated chunk yields an [ErrorKind::UnexpectedEof] error.
    pub fn new<T: AsRef<[u8]>>(data: T) -> Result<Self> {
        let mut chunks = Vec::new();
        for chunk in TapChunkIter::new(data.as_ref()) {
            let chunk = chunk?;
            debug!("TAP: {}", chunk);
            chunks.push(chunk.as_slice().to_vec());
        }
        debug!("TAP: {} chunks", chunks.len());
        let chunk_count = chunks.len();
        let mut chunks = chunks.into_iter();
        let first = chunks.next().unwrap_or_default();
        Ok(TapPulseIter {
            chunks,
            pulses: ReadEncPulseIter::new(Cursor::new(first)),
            chunk_count,
            level: true
        })
    }
    /// Returns the number of non-empty chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}

impl Iterator for TapPulseIter {
    type Item = Pulse;

    fn next(&mut self) -> Option<Pulse> {
        if let Some(duration) = self.pulses.next() {
            let level = self.level;
            self.level = !level;
            return Some(Pulse { duration, level })
        }
        let chunk = self.chunks.next()?;
        self.pulses = ReadEncPulseIter::new(Cursor::new(chunk));
        self.level = true;
        Some(Pulse { duration: PAUSE_PULSE_LENGTH, level: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse::consts::*;

    const TAP: &[u8] = &[
        0x13, 0x00, 0x00, 0x03, 0x52, 0x4f, 0x4d, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
        0x02, 0x00, 0x00, 0x00, 0x00, 0x80, 0xf1,
        0x00, 0x00,
        0x04, 0x00, 0xff, 0xf3, 0xaf, 0xa3
    ];

    #[test]
    fn tap_chunks_work() {
        let chunks: Vec<_> = TapChunkIter::new(TAP).collect::<Result<_>>().unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_head());
        assert!(chunks[0].is_valid());
        assert_eq!(chunks[0].as_slice().len(), 19);
        assert!(chunks[1].is_data());
        assert!(chunks[1].is_valid());
        assert_eq!(chunks[1].as_slice(), &[0xff, 0xf3, 0xaf, 0xa3]);
        assert_eq!(chunks[1].to_string(), "data block: 4 bytes");
        assert!(TapChunkIter::new(&[]).next().is_none());
    }

    #[test]
    fn tap_truncated_chunk_is_an_error() {
        let err = TapChunkIter::new(&TAP[..TAP.len() - 1]).last().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        let err = TapChunkIter::new(&TAP[..22]).last().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert_eq!(TapPulseIter::new(&TAP[..TAP.len() - 1]).err().unwrap().kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn tap_pulses_work() {
        let mut pulses = TapPulseIter::new(TAP).unwrap();
        assert_eq!(pulses.chunk_count(), 2);
        let mut level = true;
        for _ in 0..LEAD_PULSES_HEAD {
            assert_eq!(pulses.next(), Some(Pulse { duration: LEAD_PULSE_LENGTH, level }));
            level = !level;
        }
        assert_eq!(pulses.next().unwrap().duration, SYNC_PULSE1_LENGTH);
        assert_eq!(pulses.next().unwrap().duration, SYNC_PULSE2_LENGTH);
        let data: Vec<_> = pulses.by_ref().take(19 * 16).collect();
        assert!(data.iter().all(|p| p.duration == ZERO_PULSE_LENGTH || p.duration == ONE_PULSE_LENGTH));
        assert_eq!(pulses.next(), Some(Pulse { duration: PAUSE_PULSE_LENGTH, level: false }));
        assert_eq!(pulses.next(), Some(Pulse { duration: LEAD_PULSE_LENGTH, level: true }));
        assert_eq!(pulses.by_ref().take(LEAD_PULSES_DATA as usize - 1).count(), LEAD_PULSES_DATA as usize - 1);
        assert_eq!(pulses.by_ref().count(), 2 + 4 * 16);
        assert_eq!(pulses.next(), None);
    }

    #[test]
    fn tap_empty_file_has_no_pulses() {
        let mut pulses = TapPulseIter::new(&[0u8, 0][..]).unwrap();
        assert_eq!(pulses.chunk_count(), 0);
        assert_eq!(pulses.next(), None);
    }
}
