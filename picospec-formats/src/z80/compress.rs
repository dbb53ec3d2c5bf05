/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use std::io::{Write, Result};

const ESCAPE: u8 = 0xED;
const MIN_RUN: usize = 5;
const MIN_ESCAPE_RUN: usize = 2;

/// Writes `data` compressed with the **Z80** escape encoding.
///
/// Runs of at least 5 equal bytes and runs of at least 2 `0xED` bytes are encoded as
/// `ED ED count byte`. The byte immediately following a single `0xED` is always written
/// as is, so the decoder can never mistake it for a start of a run.
pub fn compress_write_all<W: Write>(data: &[u8], mut wr: W) -> Result<()> {
    let mut literal = 0;
    let mut pos = 0;
    while let Some(&byte) = data.get(pos) {
        let run = data[pos..].iter()
                             .take(u8::MAX as usize)
                             .take_while(|&&b| b == byte)
                             .count();
        if run >= MIN_RUN || (byte == ESCAPE && run >= MIN_ESCAPE_RUN) {
            wr.write_all(&data[literal..pos])?;
            wr.write_all(&[ESCAPE, ESCAPE, run as u8, byte])?;
            pos += run;
            literal = pos;
        }
        else if byte == ESCAPE {
            pos = data.len().min(pos + 2);
        }
        else {
            pos += run;
        }
    }
    wr.write_all(&data[literal..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        compress_write_all(data, &mut buf).unwrap();
        buf
    }

    #[test]
    fn compress_works() {
        assert!(compress(&[]).is_empty());
        assert_eq!(&[42], &compress(&[42])[..]);
        assert_eq!(&[0xED], &compress(&[0xED])[..]);
        assert_eq!(&[1,2,3,42,77], &compress(&[1,2,3,42,77])[..]);
        assert_eq!(&[42,42,42,42], &compress(&[42;4])[..]);
        assert_eq!(&[0xED,0xED,5,42], &compress(&[42;5])[..]);
        assert_eq!(&[0xED,0xED,2,0xED], &compress(&[0xED,0xED])[..]);
        assert_eq!(&[69,0xED,0xED,2,0xED], &compress(&[69,0xED,0xED])[..]);
        assert_eq!(&[0xED,69,0xED], &compress(&[0xED,69,0xED])[..]);
        assert_eq!(&[0xED,0xED,255,0], &compress(&[0;255])[..]);
        assert_eq!(&[0xED,0xED,255,0,0], &compress(&[0;256])[..]);
        assert_eq!(&[0xED,0xED,255,69,0xED,0xED,255,69,0xED,0xED,255,69,0xED,0xED,235,69],
                   &compress(&[69;1000])[..]);
        assert_eq!(&[0xED,0xED,5,1,2,2,2,2], &compress(&[1,1,1,1,1,2,2,2,2])[..]);
        assert_eq!(&[1,2,2,3,3,3,4,4,4,0xED,0xED,5,5,0xED,0xED,6,6],
                   &compress(&[1,2,2,3,3,3,4,4,4,5,5,5,5,5,6,6,6,6,6,6])[..]);
    }

    #[test]
    fn compress_single_escape_is_followed_by_a_literal() {
        assert_eq!(&[0xED,0,0xED,0xED,5,0], &compress(&[0xED,0,0,0,0,0,0])[..]);
        assert_eq!(&[7,0xED,7,7,7,7,7], &compress(&[7,0xED,7,7,7,7,7])[..]);
        let mut data = vec![0xED; 256];
        data.push(1);
        assert_eq!(&[0xED,0xED,255,0xED,0xED,1], &compress(&data)[..]);
    }

    #[test]
    fn compress_shortens_runs() {
        for byte in [0u8, 0x55, 0xED, 0xFF].iter().copied() {
            for len in 1..=300 {
                let data = vec![byte; len];
                let packed = compress(&data);
                if len >= 5 {
                    assert!(packed.len() < data.len());
                }
                else if byte != 0xED || len == 1 {
                    assert_eq!(packed, data);
                }
                else {
                    assert_eq!(packed, [0xED, 0xED, len as u8, 0xED]);
                }
            }
        }
    }
}
