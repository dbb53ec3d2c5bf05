/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::num::NonZeroU32;
use std::io::{Error, Read};
use super::consts::*;

/// The current state of the [ReadEncPulseIter].
#[derive(Debug)]
pub enum PulseIterState {
    /// Emitting lead pulses, `countdown` of them left.
    Lead { countdown: u16 },
    /// Emitting the 1st sync pulse.
    Sync1,
    /// Emitting the 2nd sync pulse.
    Sync2,
    /// Emitting data pulses of the `current` byte, most significant bit first.
    ///
    /// Each bit is sent as two half-waves, `pulse` counts them from 0 to 15.
    Data { current: u8, pulse: u8 },
    /// All bytes have been sent.
    Done,
    /// The underlying reader failed.
    Error(Error)
}

/// Encodes bytes read from the underlying reader as *TAPE* pulse intervals in T-states.
///
/// The first byte read is a flag byte, it selects the length of the lead tone:
/// [LEAD_PULSES_HEAD] when below `0x80`, [LEAD_PULSES_DATA] otherwise.
/// The lead tone is followed by two sync pulses and then the data pulses of all bytes,
/// the flag byte included.
#[derive(Debug)]
pub struct ReadEncPulseIter<R> {
    rd: R,
    state: PulseIterState,
    flag: u8,
}

impl PulseIterState {
    pub fn err(&self) -> Option<&Error> {
        match self {
            PulseIterState::Error(error) => Some(error),
            _ => None
        }
    }
    /// Returns `true` if there are no more pulses to emit.
    pub fn is_done(&self) -> bool {
        matches!(self, PulseIterState::Done|PulseIterState::Error(..))
    }

    pub fn is_lead(&self) -> bool {
        matches!(self, PulseIterState::Lead {..})
    }

    pub fn is_data(&self) -> bool {
        matches!(self, PulseIterState::Data {..})
    }
}

impl<R> ReadEncPulseIter<R> {
    pub fn state(&self) -> &PulseIterState {
        &self.state
    }
    /// Returns the flag byte of the current chunk.
    pub fn flag(&self) -> u8 {
        self.flag
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn into_inner(self) -> R {
        self.rd
    }
}

impl<R: Read> ReadEncPulseIter<R> {
    pub fn new(rd: R) -> Self {
        let mut iter = ReadEncPulseIter { rd, state: PulseIterState::Done, flag: 0 };
        iter.reset();
        iter
    }
    /// Reads the next flag byte and starts over with the lead tone.
    ///
    /// The state becomes [PulseIterState::Done] if the reader is exhausted.
    pub fn reset(&mut self) {
        self.state = match self.next_byte() {
            PulseIterState::Data { current: flag, .. } => {
                self.flag = flag;
                let countdown = if flag & 0x80 == 0 { LEAD_PULSES_HEAD } else { LEAD_PULSES_DATA };
                PulseIterState::Lead { countdown }
            }
            state => state
        };
    }

    fn next_byte(&mut self) -> PulseIterState {
        let mut byte = [0u8];
        loop {
            return match self.rd.read(&mut byte) {
                Ok(0) => PulseIterState::Done,
                Ok(_) => PulseIterState::Data { current: byte[0], pulse: 0 },
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => PulseIterState::Error(e)
            }
        }
    }
}

impl<R: Read> Iterator for ReadEncPulseIter<R> {
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        match self.state {
            PulseIterState::Lead { ref mut countdown } => {
                *countdown -= 1;
                if *countdown == 0 {
                    self.state = PulseIterState::Sync1;
                }
                Some(LEAD_PULSE_LENGTH)
            }
            PulseIterState::Sync1 => {
                self.state = PulseIterState::Sync2;
                Some(SYNC_PULSE1_LENGTH)
            }
            PulseIterState::Sync2 => {
                self.state = PulseIterState::Data { current: self.flag, pulse: 0 };
                Some(SYNC_PULSE2_LENGTH)
            }
            PulseIterState::Data { ref mut current, ref mut pulse } => {
                let length = if *current & 0x80 != 0 { ONE_PULSE_LENGTH } else { ZERO_PULSE_LENGTH };
                if *pulse == 15 {
                    self.state = self.next_byte();
                }
                else {
                    if *pulse & 1 == 1 {
                        *current <<= 1;
                    }
                    *pulse += 1;
                }
                Some(length)
            }
            PulseIterState::Done|PulseIterState::Error(..) => None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    fn bit_pulses(byte: u8) -> Vec<NonZeroU32> {
        (0..8).rev().flat_map(|n| {
            let length = if byte & (1 << n) != 0 { ONE_PULSE_LENGTH } else { ZERO_PULSE_LENGTH };
            [length, length]
        }).collect()
    }

    #[test]
    fn read_enc_pulse_iter_works() {
        let data = [0xFF, 0xA5, 0x00];
        let mut iter = ReadEncPulseIter::new(Cursor::new(data));
        assert_eq!(iter.flag(), 0xFF);
        assert!(iter.state().is_lead());
        assert!(iter.by_ref().take(LEAD_PULSES_DATA as usize).all(|p| p == LEAD_PULSE_LENGTH));
        assert_eq!(iter.next(), Some(SYNC_PULSE1_LENGTH));
        assert_eq!(iter.next(), Some(SYNC_PULSE2_LENGTH));
        assert!(iter.state().is_data());
        let expected: Vec<_> = data.iter().flat_map(|&b| bit_pulses(b)).collect();
        assert_eq!(expected[16..32], [
            ONE_PULSE_LENGTH, ONE_PULSE_LENGTH, ZERO_PULSE_LENGTH, ZERO_PULSE_LENGTH,
            ONE_PULSE_LENGTH, ONE_PULSE_LENGTH, ZERO_PULSE_LENGTH, ZERO_PULSE_LENGTH,
            ZERO_PULSE_LENGTH, ZERO_PULSE_LENGTH, ONE_PULSE_LENGTH, ONE_PULSE_LENGTH,
            ZERO_PULSE_LENGTH, ZERO_PULSE_LENGTH, ONE_PULSE_LENGTH, ONE_PULSE_LENGTH]);
        assert_eq!(iter.by_ref().collect::<Vec<_>>(), expected);
        assert!(iter.is_done());
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn read_enc_pulse_header_lead_works() {
        let mut iter = ReadEncPulseIter::new(Cursor::new([0x00]));
        assert_eq!(iter.by_ref().take_while(|&p| p == LEAD_PULSE_LENGTH).count(),
                   LEAD_PULSES_HEAD as usize);
        // take_while consumed the 1st sync pulse
        assert_eq!(iter.next(), Some(SYNC_PULSE2_LENGTH));
        assert_eq!(iter.by_ref().collect::<Vec<_>>(), vec![ZERO_PULSE_LENGTH; 16]);
        assert!(iter.is_done());
    }

    #[test]
    fn read_enc_pulse_total_duration_works() {
        let data = [0xFF, 0x01, 0x80, 0x3C];
        let total: u64 = ReadEncPulseIter::new(&data[..]).map(|p| p.get() as u64).sum();
        let ones: u64 = data.iter().map(|b| b.count_ones() as u64).sum();
        let zeros = data.len() as u64 * 8 - ones;
        assert_eq!(total, LEAD_PULSES_DATA as u64 * 2168 + 667 + 735
                          + ones * 2 * 1710 + zeros * 2 * 855);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "broken"))
        }
    }

    #[test]
    fn read_enc_pulse_empty_or_failing_reader_is_done() {
        let mut iter = ReadEncPulseIter::new(Cursor::new([]));
        assert!(iter.is_done());
        assert_eq!(iter.next(), None);
        let mut iter = ReadEncPulseIter::new(FailingReader);
        assert!(iter.is_done());
        assert!(iter.state().err().is_some());
        assert_eq!(iter.next(), None);
    }
}
