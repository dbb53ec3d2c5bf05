/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Chipset state: the ULA port latch flags and the EAR input line.
use core::fmt;
use core::num::NonZeroU32;

use bitflags::bitflags;

bitflags! {
    /// ZX Spectrum's ULA port flags.
    ///
    /// Written to port `0xFE`:
    ///
    /// | bit | 7 | 6 | 5 |  4  |  3  |  2 |  1 |  0 |
    /// |-----|---|---|---|-----|-----|----|----|----|
    /// |     | - | - | - | EAR | MIC | B2 | B1 | B0 |
    ///
    /// When read, bit 6 reflects the EAR input and bits 0-4 the keyboard half-rows.
    #[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
    pub struct UlaPortFlags: u8 {
        const BORDER_MASK   = 0b0000_0111;
        const MIC_OUT       = 0b0000_1000;
        const EAR_OUT       = 0b0001_0000;
        const KEYBOARD_MASK = 0b0001_1111;
        const EAR_IN        = 0b0100_0000;
    }
}

/// A single tape signal pulse: the line is held at `level` for `duration` T-states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pulse {
    pub duration: NonZeroU32,
    pub level: bool
}

/// The EAR input line driven by a queue of timed pulses.
///
/// The queue is consumed as T-states elapse. When it runs out the line falls back to
/// the quiescent (low) level and stays there until new pulses are fed.
pub struct EarIn {
    pulses: Option<Box<dyn Iterator<Item=Pulse>>>,
    level: bool,
    remaining: u64
}

impl fmt::Debug for EarIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EarIn")
            .field("playing", &self.is_playing())
            .field("level", &self.level)
            .field("remaining", &self.remaining)
            .finish()
    }
}

impl Default for EarIn {
    fn default() -> Self {
        EarIn { pulses: None, level: false, remaining: 0 }
    }
}

impl EarIn {
    /// Replaces any pending pulses with `pulses` and starts playing them immediately.
    pub fn feed<I>(&mut self, pulses: I)
        where I: IntoIterator<Item=Pulse>,
              I::IntoIter: 'static
    {
        self.pulses = Some(Box::new(pulses.into_iter()));
        self.remaining = 0;
        self.next_pulse();
    }
    /// Moves the line forward by `tstates`, switching the level at every pulse boundary.
    pub fn advance(&mut self, tstates: u32) {
        if self.pulses.is_none() {
            return
        }
        let mut tstates = u64::from(tstates);
        while tstates >= self.remaining {
            tstates -= self.remaining;
            if !self.next_pulse() {
                return
            }
        }
        self.remaining -= tstates;
    }
    /// Returns the current level of the line.
    #[inline]
    pub fn ear(&self) -> bool {
        self.level
    }
    /// Returns `true` while there are pulses left to play.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.pulses.is_some()
    }
    /// Discards pending pulses and brings the line to the quiescent level.
    pub fn stop(&mut self) {
        self.pulses = None;
        self.level = false;
        self.remaining = 0;
    }

    fn next_pulse(&mut self) -> bool {
        match self.pulses.as_mut().and_then(|p| p.next()) {
            Some(Pulse { duration, level }) => {
                self.level = level;
                self.remaining = u64::from(duration.get());
                true
            }
            None => {
                self.stop();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(duration: u32, level: bool) -> Pulse {
        Pulse { duration: NonZeroU32::new(duration).unwrap(), level }
    }

    #[test]
    fn ear_in_follows_pulses() {
        let mut ear_in = EarIn::default();
        assert!(!ear_in.is_playing());
        ear_in.advance(1000);
        assert!(!ear_in.ear());
        ear_in.feed(vec![pulse(10, true), pulse(5, false), pulse(20, true)]);
        assert!(ear_in.is_playing());
        assert!(ear_in.ear());
        ear_in.advance(9);
        assert!(ear_in.ear());
        ear_in.advance(1);
        assert!(!ear_in.ear());
        // skip over a whole pulse at once
        ear_in.advance(6);
        assert!(ear_in.ear());
        ear_in.advance(18);
        assert!(ear_in.ear());
        assert!(ear_in.is_playing());
        ear_in.advance(1);
        assert!(!ear_in.ear());
        assert!(!ear_in.is_playing());
        ear_in.advance(100);
        assert!(!ear_in.ear());
    }

    #[test]
    fn ear_in_stop_works() {
        let mut ear_in = EarIn::default();
        ear_in.feed(vec![pulse(10, true)]);
        assert!(ear_in.ear());
        ear_in.stop();
        assert!(!ear_in.ear());
        assert!(!ear_in.is_playing());
        ear_in.feed(Vec::new());
        assert!(!ear_in.is_playing());
    }
}
