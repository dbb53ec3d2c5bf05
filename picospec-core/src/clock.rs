/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Real time pacing of the emulation.
//!
//! The emulated CPU runs in short bursts (a single instruction per step). After each step
//! the [PacingGovernor] compares the time budget of the cycles consumed with the time
//! that has really passed and levels the difference by busy-waiting.
use core::time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use log::trace;

/// A linear T-state timestamp type, relative to the beginning of a frame.
pub type FTs = i32;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// The drift (in nanoseconds) that the emulation may run ahead of real time before
/// the governor starts to wait.
pub const DRIFT_WAIT_THRESHOLD_NANOS: i64 = 1_000;
/// The maximum backlog the governor will try to recover, expressed in T-states.
///
/// This equals roughly 100 average instructions.
pub const MAX_BACKLOG_TSTATES: u32 = 400;

/// A monotonic clock capability used by the [PacingGovernor].
pub trait MonotonicClock {
    /// Returns the number of nanoseconds elapsed from an arbitrary, but fixed origin.
    fn now_nanos(&self) -> u64;
    /// Should block until [MonotonicClock::now_nanos] reaches at least the `deadline`.
    fn wait_until(&mut self, deadline: u64);
}

/// A [MonotonicClock] implementation that spins on [std::time::Instant].
///
/// Spinning is intentional: the waits are in the range of microseconds, far below
/// the resolution of the thread scheduler.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Copy, Debug)]
pub struct InstantClock {
    origin: Instant
}

/// Keeps the emulation in sync with the wall clock.
#[derive(Clone, Debug)]
pub struct PacingGovernor<C> {
    clock: C,
    cpu_hz: u32,
    moderate: bool,
    last_nanos: u64,
    /// Positive: emulation is ahead of real time, negative: it's behind.
    drift: i64,
    nanos_remainder: u64,
}

/// Returns the real time duration of the given number of T-states at `cpu_hz` clock rate.
pub const fn duration_from_tstates_cpu_hz(tstates: u32, cpu_hz: u32) -> Duration {
    Duration::from_nanos(tstates as u64 * NANOS_PER_SEC / cpu_hz as u64)
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for InstantClock {
    fn default() -> Self {
        InstantClock { origin: Instant::now() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl MonotonicClock for InstantClock {
    #[inline]
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn wait_until(&mut self, deadline: u64) {
        while self.now_nanos() < deadline {
            core::hint::spin_loop();
        }
    }
}

impl<C: MonotonicClock> PacingGovernor<C> {
    /// Creates a moderated governor for a CPU clocked at `cpu_hz`.
    pub fn new(clock: C, cpu_hz: u32) -> Self {
        let last_nanos = clock.now_nanos();
        PacingGovernor {
            clock,
            cpu_hz,
            moderate: true,
            last_nanos,
            drift: 0,
            nanos_remainder: 0
        }
    }
    /// Changes the emulated CPU clock rate and restarts the synchronization.
    pub fn set_cpu_hz(&mut self, cpu_hz: u32) {
        self.cpu_hz = cpu_hz;
        self.restart();
    }
    /// Returns the emulated CPU clock rate.
    pub fn cpu_hz(&self) -> u32 {
        self.cpu_hz
    }
    /// Returns `true` if the emulation is synchronized with real time.
    pub fn is_moderated(&self) -> bool {
        self.moderate
    }
    /// Enables or disables real time synchronization.
    ///
    /// Enabling an already enabled governor changes nothing.
    pub fn moderate(&mut self, on: bool) {
        if on && !self.moderate {
            self.restart();
        }
        self.moderate = on;
    }
    /// Toggles real time synchronization. Returns the new state.
    pub fn toggle_moderate(&mut self) -> bool {
        self.moderate(!self.moderate);
        self.moderate
    }
    /// Forgets any accumulated drift and starts measuring from now.
    ///
    /// Useful after a lengthy operation that didn't run the emulation, e.g. loading a snapshot.
    pub fn restart(&mut self) {
        self.last_nanos = self.clock.now_nanos();
        self.drift = 0;
        self.nanos_remainder = 0;
    }
    /// Returns the current drift in nanoseconds.
    pub fn drift(&self) -> i64 {
        self.drift
    }
    /// Returns the lowest value the drift may fall to.
    pub fn drift_floor(&self) -> i64 {
        -(duration_from_tstates_cpu_hz(MAX_BACKLOG_TSTATES, self.cpu_hz).as_nanos() as i64)
    }

    pub fn clock_ref(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
    /// Accounts `tstates` consumed by the last CPU step and waits if the emulation
    /// is ahead of the real time.
    ///
    /// Does nothing if the governor is not moderating.
    pub fn synchronize(&mut self, tstates: u32) {
        if !self.moderate {
            return
        }
        let budget = self.tstates_to_nanos(tstates);
        let now = self.clock.now_nanos();
        let elapsed = now.saturating_sub(self.last_nanos);
        self.last_nanos = now;
        self.drift += budget as i64 - elapsed as i64;

        if self.drift > DRIFT_WAIT_THRESHOLD_NANOS {
            self.clock.wait_until(now + self.drift as u64);
            let now = self.clock.now_nanos();
            self.drift -= now.saturating_sub(self.last_nanos) as i64;
            self.last_nanos = now;
        }

        let floor = self.drift_floor();
        if self.drift < floor {
            trace!("pacing behind by {} ns, clamped", -self.drift);
            self.drift = floor;
        }
    }

    fn tstates_to_nanos(&mut self, tstates: u32) -> u64 {
        let total = tstates as u64 * NANOS_PER_SEC + self.nanos_remainder;
        let cpu_hz = self.cpu_hz as u64;
        self.nanos_remainder = total % cpu_hz;
        total / cpu_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct SimClock {
        now: u64,
        waits: u32
    }

    impl MonotonicClock for SimClock {
        fn now_nanos(&self) -> u64 {
            self.now
        }

        fn wait_until(&mut self, deadline: u64) {
            self.waits += 1;
            self.now = self.now.max(deadline);
        }
    }

    #[test]
    fn governor_tracks_real_time() {
        // 7 T-states at 3.5MHz take exactly 2us
        let mut gov = PacingGovernor::new(SimClock::default(), 3_500_000);
        for _ in 0..1000 {
            gov.clock_mut().now += 2_000;
            gov.synchronize(7);
            assert_eq!(gov.drift(), 0);
        }
        assert_eq!(gov.clock_ref().waits, 0);
    }

    #[test]
    fn governor_waits_when_ahead() {
        let mut gov = PacingGovernor::new(SimClock::default(), 3_500_000);
        for n in 1..=100u64 {
            // no real time has passed at all
            gov.synchronize(7);
            assert_eq!(gov.drift(), 0);
            assert_eq!(gov.clock_ref().now, n * 2_000);
        }
        assert_eq!(gov.clock_ref().waits, 100);
        // below threshold the governor lets the CPU run ahead
        gov.synchronize(1);
        assert_eq!(gov.drift(), 285);
        assert_eq!(gov.clock_ref().waits, 100);
    }

    #[test]
    fn governor_clamps_backlog() {
        let mut gov = PacingGovernor::new(SimClock::default(), 3_500_000);
        let floor = gov.drift_floor();
        assert_eq!(floor, -114_285);
        gov.clock_mut().now += 1_000_000_000;
        gov.synchronize(4);
        assert_eq!(gov.drift(), floor);
        for _ in 0..100 {
            gov.clock_mut().now += 10_000;
            gov.synchronize(4);
            assert!(gov.drift() >= floor);
        }
        // catching up: real time stands still
        let mut steps = 0;
        while gov.drift() < 0 {
            gov.synchronize(4);
            steps += 1;
        }
        assert!(steps <= MAX_BACKLOG_TSTATES as usize / 4 + 1);
        assert_eq!(gov.clock_ref().waits, 0);
    }

    #[test]
    fn moderation_toggle_is_idempotent() {
        let mut gov = PacingGovernor::new(SimClock::default(), 3_500_000);
        assert!(gov.is_moderated());
        gov.moderate(true);
        assert!(gov.is_moderated());
        assert!(!gov.toggle_moderate());
        gov.clock_mut().now += 5_000_000;
        gov.synchronize(70_000);
        assert_eq!(gov.drift(), 0);
        assert_eq!(gov.clock_ref().waits, 0);
        gov.moderate(false);
        assert!(!gov.is_moderated());
        assert!(gov.toggle_moderate());
        // re-enabling starts measuring from now
        gov.clock_mut().now += 2_000;
        gov.synchronize(7);
        assert_eq!(gov.drift(), 0);
    }
}
