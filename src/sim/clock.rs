//! Fixed-timestep scheduler and tick-based timers
//!
//! The frame callback hands over whatever real time passed; the scheduler
//! turns it into whole simulation ticks and keeps the remainder for later.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_DELTA_MS, STEP_MS, TIME_EPSILON_MS};

/// Converts variable frame deltas into a whole number of fixed ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler {
    /// Fixed tick duration (ms)
    step_ms: f64,
    /// Frame deltas larger than this are clamped (ms)
    max_delta_ms: f64,
    /// Real time not yet converted into ticks (ms)
    accumulator_ms: f64,
    /// Total ticks executed since construction
    ticks: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(STEP_MS, MAX_FRAME_DELTA_MS)
    }
}

impl Scheduler {
    pub fn new(step_ms: f64, max_delta_ms: f64) -> Self {
        let step_ms = if step_ms.is_finite() && step_ms > 0.0 { step_ms } else { STEP_MS };
        Self {
            step_ms,
            max_delta_ms: max_delta_ms.max(step_ms),
            accumulator_ms: 0.0,
            ticks: 0,
        }
    }

    /// Fixed tick duration (ms)
    #[inline]
    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    /// Leftover time waiting to become a tick (ms)
    #[inline]
    pub fn accumulator_ms(&self) -> f64 {
        self.accumulator_ms
    }

    /// Total ticks executed
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Upper bound on ticks a single callback can produce
    pub fn max_ticks_per_frame(&self) -> u32 {
        ((self.max_delta_ms + self.accumulator_cap()) / self.step_ms).floor() as u32
    }

    fn accumulator_cap(&self) -> f64 {
        self.step_ms
    }

    /// Feed real elapsed time; returns how many whole ticks are now due.
    ///
    /// Negative or non-finite deltas count as zero. The caller must report
    /// each executed tick through [`Scheduler::consume_tick`].
    pub fn accumulate(&mut self, elapsed_ms: f64) -> u32 {
        let delta = if elapsed_ms.is_finite() {
            elapsed_ms.clamp(0.0, self.max_delta_ms)
        } else {
            0.0
        };
        self.accumulator_ms += delta;
        self.due_ticks()
    }

    /// Number of whole ticks the accumulator currently covers
    pub fn due_ticks(&self) -> u32 {
        ((self.accumulator_ms + TIME_EPSILON_MS) / self.step_ms).floor() as u32
    }

    /// Remove one tick worth of time after it has been simulated
    pub fn consume_tick(&mut self) {
        self.accumulator_ms = (self.accumulator_ms - self.step_ms).max(0.0);
        if self.accumulator_ms < TIME_EPSILON_MS {
            self.accumulator_ms = 0.0;
        }
        self.ticks += 1;
    }

    /// Drop any buffered time (paused / game over time is never replayed)
    pub fn discard(&mut self) {
        self.accumulator_ms = 0.0;
    }
}

/// Millisecond countdown decremented once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining_ms: f64,
}

impl Countdown {
    pub fn new(ms: f64) -> Self {
        Self {
            remaining_ms: ms.max(0.0),
        }
    }

    #[inline]
    pub fn remaining_ms(&self) -> f64 {
        self.remaining_ms
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.remaining_ms > 0.0
    }

    pub fn set(&mut self, ms: f64) {
        self.remaining_ms = ms.max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining_ms = 0.0;
    }

    /// Count down by `dt_ms`; returns true on the tick it reaches zero
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        if self.remaining_ms <= 0.0 {
            return false;
        }
        self.remaining_ms -= dt_ms;
        if self.remaining_ms < TIME_EPSILON_MS {
            self.remaining_ms = 0.0;
            return true;
        }
        false
    }
}

/// Fires once every `interval_ms` of simulated time (grid steps, gravity)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    interval_ms: f64,
    elapsed_ms: f64,
}

impl Cadence {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(STEP_MS),
            elapsed_ms: 0.0,
        }
    }

    #[inline]
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Change the interval without losing progress toward the next step
    pub fn set_interval(&mut self, interval_ms: f64) {
        self.interval_ms = interval_ms.max(STEP_MS);
    }

    pub fn restart(&mut self) {
        self.elapsed_ms = 0.0;
    }

    /// Advance by one tick; returns how many steps fell due (usually 0 or 1)
    pub fn tick(&mut self, dt_ms: f64) -> u32 {
        self.elapsed_ms += dt_ms;
        let mut steps = 0;
        while self.elapsed_ms + TIME_EPSILON_MS >= self.interval_ms {
            self.elapsed_ms = (self.elapsed_ms - self.interval_ms).max(0.0);
            steps += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(scheduler: &mut Scheduler, elapsed: f64) -> u32 {
        let due = scheduler.accumulate(elapsed);
        for _ in 0..due {
            scheduler.consume_tick();
        }
        due
    }

    #[test]
    fn test_single_chunk_vs_many_chunks() {
        let mut one = Scheduler::default();
        assert_eq!(run(&mut one, 10.0 * STEP_MS), 10);

        let mut many = Scheduler::default();
        let total: u32 = (0..10).map(|_| run(&mut many, STEP_MS)).sum();
        assert_eq!(total, 10);
        assert_eq!(one.ticks(), many.ticks());
    }

    #[test]
    fn test_leftover_carries_over() {
        let mut s = Scheduler::default();
        assert_eq!(run(&mut s, STEP_MS * 0.6), 0);
        assert_eq!(run(&mut s, STEP_MS * 0.6), 1);
        assert!((s.accumulator_ms() - STEP_MS * 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_huge_delta_is_clamped() {
        let mut s = Scheduler::default();
        let ticks = run(&mut s, 60_000.0);
        assert_eq!(ticks, 30);
        assert!(ticks <= s.max_ticks_per_frame());
    }

    #[test]
    fn test_bad_deltas_are_ignored() {
        let mut s = Scheduler::default();
        assert_eq!(run(&mut s, -50.0), 0);
        assert_eq!(run(&mut s, f64::NAN), 0);
        assert_eq!(s.accumulator_ms(), 0.0);
    }

    #[test]
    fn test_invulnerability_window_expires_after_144_ticks() {
        let mut invuln = Countdown::new(1200.0);
        let mut previous = invuln.remaining_ms();
        for i in 0..144 {
            let expired = invuln.tick(STEP_MS);
            assert!(invuln.remaining_ms() < previous || invuln.remaining_ms() == 0.0);
            previous = invuln.remaining_ms();
            assert_eq!(expired, i == 143, "expired early at tick {i}");
        }
        assert_eq!(invuln.remaining_ms(), 0.0);
        assert!(!invuln.is_active());
    }

    #[test]
    fn test_cadence_steps() {
        let mut gravity = Cadence::new(1000.0);
        let steps: u32 = (0..120).map(|_| gravity.tick(STEP_MS)).sum();
        assert_eq!(steps, 1);
    }
}
