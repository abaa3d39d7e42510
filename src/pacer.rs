//! The frame pacer: fixed-step scheduling of ticks against wall-clock time.
//!
//! The outer loop runs as fast as the platform drives it (an animation
//! frame, a winit redraw, a plain loop); the pacer converts elapsed wall
//! time into a whole number of `tick()` calls owed at `target_fps`. Time is
//! read through the [`Clock`] seam so tests can inject a virtual clock and
//! replay pacing scenarios deterministically.

use std::time::Duration;

use parking_lot::Mutex;
use std::sync::Arc;

use web_time::Instant;

/// The most wall-clock time the pacer will accumulate.
///
/// After a long pause (backgrounded tab, debugger halt) the accumulator
/// would otherwise owe hundreds of ticks and death-spiral trying to catch
/// up; anything beyond this is dropped instead.
pub const MAX_ACCUMULATED: Duration = Duration::from_millis(100);

/// A monotonic time source.
pub trait Clock {
    /// Nanosecond-precision monotonic time since an arbitrary fixed epoch.
    fn now(&self) -> Duration;
}

/// The real monotonic clock, `web_time`-backed so the same code paces
/// native and wasm builds.
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Creates a clock with its epoch at the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A hand-driven clock for tests. Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Fixed-step accumulator driving [`tick`](crate::RollbackScheduler::tick)
/// at a nominal rate.
///
/// Each call to [`owed_ticks`](Self::owed_ticks) measures the wall-clock
/// delta since the previous call, adds it to the accumulator (capped at
/// [`MAX_ACCUMULATED`]) and returns how many whole frame periods fit.
/// Call `render()` exactly once per outer iteration, regardless of the
/// returned count, to avoid flicker.
#[derive(Debug)]
pub struct FramePacer<C>
where
    C: Clock,
{
    clock: C,
    frame_period: Duration,
    accumulator: Duration,
    last: Option<Duration>,
}

impl<C: Clock> FramePacer<C> {
    /// Creates a pacer stepping at `frame_period` intervals.
    #[must_use]
    pub fn new(frame_period: Duration, clock: C) -> Self {
        Self {
            clock,
            frame_period,
            accumulator: Duration::ZERO,
            last: None,
        }
    }

    /// Returns how many ticks the scheduler owes for the time elapsed since
    /// the last call. The first call returns zero and only anchors the
    /// clock.
    pub fn owed_ticks(&mut self) -> u32 {
        let now = self.clock.now();
        let delta = match self.last {
            Some(last) => now.saturating_sub(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.accumulator = (self.accumulator + delta).min(MAX_ACCUMULATED);

        let mut owed = 0;
        while self.accumulator >= self.frame_period {
            self.accumulator -= self.frame_period;
            owed += 1;
        }
        owed
    }

    /// Drops any accumulated time, e.g. after a stall resolved and the
    /// caller chose not to fast-forward.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.last = None;
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
mod pacer_tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(10);

    fn pacer() -> (FramePacer<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (FramePacer::new(PERIOD, clock.clone()), clock)
    }

    #[test]
    fn first_call_anchors_without_ticks() {
        let (mut pacer, _clock) = pacer();
        assert_eq!(pacer.owed_ticks(), 0);
    }

    #[test]
    fn whole_periods_become_ticks() {
        let (mut pacer, clock) = pacer();
        pacer.owed_ticks();
        clock.advance(Duration::from_millis(35));
        assert_eq!(pacer.owed_ticks(), 3);
        // The 5 ms remainder carries over.
        clock.advance(Duration::from_millis(5));
        assert_eq!(pacer.owed_ticks(), 1);
    }

    #[test]
    fn sub_period_deltas_accumulate() {
        let (mut pacer, clock) = pacer();
        pacer.owed_ticks();
        let mut total = 0;
        for _ in 0..5 {
            clock.advance(Duration::from_millis(4));
            total += pacer.owed_ticks();
        }
        // 20 ms total across five 4 ms deltas owes exactly two ticks.
        assert_eq!(total, 2);
    }

    #[test]
    fn long_pause_is_capped() {
        let (mut pacer, clock) = pacer();
        pacer.owed_ticks();
        clock.advance(Duration::from_secs(30));
        // 100 ms cap at a 10 ms period: at most 10 ticks, not 3000.
        assert_eq!(pacer.owed_ticks(), 10);
        assert_eq!(pacer.owed_ticks(), 0);
    }

    #[test]
    fn reset_discards_backlog() {
        let (mut pacer, clock) = pacer();
        pacer.owed_ticks();
        clock.advance(Duration::from_millis(50));
        pacer.reset();
        assert_eq!(pacer.owed_ticks(), 0);
    }
}
