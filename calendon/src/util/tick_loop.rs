//! Utilities for timer driven loops.
//!
//! A tick loop repeatedly "ticks" game logic forward by the time elapsed since the previous tick.
//! [TickClock] decides when enough time has passed for a tick to happen, and [TickLimit] counts
//! completed ticks so a run can be bounded.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::log::TARGET_MAIN;

/// Shortest tick that will be generated by default.
pub const DEFAULT_MIN_TICK: Duration = Duration::from_millis(8);

/// Longest tick that will be generated by default.
pub const DEFAULT_MAX_TICK: Duration = Duration::from_secs(5);

/// Generates tick durations from elapsed time.
///
/// Ticks shorter than the minimum tick aren't generated, as they would do needless work and can
/// cause precision problems; the elapsed time carries over to the next attempt instead. Ticks longer
/// than the maximum tick, such as after resuming from a debugger, are dropped entirely.
///
/// ```
/// use std::time::{Duration, Instant};
/// use calendon::util::tick_loop::TickClock;
///
/// let start = Instant::now();
/// let mut clock = TickClock::new(start);
/// assert_eq!(clock.generate(start + Duration::from_millis(2)), None);
/// assert_eq!(clock.generate(start + Duration::from_millis(16)), Some(Duration::from_millis(16)));
/// ```
#[derive(Debug, Clone)]
pub struct TickClock {
    min_tick: Duration,
    max_tick: Duration,
    last_tick: Instant,
}

impl TickClock {
    /// Create a clock using the default tick bounds, counting from `start`.
    #[inline]
    pub fn new(start: Instant) -> Self {
        Self::with_bounds(start, DEFAULT_MIN_TICK, DEFAULT_MAX_TICK)
    }

    pub fn with_bounds(start: Instant, min_tick: Duration, max_tick: Duration) -> Self {
        debug_assert!(min_tick <= max_tick, "min tick {min_tick:?} is longer than max tick {max_tick:?}");
        Self {
            min_tick,
            max_tick,
            last_tick: start,
        }
    }

    #[inline]
    pub fn min_tick(&self) -> Duration { self.min_tick }

    #[inline]
    pub fn max_tick(&self) -> Duration { self.max_tick }

    /// Time of the last generated (or dropped) tick.
    #[inline]
    pub fn last_tick(&self) -> Instant { self.last_tick }

    /// Try to generate a tick at `now`.
    ///
    /// Yields the time since the last tick, or `None` if no tick should happen.
    pub fn generate(&mut self, now: Instant) -> Option<Duration> {
        let dt = now.saturating_duration_since(self.last_tick);
        if dt < self.min_tick {
            return None
        }

        self.last_tick = now;
        if dt > self.max_tick {
            trace!(target: TARGET_MAIN, ?dt, "Skipping large tick");
            return None
        }
        Some(dt)
    }
}

/// Counter of completed ticks against an optional limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickLimit {
    limit: u64,
    completed: u64,
}

impl TickLimit {
    /// Limit a run to `limit` ticks, where 0 means no limit.
    #[inline]
    pub fn new(limit: u64) -> Self {
        Self { limit, completed: 0 }
    }

    #[inline]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    #[inline]
    pub fn limit(&self) -> Option<u64> {
        (self.limit != 0).then_some(self.limit)
    }

    #[inline]
    pub fn completed(&self) -> u64 { self.completed }

    #[inline]
    pub fn tick_completed(&mut self) {
        self.completed += 1;
    }

    #[inline]
    pub fn is_reached(&self) -> bool {
        self.limit != 0 && self.completed >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use test_log::test as test_log;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test_log]
    fn test_short_ticks_accumulate() {
        let start = Instant::now();
        let mut clock = TickClock::new(start);
        assert_eq!(clock.generate(start), None);
        assert_eq!(clock.generate(start + ms(5)), None);
        assert_eq!(clock.generate(start + ms(9)), Some(ms(9)));
        assert_eq!(clock.last_tick(), start + ms(9));
        assert_eq!(clock.generate(start + ms(17)), Some(ms(8)));
    }

    #[test_log]
    fn test_large_tick_is_dropped() {
        let start = Instant::now();
        let mut clock = TickClock::new(start);
        assert_eq!(clock.generate(start + ms(5001)), None);
        // The dropped tick still moves the clock forward.
        assert_eq!(clock.generate(start + ms(5021)), Some(ms(20)));
        assert_eq!(clock.generate(start + ms(10021)), Some(ms(5000)));
    }

    #[test_log]
    fn test_time_going_backwards() {
        let start = Instant::now() + ms(100);
        let mut clock = TickClock::with_bounds(start, Duration::ZERO, ms(50));
        assert_eq!(clock.generate(start - ms(10)), Some(Duration::ZERO));
    }

    #[rstest]
    #[case::unlimited(0, 1000, false)]
    #[case::under(3, 2, false)]
    #[case::reached(3, 3, true)]
    #[case::over(3, 4, true)]
    #[case::one(1, 1, true)]
    fn test_tick_limit(#[case] limit: u64, #[case] ticks: u64, #[case] expected: bool) {
        let mut tick_limit = TickLimit::new(limit);
        for _ in 0..ticks {
            tick_limit.tick_completed();
        }
        assert_eq!(tick_limit.completed(), ticks);
        assert_eq!(tick_limit.is_reached(), expected);
    }

    #[test]
    fn test_limit_accessor() {
        assert_eq!(TickLimit::unlimited().limit(), None);
        assert_eq!(TickLimit::new(60).limit(), Some(60));
        assert!(!TickLimit::unlimited().is_reached());
    }
}
