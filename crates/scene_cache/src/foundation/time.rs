//! Time management utilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared frame counter.
///
/// Cloning yields a handle to the same counter, so the scene manager, the
/// readiness gate and the driver all observe one tick value. Only the driver
/// advances it, once per frame.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    tick: Arc<AtomicU64>,
}

impl TickClock {
    /// Create a clock at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick
    pub fn current(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Advance by one tick and return the new value
    pub fn advance(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Ticks elapsed since `since`, zero if `since` lies in the future
    pub fn elapsed_since(&self, since: u64) -> u64 {
        self.current().saturating_sub(since)
    }
}

/// Simple stopwatch for measuring elapsed time
#[derive(Debug)]
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub const fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.start_time.map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_shared_between_clones() {
        let clock = TickClock::new();
        let view = clock.clone();

        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(view.current(), 2);
        assert_eq!(view.elapsed_since(1), 1);
        assert_eq!(view.elapsed_since(10), 0);
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut stopwatch = Stopwatch::start_new();
        std::thread::sleep(Duration::from_millis(2));
        stopwatch.stop();
        let first = stopwatch.elapsed();
        assert!(first >= Duration::from_millis(2));
        assert_eq!(stopwatch.elapsed(), first);
    }
}
