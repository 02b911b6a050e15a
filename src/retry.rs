//! Pacing for the click loop.

use std::time::{Duration, Instant};

/// A source of elapsed time that can also block.
///
/// The click loop only talks to time through this trait, so tests can run
/// it against a fake clock without sleeping.
pub trait Clock {
    /// Time since the clock was created.
    fn elapsed(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// The wall clock.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How the click loop paces itself and when it gives up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Time between button down and button up
    pub press_hold: Duration,
    /// Time after a click for the UI to settle before the next check
    pub interval: Duration,
    /// Give up after this many clicks, `None` retries forever
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed, `None` retries forever
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            press_hold: Duration::from_millis(100),
            interval: Duration::from_millis(3500),
            max_attempts: None,
            timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the loop must stop after `attempts` clicks and `elapsed` time.
    pub fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.timeout.is_some_and(|timeout| elapsed >= timeout)
    }
}
