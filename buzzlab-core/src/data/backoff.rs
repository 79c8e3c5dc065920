//! Retry policy, backoff timer and the sleep seam.
//!
//! The backoff timer is a plain value. Each chunk's retry loop owns its own
//! timers, so one chunk's elevated backoff never leaks into the next.

use std::sync::Mutex;
use std::time::Duration;

/// Retry/pacing parameters for batch calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; at most `max_retries + 1` calls per chunk.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Fixed delay after every successful call.
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            pacing: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    /// Fresh timer starting at `initial_backoff`.
    pub fn timer(&self) -> BackoffTimer {
        BackoffTimer::new(self.initial_backoff, self.max_backoff)
    }
}

/// Doubling delay with an upper cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffTimer {
    current: Duration,
    cap: Duration,
}

impl BackoffTimer {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            current: initial.min(cap),
            cap,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Double the delay, saturating at the cap.
    pub fn advance(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.cap);
    }
}

/// Blocking wait. Swapped for a recorder in tests and dry runs.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// All waits requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Total requested wait time.
    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}
