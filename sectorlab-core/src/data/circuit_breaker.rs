//! Shared breaker that suspends feed access after a ban or repeated failures.
//!
//! Every worker of a run holds the same breaker. HTTP 403 opens it at once;
//! `threshold` consecutive failures open it too. While open, requests are
//! refused until `cooldown` has elapsed, after which it closes again.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Failures in a row that open the breaker.
const DEFAULT_THRESHOLD: u32 = 3;
/// How long an open breaker refuses requests.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    cooldown: Duration,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self::with_threshold(cooldown, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(cooldown: Duration, threshold: u32) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            cooldown,
            threshold: threshold.max(1),
        }
    }

    /// Breaker used for the Yahoo feed: 30 minute cooldown, opens on the third failure.
    pub fn default_provider() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }

    fn opened_at(&self) -> MutexGuard<'_, Option<Instant>> {
        self.opened_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True when a request may be sent. Closes an open breaker whose cooldown has passed.
    pub fn is_allowed(&self) -> bool {
        let mut opened_at = self.opened_at();
        match *opened_at {
            Some(since) if since.elapsed() < self.cooldown => false,
            Some(_) => {
                *opened_at = None;
                self.consecutive_failures.store(0, Ordering::SeqCst);
                true
            }
            None => true,
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.threshold {
            self.trip();
        }
    }

    /// Open immediately.
    pub fn trip(&self) {
        self.opened_at().get_or_insert_with(Instant::now);
    }

    /// Time until an open breaker closes; zero when closed.
    pub fn remaining_cooldown(&self) -> Duration {
        let opened_at = *self.opened_at();
        opened_at.map_or(Duration::ZERO, |since| {
            self.cooldown.saturating_sub(since.elapsed())
        })
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::default_provider()
    }
}
