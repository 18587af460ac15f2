//! Discovery retry policy: double on failure, cap, reset on success

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use parking_lot::Mutex;
use std::time::Duration;

/// Deterministic exponential backoff for discovery attempts.
///
/// `current()` is the wait before the next attempt and is surfaced
/// through `status()` so operators can see how far the relay has backed
/// off.
pub struct RetryBackoff {
    inner: Mutex<ExponentialBackoff>,
    base: Duration,
}

impl RetryBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let inner = ExponentialBackoff {
            initial_interval: base,
            current_interval: base,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: max,
            max_elapsed_time: None,
            ..Default::default()
        };
        Self {
            inner: Mutex::new(inner),
            base,
        }
    }

    /// Wait before the next discovery attempt.
    pub fn current(&self) -> Duration {
        self.inner.lock().current_interval
    }

    /// Discovery succeeded: fall back to the base interval.
    pub fn on_success(&self) {
        self.inner.lock().reset();
    }

    /// Discovery failed: double toward the cap. Returns the new wait.
    pub fn on_failure(&self) -> Duration {
        let mut inner = self.inner.lock();
        let _ = inner.next_backoff();
        inner.current_interval
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}
