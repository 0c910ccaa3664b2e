//! Retry policy for transient failures
//!
//! The policy is a fixed, attempt-indexed delay table rather than a computed
//! backoff curve: the schedule is short, bounded, and identical for every
//! logical call. Attempt counters live on the calling task; nothing is
//! shared across calls, and the backoff sleep never blocks other callers.

use std::time::Duration;

use crate::error::ApiError;

/// Decides whether, and after how long, a failed attempt is replayed
///
/// Retryable conditions are transport failures without a response and
/// HTTP >= 500. 401 is excluded here because it belongs to the
/// refresh-and-replay path; all other 4xx are terminal on first sight.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay_schedule: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
        }
    }
}

impl RetryPolicy {
    /// Create a policy with an explicit retry budget and delay table.
    #[must_use]
    pub fn new(max_retries: u32, delay_schedule: Vec<Duration>) -> Self {
        Self { max_retries, delay_schedule }
    }

    /// Policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self { max_retries: 0, delay_schedule: Vec::new() }
    }

    /// Whether the failed attempt `attempt` (0-based) should be replayed.
    ///
    /// Attempts beyond `max_retries` or past the end of the delay table are
    /// not retried; the caller returns the last observed error.
    #[must_use]
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        error.is_retryable()
            && attempt < self.max_retries
            && (attempt as usize) < self.delay_schedule.len()
    }

    /// Delay to wait before replaying attempt `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        self.delay_schedule.get(attempt as usize).copied()
    }

    /// Configured retry budget.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
