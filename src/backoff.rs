//! Retry budget and backoff curve.

use std::time::Duration;

/// Decides how long a failed job waits before its next attempt, and when to
/// give up entirely.
///
/// Policies are pure and stateless; the worker loop consults one on every
/// failure, so an alternate curve (linear, jittered, capped) can be swapped
/// in without touching the loop itself.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next attempt of a job that has already been retried
    /// `retry_count` times.
    fn backoff(&self, retry_count: u32) -> Duration;

    /// Number of retries after which the next failure is permanent.
    fn max_retries(&self) -> u32;
}

/// Exponential backoff: `base * 2^retry_count`.
///
/// With the default one-second base, a job waits 1s, 2s and 4s ahead of its
/// second, third and fourth attempt. The fourth failure is permanent.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Retry budget; a job is attempted at most `max_retries + 1` times.
    pub max_retries: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_retries: 3,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn backoff(&self, retry_count: u32) -> Duration {
        // exponent clamp keeps the shift from overflowing on absurd counts
        self.base * 2u32.pow(retry_count.min(20))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
