//! Retry policy for transport operations
//!
//! Transport failures are retried up to a fixed attempt ceiling with
//! exponential backoff and jitter. Not-found results are never retried, and
//! an exhausted ceiling surfaces as `TransportExhausted`.

use std::time::Duration;

use rand::Rng;

use crate::error::{JumpstartError, Result};

/// Backoff parameters shared by descriptor and artifact fetches.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (1-based), with up to 50% jitter.
    fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1 << (retry - 1).min(16));
        let capped = exp.min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.0..=0.5);
        capped.mul_f64(1.0 + jitter)
    }
}

/// Run `op` under the policy. Only `Transport` errors are retried; every
/// other error (including `Ok(None)` not-found results flowing through `T`)
/// returns immediately.
pub fn with_retries<T, F>(policy: &RetryPolicy, op: F) -> Result<T>
where
    F: Fn(u32) -> Result<T>,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(JumpstartError::Transport { url, reason }) => {
                if attempt >= policy.max_attempts {
                    return Err(JumpstartError::TransportExhausted {
                        url,
                        attempts: attempt,
                        reason,
                    });
                }
                std::thread::sleep(policy.delay_for(attempt));
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}
