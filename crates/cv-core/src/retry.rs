//! Bounded exponential backoff around a single fallible async operation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Classify;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self::new(0, DEFAULT_BASE_DELAY)
    }

    /// `base_delay * multiplier^attempt`, attempt counted from zero.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.mul_f64(self.multiplier.powi(attempt as i32))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

struct RetryState {
    attempt: u32,
    remaining: u32,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            remaining: policy.max_retries,
        }
    }

    fn advance(&mut self) {
        self.attempt += 1;
        self.remaining -= 1;
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or the retry
/// budget runs out. The error of the last attempt is returned untouched.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let mut state = RetryState::new(policy);

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let kind = err.kind();
        if !kind.is_retryable() {
            debug!(attempt = state.attempt, %kind, "not retrying: {err}");
            return Err(err);
        }
        if state.remaining == 0 {
            debug!(attempts = state.attempt + 1, %kind, "retry budget exhausted: {err}");
            return Err(err);
        }

        let delay = policy.delay_for(state.attempt);
        warn!(
            attempt = state.attempt + 1,
            remaining = state.remaining,
            %kind,
            delay_ms = delay.as_millis() as u64,
            "transient failure, backing off: {err}"
        );

        tokio::time::sleep(delay).await;
        state.advance();
    }
}
