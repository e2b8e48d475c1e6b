//! Retry policy for remote calls.
//!
//! Rate limiting is expected under load and is retried after a fixed
//! delay for as long as the caller's scope lives. Transport failures back
//! off exponentially and give up after a bounded number of attempts.
//! Rejections are returned to the caller immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::arbiter::ArbiterError;
use crate::cancel::CancelScope;
use crate::config::{BackoffConfig, RetryConfig};

/// An exponential backoff schedule: `initial * 2^n`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    /// Start a fresh schedule.
    pub const fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// The delay before the next attempt, or `None` once the attempt budget
    /// is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let factor = 1_u64.checked_shl(self.attempt).unwrap_or(u64::MAX);
        let ms = self
            .config
            .initial_ms
            .saturating_mul(factor)
            .min(self.config.max_ms);
        self.attempt = self.attempt.saturating_add(1);
        Some(Duration::from_millis(ms))
    }

    /// Number of delays handed out so far.
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Start over after a success.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Run `call` until it succeeds, retrying per `policy`.
///
/// Returns `Ok(None)` if `scope` is cancelled between attempts. A call in
/// flight is never abandoned; cancellation is only observed before a call
/// and while waiting to retry.
pub async fn call_with_retry<T, F, Fut>(
    scope: &CancelScope,
    policy: &RetryConfig,
    operation: &'static str,
    mut call: F,
) -> Result<Option<T>, ArbiterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ArbiterError>>,
{
    let mut backoff = Backoff::new(policy.backoff);
    loop {
        if scope.is_cancelled() {
            return Ok(None);
        }
        let delay = match call().await {
            Ok(value) => return Ok(Some(value)),
            Err(ArbiterError::RateLimited) => {
                debug!(operation, "rate limited, retrying");
                policy.rate_limit_delay()
            }
            Err(err @ (ArbiterError::Transport { .. } | ArbiterError::Decode { .. })) => {
                let Some(delay) = backoff.next_delay() else {
                    warn!(operation, error = %err, attempts = backoff.attempts(), "giving up");
                    return Err(err);
                };
                warn!(operation, error = %err, retry_in_ms = delay.as_millis(), "call failed");
                delay
            }
            Err(err) => return Err(err),
        };
        if !scope.sleep(delay).await {
            return Ok(None);
        }
    }
}
