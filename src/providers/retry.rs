//! Local retry loop for transient backend failures
//!
//! Only the service in the primary role retries. Overload backs off
//! exponentially (`unit * 2^n`), timeouts back off linearly (`unit * n`), where
//! `n` is the 1-based number of the attempt that just failed. Anything else is
//! returned on first occurrence.

use crate::providers::{ProviderError, ProviderKind, RetryClass};
use std::future::Future;
use std::time::Duration;

/// Attempt cap and backoff unit for one service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    unit: Duration,
}

impl RetryPolicy {
    /// Policy for a primary service: `max_attempts` total attempts (at least one)
    pub fn standard(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit,
        }
    }

    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            unit: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Delay before the next attempt, or `None` when the error must escalate
    pub fn delay_after(&self, class: RetryClass, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match class {
            RetryClass::Overload => Some(self.unit.saturating_mul(2u32.saturating_pow(attempt))),
            RetryClass::Timeout => Some(self.unit.saturating_mul(attempt)),
            RetryClass::Fatal => None,
        }
    }

    /// Run `op` until it succeeds or the policy gives up
    ///
    /// Every attempt is bounded by `timeout`; an elapsed attempt counts as a
    /// [`ProviderError::Timeout`]. Backoff is a `tokio::time::sleep`, so waiting
    /// only suspends the calling task. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        provider: ProviderKind,
        timeout: Duration,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(timeout, op(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout {
                    provider,
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            provider = %provider,
                            attempt = attempt,
                            "Backend call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let class = err.retry_class();
            match self.delay_after(class, attempt) {
                Some(delay) => {
                    tracing::warn!(
                        provider = %provider,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        retry_class = ?class,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient backend error, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    if class == RetryClass::Fatal {
                        tracing::error!(
                            provider = %provider,
                            attempt = attempt,
                            error = %err,
                            "Backend error is not retryable"
                        );
                    } else {
                        tracing::error!(
                            provider = %provider,
                            attempt = attempt,
                            max_attempts = self.max_attempts,
                            retry_class = ?class,
                            error = %err,
                            "Backend still failing after all retries"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
