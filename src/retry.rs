// src/retry.rs
//! Bounded exponential-backoff retry around an async operation

use anyhow::Result;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry schedule for one submission: the initial try plus `max_retries`
/// retries, waiting `min(base_delay_ms * 2^n, max_delay_ms)` between
/// attempt n and n + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(63);
        let exponential = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(exponential.min(self.max_delay_ms))
    }

    /// Total invocations allowed: the initial try plus the retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Run `operation`, retrying every failure until the policy is exhausted.
/// The last attempt's error is returned to the caller, never swallowed.
pub async fn execute_with_retry<T, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    execute_with_retry_if(operation, policy, |_| true).await
}

/// Like [`execute_with_retry`] but with a retry predicate. An error the
/// predicate rejects is surfaced immediately without waiting out the
/// remaining attempts. The submission pipeline itself always retries;
/// the predicate exists for callers that know better.
pub async fn execute_with_retry_if<T, F, Fut, P>(
    mut operation: F,
    policy: &RetryPolicy,
    mut should_retry: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&anyhow::Error) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= policy.max_retries || !should_retry(&e) {
                    return Err(e);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
