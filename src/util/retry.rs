//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::ConfabError;

/// Retry policy for non-streamed capability calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or attempts run out.
    ///
    /// A rate-limit error carrying a retry-after hint waits for the hint
    /// (capped at `max_backoff`) instead of the computed backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ConfabError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ConfabError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= attempts {
                return Err(err);
            }

            let delay = match &err {
                ConfabError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(*ms).min(self.max_backoff),
                _ => jittered(backoff),
            };
            tracing::warn!(
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying capability call"
            );
            tokio::time::sleep(delay).await;

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
        }
    }
}

/// 75%-125% of `backoff`, seeded from a random v4 uuid.
fn jittered(backoff: Duration) -> Duration {
    let seed = uuid::Uuid::new_v4().as_u128();
    let factor = 0.75 + ((seed % 10_000) as f64 / 10_000.0) * 0.5;
    Duration::from_secs_f64(backoff.as_secs_f64() * factor)
}
