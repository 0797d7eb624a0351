//! Bounded exponential-backoff retries.
//!
//! Two layers share one attempt loop:
//!
//! - [`retry_with_backoff`] wraps a single HTTP request inside the page
//!   fetcher. The wait before the n-th retry is `base * 2^(n-1)`.
//! - [`RetryPolicy`] wraps a whole extraction. The wait after failed attempt
//!   `n` (numbered from 1) is `base * 2^n`, and an empty result counts as a
//!   failure.
//!
//! Both stop immediately on errors that [`ScraperError::is_retriable`]
//! rejects, and neither sleeps after the final attempt.

use std::future::Future;
use std::time::Duration;

use laxsched_core::{AppConfig, Game, RankingsPayload};

use crate::error::ScraperError;

/// Results that can be "successfully empty". An unpopulated result is
/// treated as [`ScraperError::ExtractionEmpty`] by [`RetryPolicy::run`].
pub trait Populated {
    fn is_populated(&self) -> bool;
}

impl Populated for Vec<Game> {
    fn is_populated(&self) -> bool {
        !self.is_empty()
    }
}

impl Populated for RankingsPayload {
    fn is_populated(&self) -> bool {
        self.is_complete()
    }
}

async fn attempt_loop<T, F, Fut, D>(
    max_attempts: u32,
    delay_after: D,
    label: &str,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
    D: Fn(u32) -> Duration,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retriable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = delay_after(attempt);
        tracing::warn!(
            label,
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient failure; retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn scaled(base_ms: u64, exponent: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << exponent.min(62)))
}

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times with a `base_ms * 2^(n-1)` wait before the n-th retry.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    base_ms: u64,
    label: &str,
    operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    attempt_loop(
        max_retries.saturating_add(1),
        |attempt| scaled(base_ms, attempt - 1),
        label,
        operation,
    )
    .await
}

/// Attempt budget for one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 700,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.scrape_max_attempts,
            base_delay_ms: config.scrape_backoff_base_ms,
        }
    }

    /// Wait applied after failed attempt `attempt` (numbered from 1).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        scaled(self.base_delay_ms, attempt)
    }

    /// Run an extraction until it yields a populated result or the attempt
    /// budget is spent. The last error is returned on exhaustion.
    ///
    /// # Errors
    ///
    /// Returns the first non-retriable error, or the last error once all
    /// attempts have failed. An unpopulated result surfaces as
    /// [`ScraperError::ExtractionEmpty`].
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ScraperError>
    where
        T: Populated,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        attempt_loop(
            self.max_attempts,
            |attempt| self.delay_after(attempt),
            label,
            || {
                let fut = operation();
                async move {
                    let value = fut.await?;
                    if value.is_populated() {
                        Ok(value)
                    } else {
                        Err(ScraperError::ExtractionEmpty {
                            context: label.to_owned(),
                        })
                    }
                }
            },
        )
        .await
    }
}
