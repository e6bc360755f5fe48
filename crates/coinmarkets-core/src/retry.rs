//! Retry with backoff for adapter transport calls.
//!
//! Retries happen inside one `fetch` call, so they all count against the
//! scheduler's per-adapter timeout.

use std::future::Future;
use std::time::Duration;

use crate::adapter::{FetchError, FetchErrorKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally with +/- 50% jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(250),
            factor: 2.0,
            max: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl Backoff {
    pub fn delay(self, attempt: u32) -> Duration {
        let nominal = self.nominal(attempt);
        match self {
            Self::Exponential { jitter: true, .. } => {
                let half = nominal.as_millis() as u64 / 2;
                let offset = fastrand::u64(0..=half * 2);
                Duration::from_millis((nominal.as_millis() as u64 - half).saturating_add(offset))
            }
            _ => nominal,
        }
    }

    /// Upper bound of [`delay`](Self::delay) for `attempt`, jitter included.
    pub fn max_delay(self, attempt: u32) -> Duration {
        let nominal = self.nominal(attempt);
        match self {
            Self::Exponential { jitter: true, .. } => {
                nominal + Duration::from_millis(nominal.as_millis() as u64 / 2)
            }
            _ => nominal,
        }
    }

    fn nominal(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base, factor, max, ..
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                Duration::from_secs_f64(seconds.max(0.0))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::Fixed {
                delay: Duration::ZERO,
            },
        }
    }

    /// Circuit-breaker rejections and cancellation are never retried.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        if attempt >= self.max_retries || !error.retryable() {
            return false;
        }
        !matches!(
            error.kind(),
            FetchErrorKind::Unavailable | FetchErrorKind::Cancelled
        )
    }

    /// Longest total sleep between attempts if every retry is used.
    pub fn max_total_delay(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.backoff.max_delay(attempt))
            .sum()
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Runs `operation` until it succeeds or the policy gives up.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
