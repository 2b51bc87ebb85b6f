//! Caller-side retry with exponential backoff and jitter.
//!
//! The gateway never retries on its own. [`RetryConfig::run`] re-issues an
//! operation while its failed response carries a code that is retryable for
//! that operation; network failures are only retried for reads because the
//! exchange may already have accepted a write.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::gateway::Operation;
use crate::{ErrorCode, GatewayError, Response};

/// Wait between re-issued gateway calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed { delay: Duration },
    /// `base * factor^attempt`, capped at `max`. With `jitter` the result
    /// is spread uniformly over half to one and a half times that value.
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
            max: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt.min(i32::MAX as u32) as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds.max(0.0));

                if !jitter {
                    return delay;
                }

                let delay_ms = delay.as_millis() as u64;
                let jitter_ms = delay_ms / 2;
                let offset = fastrand::u64(0..=(jitter_ms * 2));
                Duration::from_millis((delay_ms + offset).saturating_sub(jitter_ms))
            }
        }
    }
}

/// Retry settings for [`RetryConfig::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Re-issues after the first call; the call runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a failure with `code` may be re-issued for `operation`.
    pub fn should_retry(&self, operation: Operation, code: Option<ErrorCode>) -> bool {
        self.enabled && code.is_some_and(|code| code.is_retryable_for(operation))
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable code, or
    /// the retry budget is spent. Contract violations return immediately.
    pub async fn run<T, F, Fut>(
        &self,
        operation: Operation,
        mut attempt: F,
    ) -> Result<Response<T>, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Response<T>, GatewayError>>,
    {
        let mut retries = 0;
        loop {
            let response = attempt().await?;
            if response.is_success()
                || retries >= self.max_retries
                || !self.should_retry(operation, response.error_code())
            {
                return Ok(response);
            }

            let delay = self.backoff.delay(retries);
            debug!(
                operation = %operation,
                request_id = %response.base.request_id,
                retry = retries + 1,
                delay_ms = delay.as_millis() as u64,
                "retrying failed gateway call"
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }
}
