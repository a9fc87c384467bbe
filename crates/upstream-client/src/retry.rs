//! Bounded retry with backoff.
//!
//! `RetryPolicy::decide` is a pure function of the fault kind and the number
//! of attempts made so far. `with_retry` is the loop that drives an upstream
//! call with it: permanent faults return at once, transient faults are
//! re-issued after a timer-based delay until the bound is reached, and the
//! last observed error is what the caller gets back.
//!
//! ## Example Usage
//!
//! ```ignore
//! let policy = RetryPolicy::default()
//!     .with_base_delay(Duration::from_millis(200))
//!     .with_backoff(Backoff::exponential(2.0, Duration::from_secs(5)));
//!
//! let info = with_retry(&policy, "movie-info", || client.fetch_once(id)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{FaultKind, UpstreamError};

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// `base * multiplier^(retry - 1)`, capped at `max_delay`
    Exponential { multiplier: f64, max_delay: Duration },
}

impl Backoff {
    pub fn exponential(multiplier: f64, max_delay: Duration) -> Self {
        Backoff::Exponential {
            multiplier,
            max_delay,
        }
    }
}

/// Why a failed call is not retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The fault is permanent (client-side)
    Permanent,
    /// The fault is transient but the retry budget is spent
    Exhausted,
}

/// Outcome of `RetryPolicy::decide`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry(Duration),
    Stop(StopReason),
}

impl Decision {
    pub fn should_retry(&self) -> bool {
        matches!(self, Decision::Retry(_))
    }
}

/// Configuration for upstream retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total tries is `max_retries + 1`
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
    /// Add up to 10% random delay to each wait
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff: Backoff::Fixed,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed
    /// with a fault of kind `kind`.
    pub fn decide(&self, kind: FaultKind, attempt: u32) -> Decision {
        if !kind.is_retryable() {
            return Decision::Stop(StopReason::Permanent);
        }
        if attempt > self.max_retries {
            return Decision::Stop(StopReason::Exhausted);
        }
        Decision::Retry(self.delay_for(attempt))
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let scaled = self.base_delay.as_secs_f64() * multiplier.powi(exponent);
                if scaled.is_finite() && scaled < max_delay.as_secs_f64() {
                    Duration::from_secs_f64(scaled.max(0.0))
                } else {
                    max_delay
                }
            }
        };

        if self.jitter {
            let jitter = delay.as_secs_f64() * 0.1 * rand::random::<f64>();
            delay + Duration::from_secs_f64(jitter)
        } else {
            delay
        }
    }
}

/// Attempt counter and delay schedule of one logical call
#[derive(Debug, Default, Clone)]
pub struct RetryState {
    attempts: u32,
    delays: Vec<Duration>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new attempt and return its 1-based number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn record_delay(&mut self, delay: Duration) {
        self.delays.push(delay);
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Run `call` until it succeeds, fails permanently, or the policy gives up.
///
/// On exhaustion the error of the last attempt is returned unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut state = RetryState::new();

    loop {
        let attempt = state.begin_attempt();
        let error = match call().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "succeeded after retrying");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        match policy.decide(error.kind(), attempt) {
            Decision::Retry(delay) => {
                warn!(
                    operation,
                    attempt,
                    kind = ?error.kind(),
                    %error,
                    ?delay,
                    "upstream call failed, retrying"
                );
                state.record_delay(delay);
                sleep(delay).await;
            }
            Decision::Stop(StopReason::Exhausted) => {
                warn!(
                    operation,
                    attempts = attempt,
                    waited = ?state.total_delay(),
                    %error,
                    "upstream call failed, retries exhausted"
                );
                return Err(error);
            }
            Decision::Stop(StopReason::Permanent) => {
                debug!(operation, kind = ?error.kind(), %error, "upstream call failed permanently");
                return Err(error);
            }
        }
    }
}
