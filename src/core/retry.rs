//! core::retry
//!
//! Pure retry policy for transient failures.
//!
//! # Design
//!
//! Retry behavior is data: maximum attempts, a base backoff, and a cap.
//! The policy wraps an otherwise side-effect-free async operation plus a
//! retryable-error predicate, so retry behavior is unit-testable without
//! real subprocess execution or network calls.
//!
//! State-mutating operations must not be wrapped; only operations that
//! are safe to repeat (output capture, idempotent fetches) go through a
//! policy.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use bindery::core::retry::RetryPolicy;
//!
//! let policy = RetryPolicy::new(10)
//!     .with_initial_backoff(Duration::from_millis(250));
//! assert_eq!(policy.max_attempts, 10);
//! assert_eq!(policy.backoff_for(0), Duration::from_millis(250));
//! assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
//! ```

use std::future::Future;
use std::time::Duration;

/// A retry policy: attempt bound plus exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt bound and default backoff.
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
        }
    }

    /// A policy that never retries.
    pub const fn none() -> Self {
        Self::new(1)
    }

    /// Override the initial backoff.
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Override the backoff cap.
    pub const fn with_max_backoff(mut self, cap: Duration) -> Self {
        self.max_backoff = cap;
        self
    }

    /// The backoff to sleep after the given zero-based failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, the error is not retryable, or the
    /// attempt bound is exhausted.
    ///
    /// The final error is returned unchanged; intermediate failures are
    /// logged at debug level.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < attempts && retryable(&err) => {
                    let backoff = self.backoff_for(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10)
    }
}
