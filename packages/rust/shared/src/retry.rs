//! Bounded, fixed-interval retry policy shared by every eventually-consistent
//! call site (table readiness, bot updates, alias binding, teardown).

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{OctochatError, Result};

/// What to do with an error returned by a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Sleep for the interval and try again.
    Retry,
    /// Give up immediately and propagate the error.
    Fatal,
    /// Stop and report success (e.g. "already deleted").
    Succeed,
}

/// Maps an error to a [`Verdict`].
pub type Classifier = fn(&OctochatError) -> Verdict;

/// Default classifier: permanent errors are fatal, everything else retries.
pub fn transient(err: &OctochatError) -> Verdict {
    if err.is_permanent() {
        Verdict::Fatal
    } else {
        Verdict::Retry
    }
}

/// Teardown classifier: a missing resource is already gone.
pub fn not_found_is_success(err: &OctochatError) -> Verdict {
    if err.is_not_found() {
        Verdict::Succeed
    } else {
        transient(err)
    }
}

/// `{max_attempts, interval, classify}`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on calls made (a value of 0 is treated as 1 by [`run`](Self::run)).
    pub max_attempts: u32,
    /// Fixed sleep between attempts.
    pub interval: Duration,
    classify: Classifier,
}

impl RetryPolicy {
    /// A fixed-interval policy using the [`transient`] classifier.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            classify: transient,
        }
    }

    /// Replace the error classifier.
    pub fn classify_with(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    /// Treat "not found" as success.
    pub fn absorbing_not_found(self) -> Self {
        self.classify_with(not_found_is_success)
    }

    /// Same policy with a different attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Classify an error under this policy.
    pub fn classify(&self, err: &OctochatError) -> Verdict {
        (self.classify)(err)
    }

    /// Run `op` until it succeeds, is classified fatal or succeed, or the
    /// attempt budget runs out.
    ///
    /// Returns `Ok(Some(value))` on success and `Ok(None)` when an error was
    /// classified [`Verdict::Succeed`]. Exhaustion yields
    /// [`OctochatError::RetryExhausted`] wrapping the last error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<Option<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let budget = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op(attempt).await {
                Ok(value) => return Ok(Some(value)),
                Err(err) => err,
            };

            match self.classify(&err) {
                Verdict::Succeed => {
                    debug!(operation, attempt, error = %err, "treating error as success");
                    return Ok(None);
                }
                Verdict::Fatal => return Err(err),
                Verdict::Retry if attempt >= budget => {
                    warn!(operation, attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(OctochatError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Verdict::Retry => {
                    warn!(operation, attempt, max_attempts = budget, error = %err, "attempt failed, retrying");
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }

    /// Poll `check` until it reports `true` or `max_attempts` polls were made.
    ///
    /// No sleep follows the final poll.
    pub async fn poll<F, Fut>(&self, operation: &str, mut check: F) -> bool
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = bool>,
    {
        for attempt in 1..=self.max_attempts {
            if check(attempt).await {
                debug!(operation, attempt, "condition met");
                return true;
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        warn!(operation, attempts = self.max_attempts, "condition not met");
        false
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = instant(5)
            .run("flaky", |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 3 {
                        Err(OctochatError::Network("timeout".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, Some(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhaustion_wraps_last_error() {
        let calls = Cell::new(0);
        let err = instant(4)
            .run("always_down", |_| {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(OctochatError::Network("down".into())) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.get(), 4);
        match err {
            OctochatError::RetryExhausted {
                operation,
                attempts,
                last,
            } => {
                assert_eq!(operation, "always_down");
                assert_eq!(attempts, 4);
                assert!(matches!(*last, OctochatError::Network(_)));
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fatal_errors_stop_immediately() {
        let calls = Cell::new(0);
        let err = instant(10)
            .run("bad_input", |_| {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(OctochatError::validation("too many items")) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert!(matches!(err, OctochatError::Validation { .. }));
    }

    #[tokio::test]
    async fn not_found_absorbed_as_success() {
        let calls = Cell::new(0);
        let result = instant(10)
            .absorbing_not_found()
            .run("delete_bot", |_| {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(OctochatError::NotFound("bot".into())) }
            })
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn poll_counts_checks() {
        let statuses = [false, false, true];
        let calls = Cell::new(0);
        let ready = instant(10)
            .poll("table_ready", |attempt| {
                calls.set(calls.get() + 1);
                let value = statuses[(attempt - 1) as usize];
                async move { value }
            })
            .await;
        assert!(ready);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn poll_gives_up_after_budget() {
        let calls = Cell::new(0);
        let ready = instant(4)
            .poll("never", |_| {
                calls.set(calls.get() + 1);
                async { false }
            })
            .await;
        assert!(!ready);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn default_classifier() {
        let policy = instant(1);
        assert_eq!(
            policy.classify(&OctochatError::NotFound("alias".into())),
            Verdict::Retry
        );
        assert_eq!(
            policy.classify(&OctochatError::parse("bad")),
            Verdict::Fatal
        );
        assert_eq!(
            policy
                .absorbing_not_found()
                .classify(&OctochatError::NotFound("alias".into())),
            Verdict::Succeed
        );
    }
}
