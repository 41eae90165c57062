//! Bounded retry with cancellable backoff
//!
//! `with_retry` re-drives an async operation against a `RetryPolicy`:
//! linearly growing delays between attempts, a pluggable retryability
//! predicate, and a `CancelToken` that can abort a backoff wait from
//! outside. In-flight operations are cancelled cooperatively by dropping
//! the caller's future.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Predicate deciding whether a failure is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&PipelineError) -> bool + Send + Sync>;

/// Retry configuration. A value, not a behavior: pass it to `with_retry`.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before attempt n+1 is `base_delay * n`
    pub base_delay: Duration,

    /// Which failures to retry; defaults to `PipelineError::is_transient`
    pub is_retryable: RetryPredicate,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            is_retryable: Arc::new(PipelineError::is_transient),
        }
    }

    /// Replace the retryability predicate.
    pub fn with_retryable(
        mut self,
        predicate: impl Fn(&PipelineError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_retryable = Arc::new(predicate);
        self
    }

    /// Policy that never retries; used where a single attempt is mandatory.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Backoff before the attempt after `completed_attempts`. Monotonically
    /// increasing in the attempt number.
    pub fn delay_for(&self, completed_attempts: u32) -> Duration {
        self.base_delay * completed_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

/// Hands out `CancelToken`s and fires them all at once.
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Signal every outstanding token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation signal for retry waits.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never fire, for call sites without a canceller.
    pub fn disarmed() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the source cancels; pends forever on a disarmed token.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Source dropped without cancelling; nothing can fire now.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Drive `operation` until it succeeds, exhausts the policy, fails
/// non-retryably, or the token cancels a backoff wait.
///
/// Cancellation mid-wait returns the most recent attempt's error; an error
/// always exists at that point.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts || !(policy.is_retryable)(&err) {
                    if attempt > 1 {
                        warn!(attempts = attempt, error = %err, "retries exhausted");
                    }
                    return Err(err);
                }
                if cancel.is_cancelled() {
                    debug!(attempt, error = %err, "retry cancelled before backoff");
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after backoff");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        debug!(attempt, "retry cancelled during backoff");
                        return Err(err);
                    }
                }
                attempt += 1;
            }
        }
    }
}
