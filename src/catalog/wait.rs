//! Condition polling with exponential backoff and a bounded timeout.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Backoff schedule for [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// First wait between two checks
    pub initial: Duration,
    /// Upper bound for a single wait
    pub max: Duration,
    /// Overall deadline measured from the first check
    pub timeout: Duration,
    /// Random jitter added to each wait (0 to this value)
    pub jitter: Duration,
}

impl Backoff {
    /// Creates a schedule without jitter.
    pub fn new(initial: Duration, max: Duration, timeout: Duration) -> Self {
        Self { initial, max, timeout, jitter: Duration::ZERO }
    }

    /// Adds random jitter to every wait.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the wait that follows `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.jitter.is_zero() {
            return interval;
        }

        let extra = rand::random::<u64>() % (self.jitter.as_millis() as u64 + 1);
        interval + Duration::from_millis(extra)
    }
}

/// Result of a [`poll_until`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// The condition produced a value.
    Ready(T),
    /// The deadline passed first.
    TimedOut,
}

/// Repeatedly evaluates `check` until it yields `Some`, sleeping with
/// exponential backoff in between.
///
/// The condition is always evaluated at least once and once more at the
/// deadline, so a condition that becomes true during the last sleep is
/// not reported as a timeout. Errors from `check` end polling at once.
pub async fn poll_until<T, F, Fut>(backoff: Backoff, mut check: F) -> Result<Poll<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + backoff.timeout;
    let mut interval = backoff.initial;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if let Some(value) = check().await? {
            trace!("Condition met after {} checks", attempt);
            return Ok(Poll::Ready(value));
        }

        let now = Instant::now();
        if now >= deadline {
            trace!("Condition not met after {} checks", attempt);
            return Ok(Poll::TimedOut);
        }

        let wait = backoff.jittered(interval).min(deadline - now);
        tokio::time::sleep(wait).await;
        interval = backoff.next_interval(interval);
    }
}
