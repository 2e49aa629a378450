//! Settle delays and condition polling
//!
//! UI transitions (dropdowns opening, modal fade-in, theme switches) finish
//! asynchronously. A [`Settle`] decides how the helpers wait for them: a
//! fixed pause, or polling a check until it reports the expected state.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Pause between interactions when settling on a fixed delay
pub const NOMINAL_SETTLE: Duration = Duration::from_millis(250);

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default polling timeout
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// How to wait for a UI transition to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Sleep for a fixed duration, then look once
    Fixed(Duration),
    /// Look repeatedly until the expected state appears or `timeout` passes
    Poll { timeout: Duration, interval: Duration },
}

impl Default for Settle {
    fn default() -> Self {
        Settle::Fixed(NOMINAL_SETTLE)
    }
}

impl Settle {
    /// Polling settle with the default timeout and interval
    pub fn poll() -> Self {
        Settle::Poll {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Unconditional pause, for transitions with nothing observable to poll
    pub async fn pause(&self) {
        match *self {
            Settle::Fixed(duration) => sleep(duration).await,
            Settle::Poll { interval, .. } => sleep(interval).await,
        }
    }

    /// Wait for `check` to yield a value.
    ///
    /// A fixed settle sleeps and then checks exactly once, returning whatever
    /// the check saw. A polling settle retries until the check yields
    /// `Some`, failing with [`E2eError::Timeout`] when time runs out.
    pub async fn wait_for<T, F, Fut>(&self, what: &str, check: F) -> E2eResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Option<T>>>,
    {
        match *self {
            Settle::Fixed(duration) => {
                let mut check = check;
                sleep(duration).await;
                check().await
            }
            Settle::Poll { timeout, interval } => {
                poll_until(what, timeout, interval, check).await.map(Some)
            }
        }
    }
}

/// Retry `check` every `interval` until it yields `Some` or `timeout` passes.
///
/// Transient errors (see [`E2eError::is_transient`]) count as "not yet";
/// any other error is returned immediately.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        attempts += 1;

        match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                debug!("Waiting for {} (attempt {}): {}", what, attempts, e);
            }
            Err(e) => return Err(e),
        }

        if start.elapsed() >= timeout {
            return Err(E2eError::Timeout(format!(
                "{} after {} attempts in {:?}",
                what, attempts, timeout
            )));
        }

        sleep(interval).await;
    }
}
