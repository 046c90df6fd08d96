//! Wait Mechanisms
//!
//! Bounded polling for asynchronous page conditions: the thank-you redirect,
//! a completed network exchange, the success message. Every wait has an
//! explicit timeout and poll interval and surfaces `DemoflowError::Timeout`
//! naming the awaited condition; nothing sleeps for a fixed duration.

use crate::result::{DemoflowError, DemoflowResult};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for a single command (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value produced by the probe once the condition held
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
    /// Number of probes issued
    pub attempts: u32,
}

impl<T> WaitResult<T> {
    /// Discard the bookkeeping, keep the value
    pub fn into_value(self) -> T {
        self.value
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields `Some`, or fail with a timeout.
///
/// The probe runs at least once, even with a zero timeout. A
/// `DemoflowError::Script` from the probe is treated as transient (the
/// document may be mid-navigation) and polling continues; any other error
/// aborts the wait.
pub async fn poll_until<T, F, Fut>(
    condition: &str,
    options: WaitOptions,
    mut probe: F,
) -> DemoflowResult<WaitResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DemoflowResult<Option<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match probe().await {
            Ok(Some(value)) => {
                debug!(condition, attempts, elapsed_ms = start.elapsed().as_millis() as u64, "wait satisfied");
                return Ok(WaitResult {
                    value,
                    elapsed: start.elapsed(),
                    waited_for: condition.to_string(),
                    attempts,
                });
            }
            Ok(None) => {}
            Err(DemoflowError::Script { message }) => {
                trace!(condition, %message, "transient probe failure");
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(DemoflowError::timeout(condition, options.timeout_ms));
        }
        let remaining = timeout - elapsed;
        tokio::time::sleep(options.poll_interval().min(remaining)).await;
    }
}

/// Poll a boolean condition until it holds
pub async fn wait_until<F, Fut>(
    condition: &str,
    options: WaitOptions,
    mut check: F,
) -> DemoflowResult<WaitResult<()>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DemoflowResult<bool>>,
{
    poll_until(condition, options, || {
        let fut = check();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}
