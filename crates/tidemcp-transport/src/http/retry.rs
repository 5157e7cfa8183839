//! Reconnection backoff policy shared by the HTTP streaming transport and
//! (via `tidemcp-client::reconnection`) the resilient client wrapper.

use std::time::Duration;

/// How long to wait before the `attempt`-th retry (zero-indexed).
#[derive(Debug, Clone)]
pub enum RetryPolicy {
    /// Always wait the same duration.
    Fixed { delay: Duration },
    /// `base * 2^attempt`, capped at `max_delay`.
    Exponential { base: Duration, max_delay: Duration },
    /// Never retry; the first failure is terminal.
    Never,
}

impl RetryPolicy {
    pub fn exponential_default() -> Self {
        RetryPolicy::Exponential {
            base: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Returns `None` for [`RetryPolicy::Never`], meaning "do not retry".
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            RetryPolicy::Fixed { delay } => Some(*delay),
            RetryPolicy::Exponential { base, max_delay } => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                let millis = (base.as_millis() as u64).saturating_mul(factor);
                Some(Duration::from_millis(millis).min(*max_delay))
            }
            RetryPolicy::Never => None,
        }
    }
}
