//! Reconnection backoff policy for the resilient client, sharing its
//! exponential formula with `tidemcp_transport::http::retry::RetryPolicy`
//! but configured independently since the client retries at the session
//! level (reconnect + re-handshake), not just the transport level.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the computed delay randomized away, to avoid a thundering
    /// herd of clients reconnecting on the same schedule.
    pub jitter_factor: f64,
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max_delay.as_millis() as f64);
        let jitter_span = capped * self.jitter_factor;
        let jitter = (fastrand::f64() - 0.5) * 2.0 * jitter_span;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt >= max)
    }
}

/// Named presets mirroring the tiers an embedding application typically
/// picks between: correctness-first, throughput-first, and footprint-first.
pub mod presets {
    use super::ReconnectPolicy;
    use std::time::Duration;

    pub fn high_reliability() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: None,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.5,
            jitter_factor: 0.1,
        }
    }

    pub fn high_performance() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: Some(2),
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.05,
        }
    }

    pub fn resource_constrained() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: Some(3),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_all_produce_usable_policies() {
        for policy in [presets::high_reliability(), presets::high_performance(), presets::resource_constrained()] {
            assert!(policy.base_delay.as_millis() > 0);
            assert!(policy.delay(0) <= policy.max_delay * 2);
        }
    }

    #[test]
    fn delay_grows_with_attempt_number_on_average() {
        let policy = ReconnectPolicy {
            max_attempts: None,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }

    #[test]
    fn finite_policy_reports_exhaustion() {
        let policy = presets::high_performance();
        assert!(!policy.exhausted(0));
        assert!(policy.exhausted(2));
    }

    #[test]
    fn unbounded_policy_never_exhausts() {
        let policy = presets::high_reliability();
        assert!(!policy.exhausted(1_000_000));
    }
}
