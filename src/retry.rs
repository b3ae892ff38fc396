use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry with multiplicative backoff, shared by every engine that
/// polls the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay_ms: u64,
    /// Growth factor applied per further attempt
    pub multiplier: f64,
    /// Upper bound of uniform random jitter added to each delay
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 100, 2.0)
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            multiplier,
            jitter_ms: 0,
        }
    }

    pub fn with_jitter(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Attempt numbers, starting at 1. Always yields at least one attempt.
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts.max(1)
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts.max(1)
    }

    /// Delay to wait after `attempt` (1-based) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.base_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.round() as u64 + jitter)
    }

    /// Sleep for the backoff that follows `attempt`
    pub async fn backoff(&self, attempt: u32) {
        tokio::time::sleep(self.delay_for(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_multiplicatively() {
        let policy = RetryPolicy::new(3, 100, 2.0);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));

        let gentle = RetryPolicy::new(3, 100, 1.2);
        assert_eq!(gentle.delay_for(2), Duration::from_millis(120));
        assert_eq!(gentle.delay_for(3), Duration::from_millis(144));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let policy = RetryPolicy::new(3, 50, 1.0).with_jitter(25);
        for _ in 0..100 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(75));
        }
    }

    #[test]
    fn test_attempts_never_empty() {
        let policy = RetryPolicy::new(0, 10, 1.0);
        assert_eq!(policy.attempts().count(), 1);
        assert!(policy.is_last(1));

        let policy = RetryPolicy::new(3, 10, 1.0);
        assert_eq!(policy.attempts().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!policy.is_last(2));
        assert!(policy.is_last(3));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 100);
        assert_eq!(policy.jitter_ms, 0);
    }
}
