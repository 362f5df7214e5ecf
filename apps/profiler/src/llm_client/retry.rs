use std::time::Duration;

use crate::config::DEFAULT_RETRY_BASE_DELAY_MS;

const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Delay schedule between completion attempts.
/// Exponential: base, 2×base, 4×base, … capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: MAX_BACKOFF.max(base_delay),
        }
    }

    /// No waiting between attempts.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_retry() {
        let policy = RetryPolicy::new(Duration::from_millis(500));
        assert_eq!(policy.backoff_for_retry(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for_retry(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for_retry(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(Duration::from_millis(500));
        assert_eq!(policy.backoff_for_retry(10), MAX_BACKOFF);
        assert_eq!(policy.backoff_for_retry(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate();
        assert_eq!(policy.backoff_for_retry(1), Duration::ZERO);
        assert_eq!(policy.backoff_for_retry(5), Duration::ZERO);
    }
}
