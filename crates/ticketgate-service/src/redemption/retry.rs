//! Exponential backoff with jitter for lost races.

use std::time::Duration;

use rand::Rng;

use ticketgate_core::config::RedemptionConfig;

/// Upper bound for a single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(2);

/// Retry schedule for conflicting units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base: Duration,
}

impl RetryPolicy {
    /// Builds the policy from redemption settings.
    pub fn from_config(config: &RedemptionConfig) -> Self {
        Self {
            max_retries: config.max_conflict_retries,
            base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`
    /// plus up to `base` of random jitter, capped at two seconds.
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let backoff = self.base.saturating_mul(1u32 << exponent);
        let jitter_ms = match u64::try_from(self.base.as_millis()) {
            Ok(0) | Err(_) => 0,
            Ok(base_ms) => rand::thread_rng().gen_range(0..=base_ms),
        };
        (backoff + Duration::from_millis(jitter_ms)).min(MAX_DELAY)
    }
}
