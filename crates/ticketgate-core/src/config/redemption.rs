//! Redemption engine configuration.

use serde::{Deserialize, Serialize};

/// Redemption settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionConfig {
    /// Internal retries after a lost race before surfacing `Internal`.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Base delay of the exponential backoff between retries, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_max_conflict_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    20
}
