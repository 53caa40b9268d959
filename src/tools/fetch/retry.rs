use super::utils::jitter_ms;
use crate::config::FetchConfig;
use std::time::Duration;

/// Exponential backoff for transport failures.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base_ms: u64,
    pub max_ms: u64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_ms: cfg.backoff_base_ms,
            max_ms: cfg.backoff_max_ms,
            jitter_ms: cfg.jitter_ms,
        }
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(20)).unwrap_or(u64::MAX);
        let ms = self.base_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(ms)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + Duration::from_millis(jitter_ms(self.jitter_ms))
    }
}
