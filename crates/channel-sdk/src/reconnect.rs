//! Reconnect policy with capped exponential back-off.

use std::time::Duration;

use cb_domain::config::ChannelConfig;

/// Controls how the client reconnects after an involuntary close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (cap).
    pub max_delay: Duration,
    /// Maximum number of consecutive reconnects.  `None` means unlimited.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: None,
        }
    }
}

impl ReconnectBackoff {
    pub fn from_config(cfg: &ChannelConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(cfg.reconnect_backoff_ms),
            max_delay: Duration::from_millis(cfg.max_reconnect_backoff_ms),
            max_attempts: cfg.max_reconnect_attempts,
        }
    }

    /// Delay for the given attempt number (1-indexed):
    /// `min(initial * 2^(attempt - 1), max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1u64 << exponent;
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(initial_ms.saturating_mul(factor));
        delay.min(self.max_delay)
    }

    /// Whether `attempts` reconnects have already used up the budget.
    pub fn should_give_up(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}
