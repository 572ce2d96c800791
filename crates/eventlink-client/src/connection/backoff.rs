//! Reconnect delay policy: exponential, capped, with upward jitter.
//!
//! Jitter only ever adds up to `jitter_ratio * nominal` (ratio <= 1) and the
//! sum is capped, so delay(n + 1) >= delay(n) holds for any jitter samples.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectSection;

#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64, jitter_ratio: f64) -> Self {
        Self {
            base_ms: base_ms.max(1),
            max_ms: max_ms.max(base_ms.max(1)),
            jitter_ratio: jitter_ratio.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(cfg: &ReconnectSection) -> Self {
        Self::new(cfg.base_delay_ms, cfg.max_delay_ms, cfg.jitter_ratio)
    }

    /// Delay before the `attempt`-th retry (0-based) without jitter.
    pub fn nominal_ms(&self, attempt: u32) -> u64 {
        let factor = 1u64.checked_shl(attempt.min(63)).unwrap_or(u64::MAX);
        self.base_ms.saturating_mul(factor).min(self.max_ms)
    }

    /// Delay with a caller-supplied jitter sample in `[0, 1]`.
    pub fn delay_with(&self, attempt: u32, sample: f64) -> Duration {
        let nominal = self.nominal_ms(attempt);
        let extra = (nominal as f64 * self.jitter_ratio * sample.clamp(0.0, 1.0)) as u64;
        Duration::from_millis(nominal.saturating_add(extra).min(self.max_ms))
    }

    /// Delay with a random jitter sample.
    pub fn delay(&self, attempt: u32) -> Duration {
        let sample: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        self.delay_with(attempt, sample)
    }
}
