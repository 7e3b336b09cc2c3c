//! Adaptive per-domain request pacing.
//!
//! Each target domain is governed independently: a caller that arrives
//! before the domain's current delay has elapsed sleeps the remainder and
//! the delay grows (suspected throttling); a caller that arrives after the
//! delay decays it back toward the configured floor.

use crate::error::{Result, StealthError};
use jobpilot_core::RateConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
struct DomainState {
    /// Earliest instant the next request may start.
    next_at: Instant,
    /// Current inter-request delay for this domain.
    delay: Duration,
}

/// Per-domain exponential backoff/recovery controller.
///
/// This is not a global token bucket: one aggressive target never throttles
/// unrelated domains.
#[derive(Debug)]
pub struct RateLimiter {
    domains: Mutex<HashMap<String, DomainState>>,
    initial_delay: Duration,
    max_delay: Duration,
    growth_factor: f64,
    decay_factor: f64,
}

impl RateLimiter {
    /// Create a rate limiter from configuration.
    #[must_use]
    pub fn new(config: &RateConfig) -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            growth_factor: config.growth_factor,
            decay_factor: config.decay_factor,
        }
    }

    /// Block until it is safe to issue the next request to `domain`.
    ///
    /// Returns promptly with [`StealthError::Canceled`] if the token is
    /// canceled while waiting.
    pub async fn wait(&self, cancel: &CancellationToken, domain: &str) -> Result<()> {
        let sleep_for = self.reserve(domain).await;

        if sleep_for.is_zero() {
            return Ok(());
        }

        tracing::debug!(domain, wait_ms = sleep_for.as_millis() as u64, "rate limiting");

        tokio::select! {
            () = cancel.cancelled() => Err(StealthError::Canceled),
            () = tokio::time::sleep(sleep_for) => Ok(()),
        }
    }

    /// Reserve the next request slot for `domain` and return how long the
    /// caller must sleep before using it.
    ///
    /// The reservation is made under the lock so concurrent callers for the
    /// same domain are serialized with at least the current delay between
    /// their slots.
    async fn reserve(&self, domain: &str) -> Duration {
        let now = Instant::now();
        let mut domains = self.domains.lock().await;

        let state = domains.entry(domain.to_string()).or_insert(DomainState {
            next_at: now,
            delay: self.initial_delay,
        });

        let wait = state.next_at.saturating_duration_since(now);

        let new_delay = if wait.is_zero() {
            // Domain has been quiet long enough, recover speed
            let decayed = state.delay.mul_f64(self.decay_factor);
            decayed.max(self.initial_delay)
        } else {
            // Caller arrived too soon, slow down
            let grown = state.delay.mul_f64(self.growth_factor);
            grown.min(self.max_delay)
        };

        state.delay = new_delay;
        state.next_at = now + wait + new_delay;

        wait
    }

    /// Current delay for a domain, if it has been seen before.
    pub async fn current_delay(&self, domain: &str) -> Option<Duration> {
        self.domains.lock().await.get(domain).map(|s| s.delay)
    }
}
