//! Human-like timing jitter for form interaction.
//!
//! Randomized micro-delays and occasional scroll movements between field
//! fills are a deliberate anti-detection requirement, kept configurable
//! rather than hard-coded into the automaton.

use jobpilot_core::StealthConfig;
use rand::Rng;
use std::time::Duration;

/// Configurable jitter policy applied while filling forms.
#[derive(Debug, Clone)]
pub struct JitterPolicy {
    min_field_delay: Duration,
    max_field_delay: Duration,
    scroll_probability: f64,
    shuffle_fields: bool,
}

impl JitterPolicy {
    /// Build a policy from stealth configuration.
    #[must_use]
    pub fn from_config(config: &StealthConfig) -> Self {
        let min = config.min_field_delay_ms.min(config.max_field_delay_ms);
        let max = config.min_field_delay_ms.max(config.max_field_delay_ms);
        Self {
            min_field_delay: Duration::from_millis(min),
            max_field_delay: Duration::from_millis(max),
            scroll_probability: config.scroll_probability.clamp(0.0, 1.0),
            shuffle_fields: config.shuffle_fields,
        }
    }

    /// A policy with no delays, for tests and dry runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_field_delay: Duration::ZERO,
            max_field_delay: Duration::ZERO,
            scroll_probability: 0.0,
            shuffle_fields: false,
        }
    }

    /// Randomized pause before the next field interaction.
    #[must_use]
    pub fn field_delay(&self) -> Duration {
        if self.max_field_delay.is_zero() {
            return Duration::ZERO;
        }
        let min = self.min_field_delay.as_millis() as u64;
        let max = self.max_field_delay.as_millis() as u64;
        if min == max {
            return self.min_field_delay;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Whether to add a scroll movement before this interaction.
    #[must_use]
    pub fn should_scroll(&self) -> bool {
        self.scroll_probability > 0.0 && rand::thread_rng().gen_bool(self.scroll_probability)
    }

    /// Randomized scroll distance in pixels.
    #[must_use]
    pub fn scroll_amount(&self) -> i64 {
        rand::thread_rng().gen_range(100..=500)
    }

    /// Whether field-filling order is shuffled per attempt.
    #[must_use]
    pub fn shuffle_fields(&self) -> bool {
        self.shuffle_fields
    }
}
