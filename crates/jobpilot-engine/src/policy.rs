//! Per-user automation policy and the quota arithmetic derived from it.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use jobpilot_core::types::{CredentialId, PlatformId};
use jobpilot_discovery::JobPosting;
use serde::{Deserialize, Serialize};

/// A user's automation policy. Read-only to the engine; the provider that
/// hands it out owns mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationPolicy {
    /// Master switch; a disabled policy never produces attempts.
    pub enabled: bool,
    /// Quota-consuming attempts permitted per calendar day (UTC).
    pub max_attempts_per_day: u32,
    /// Start of the daily working window.
    pub window_start: NaiveTime,
    /// End of the daily working window (exclusive).
    pub window_end: NaiveTime,
    /// Days of the week automation may run.
    pub weekdays: Vec<Weekday>,
    /// Platforms this user applies through.
    pub enabled_platforms: Vec<PlatformId>,
    /// Stored credentials for platforms that need a login.
    #[serde(default)]
    pub platform_credentials: HashMap<PlatformId, CredentialId>,
    /// A posting must mention at least one of these (empty = no constraint).
    #[serde(default)]
    pub include_keywords: Vec<String>,
    /// A posting mentioning any of these is rejected.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    /// Minimum match score a posting needs to be dispatched.
    #[serde(default)]
    pub min_match_score: f64,
}

impl Default for AutomationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts_per_day: 10,
            window_start: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            window_end: NaiveTime::from_hms_opt(17, 0, 0).expect("valid time"),
            weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            enabled_platforms: Vec::new(),
            platform_credentials: HashMap::new(),
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            min_match_score: 0.0,
        }
    }
}

impl AutomationPolicy {
    /// Whether this posting passes the policy's keyword and score filters.
    #[must_use]
    pub fn accepts_posting(&self, posting: &JobPosting, score: f64) -> bool {
        if score < self.min_match_score {
            return false;
        }

        let haystack = format!("{} {}", posting.title, posting.description).to_lowercase();

        if !self.include_keywords.is_empty()
            && !self
                .include_keywords
                .iter()
                .any(|kw| haystack.contains(&kw.to_lowercase()))
        {
            return false;
        }

        !self
            .exclude_keywords
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()))
    }
}

/// How many attempts the policy permits right now.
///
/// Pure over its inputs. Returns 0 outside the weekday set or working
/// window, and `max - attempts_today` (saturating) inside it, so for a
/// fixed `now` the result only shrinks as `attempts_today` grows.
#[must_use]
pub fn permitted_attempts(
    policy: &AutomationPolicy,
    attempts_today: u32,
    now: DateTime<Utc>,
) -> u32 {
    if !policy.enabled {
        return 0;
    }
    if !policy.weekdays.contains(&now.weekday()) {
        return 0;
    }

    let time = now.time();
    let in_window = if policy.window_start <= policy.window_end {
        time >= policy.window_start && time < policy.window_end
    } else {
        // Overnight window, e.g. 22:00-06:00.
        time >= policy.window_start || time < policy.window_end
    };
    if !in_window {
        return 0;
    }

    policy.max_attempts_per_day.saturating_sub(attempts_today)
}

/// Start of `now`'s calendar day (UTC), the boundary quota counting uses.
#[must_use]
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
}
