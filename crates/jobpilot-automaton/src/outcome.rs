use serde::{Deserialize, Serialize};

/// Why an attempt was skipped without ever filling a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No recognizable application form was found on the posting page.
    NoForm,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoForm => "no_form",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified cause of a failed attempt.
///
/// The classification drives the retry policy: transient causes are worth
/// several attempts, an unresolved challenge gets one more try with a fresh
/// session identity, and everything else is terminal on first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Navigation did not settle within the configured deadline.
    Timeout,
    /// The page could not be loaded at all.
    Navigation,
    /// No browser session could be acquired.
    SessionUnavailable,
    /// A challenge (CAPTCHA or similar) was presented and not resolved.
    ChallengeUnresolved,
    /// The form was found but a required element was missing or broken.
    FormBroken,
    /// Submission appeared to go through but no confirmation signal appeared.
    Unverified,
    /// The attempt was canceled by shutdown.
    Canceled,
}

impl FailureReason {
    /// Whether this failure is worth retrying at all.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureReason::Timeout
                | FailureReason::Navigation
                | FailureReason::SessionUnavailable
                | FailureReason::ChallengeUnresolved
        )
    }

    /// Ambiguous failures may have actually succeeded server-side and must
    /// not be blindly re-submitted.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, FailureReason::Unverified)
    }

    /// Total attempts permitted for this failure class, counting the first.
    pub fn max_attempts(&self) -> u32 {
        match self {
            FailureReason::Timeout
            | FailureReason::Navigation
            | FailureReason::SessionUnavailable => 3,
            FailureReason::ChallengeUnresolved => 2,
            FailureReason::FormBroken | FailureReason::Unverified | FailureReason::Canceled => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Navigation => "navigation",
            FailureReason::SessionUnavailable => "session_unavailable",
            FailureReason::ChallengeUnresolved => "challenge_unresolved",
            FailureReason::FormBroken => "form_broken",
            FailureReason::Unverified => "unverified",
            FailureReason::Canceled => "canceled",
        }
    }

    /// Parse the wire form produced by [`FailureReason::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(FailureReason::Timeout),
            "navigation" => Some(FailureReason::Navigation),
            "session_unavailable" => Some(FailureReason::SessionUnavailable),
            "challenge_unresolved" => Some(FailureReason::ChallengeUnresolved),
            "form_broken" => Some(FailureReason::FormBroken),
            "unverified" => Some(FailureReason::Unverified),
            "canceled" => Some(FailureReason::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of a single interaction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// The application was submitted and a confirmation signal observed.
    Succeeded {
        /// Confirmation text extracted from the page, when available.
        confirmation: Option<String>,
    },
    /// The application was not submitted (or could not be confirmed).
    Failed {
        reason: FailureReason,
        detail: String,
    },
    /// The attempt never reached a form and consumed no quota.
    Skipped { reason: SkipReason },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, AttemptOutcome::Skipped { .. })
    }

    /// Whether a further attempt is permitted given how many have been made.
    pub fn permits_retry(&self, attempts_made: u32) -> bool {
        match self {
            AttemptOutcome::Failed { reason, .. } => attempts_made < reason.max_attempts(),
            _ => false,
        }
    }
}
