use std::time::Duration;

use async_trait::async_trait;
use jobpilot_stealth::PageHandle;
use tracing::debug;

/// Selectors that indicate an anti-bot challenge is blocking the page.
pub const CHALLENGE_MARKERS: &[&str] = &[
    "iframe[src*=\"recaptcha\"]",
    ".g-recaptcha",
    "iframe[src*=\"hcaptcha\"]",
    ".h-captcha",
    "#captcha",
    ".captcha",
];

/// What the solver is asked to deal with.
#[derive(Debug, Clone)]
pub struct ChallengeContext {
    /// URL of the page presenting the challenge.
    pub url: String,
    /// The marker selector that matched.
    pub marker: String,
}

/// Strategy for resolving an anti-bot challenge.
///
/// Implementations may hand the page to a human, call an external solving
/// service, or simply refuse. Returning `None` means the challenge stands
/// and the attempt fails as unresolved.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Attempt to resolve the challenge within the deadline.
    ///
    /// Returns the response token when the challenge was solved.
    async fn solve(&self, context: &ChallengeContext, deadline: Duration) -> Option<String>;
}

/// Solver that never solves anything.
///
/// The default in unattended runs: a challenge is treated as detection and
/// the session identity is retired rather than burned on a hopeless solve.
pub struct RefusingSolver;

#[async_trait]
impl ChallengeSolver for RefusingSolver {
    async fn solve(&self, context: &ChallengeContext, _deadline: Duration) -> Option<String> {
        debug!(url = %context.url, marker = %context.marker, "challenge left unresolved");
        None
    }
}

/// Check the current page for any known challenge marker.
///
/// Markers are probed with a short per-selector timeout so a clean page
/// costs little.
pub async fn detect_challenge(page: &dyn PageHandle) -> Option<String> {
    for marker in CHALLENGE_MARKERS {
        if page.wait_for_selector(marker, 250).await.is_ok() {
            return Some((*marker).to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refusing_solver_returns_none() {
        let solver = RefusingSolver;
        let context = ChallengeContext {
            url: "https://jobs.example.com/apply".to_string(),
            marker: ".g-recaptcha".to_string(),
        };
        assert!(solver
            .solve(&context, Duration::from_secs(1))
            .await
            .is_none());
    }
}
