use std::sync::Arc;
use std::time::Duration;

use jobpilot_core::config::BrowserConfig;
use jobpilot_core::types::PlatformId;
use jobpilot_stealth::{
    extract_domain, JitterPolicy, PageDriver, PageHandle, RateLimiter, StealthError,
    StealthSessionPool,
};
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::challenge::{detect_challenge, ChallengeContext, ChallengeSolver, RefusingSolver};
use crate::form::{detect_generic, DetectedForm, FormStrategySet};
use crate::mapping::{map_fields, ApplicantProfile, FieldWrite};
use crate::outcome::{AttemptOutcome, FailureReason, SkipReason};

/// How long a platform signature probe waits before falling back to the
/// generic scan.
const SIGNATURE_PROBE_MS: u64 = 2_000;

/// One application to attempt.
#[derive(Debug, Clone)]
pub struct AttemptRequest {
    /// Page carrying the application form.
    pub url: String,
    pub platform: PlatformId,
    pub profile: ApplicantProfile,
}

/// Drives a single application attempt through its interaction sequence:
/// navigate, detect form, map fields, fill, resolve challenges, submit,
/// verify.
///
/// Every terminal path produces an [`AttemptOutcome`]; the automaton never
/// panics an attempt away.
pub struct InteractionAutomaton {
    pool: StealthSessionPool,
    limiter: Arc<RateLimiter>,
    strategies: FormStrategySet,
    jitter: JitterPolicy,
    solver: Arc<dyn ChallengeSolver>,
    navigation_timeout: Duration,
    verify_timeout_ms: u64,
    challenge_wait: Duration,
}

impl InteractionAutomaton {
    pub fn new(
        pool: StealthSessionPool,
        limiter: Arc<RateLimiter>,
        jitter: JitterPolicy,
        browser: &BrowserConfig,
    ) -> Self {
        Self {
            pool,
            limiter,
            strategies: FormStrategySet::builtin(),
            jitter,
            solver: Arc::new(RefusingSolver),
            navigation_timeout: Duration::from_secs(browser.navigation_timeout_secs),
            verify_timeout_ms: browser.verify_timeout_secs * 1_000,
            challenge_wait: Duration::from_secs(browser.challenge_wait_secs),
        }
    }

    /// Replace the default refusing solver.
    #[must_use]
    pub fn with_solver(mut self, solver: Arc<dyn ChallengeSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the built-in platform form signatures.
    #[must_use]
    pub fn with_strategies(mut self, strategies: FormStrategySet) -> Self {
        self.strategies = strategies;
        self
    }

    /// Run one attempt to completion.
    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        request: &AttemptRequest,
        cancel: &CancellationToken,
    ) -> AttemptOutcome {
        let session = match self.pool.acquire(cancel).await {
            Ok(session) => session,
            Err(StealthError::Canceled) => return canceled(),
            Err(e) => {
                return failed(FailureReason::SessionUnavailable, e.to_string());
            }
        };

        // The attempt owns this page for its whole lifetime; concurrent
        // attempts each hold their own.
        let page = match driver.open_page(session.profile()).await {
            Ok(page) => page,
            Err(e) => return failed(FailureReason::SessionUnavailable, e.to_string()),
        };
        let page = page.as_ref();

        let domain = match extract_domain(&request.url) {
            Ok(domain) => domain,
            Err(e) => return failed(FailureReason::Navigation, e.to_string()),
        };

        if self.limiter.wait(cancel, &domain).await.is_err() {
            return canceled();
        }

        info!(url = %request.url, platform = %request.platform, "starting attempt");

        match tokio::time::timeout(self.navigation_timeout, page.navigate(&request.url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return failed(FailureReason::Navigation, e.to_string()),
            Err(_) => {
                return failed(
                    FailureReason::Timeout,
                    format!("navigation exceeded {:?}", self.navigation_timeout),
                )
            }
        }
        if cancel.is_cancelled() {
            return canceled();
        }

        let form = match self.detect_form(page, request).await {
            FormDetection::Found(form) => form,
            FormDetection::Blocked(marker) => {
                session.flag_detected();
                match self.try_solve(request, &marker).await {
                    Some(_) => match self.detect_form(page, request).await {
                        FormDetection::Found(form) => form,
                        _ => {
                            return failed(
                                FailureReason::ChallengeUnresolved,
                                format!("no form after solving {marker}"),
                            )
                        }
                    },
                    None => {
                        return failed(
                            FailureReason::ChallengeUnresolved,
                            format!("blocked by {marker}"),
                        )
                    }
                }
            }
            FormDetection::Absent => {
                info!(url = %request.url, "no application form found");
                return AttemptOutcome::Skipped {
                    reason: SkipReason::NoForm,
                };
            }
            FormDetection::PageError(detail) => {
                return failed(FailureReason::Navigation, detail);
            }
        };

        let plan = map_fields(&form, &request.profile);
        if !plan.unmapped_required.is_empty() {
            warn!(
                url = %request.url,
                missing = ?plan.unmapped_required,
                "required fields have no profile value"
            );
        }
        if plan.writes.is_empty() {
            return failed(
                FailureReason::FormBroken,
                "no fillable fields mapped".to_string(),
            );
        }

        if let Some(outcome) = self.fill(page, plan.writes, cancel).await {
            return outcome;
        }

        // Challenges most often appear at submission time.
        if let Some(marker) = detect_challenge(page).await {
            session.flag_detected();
            if self.try_solve(request, &marker).await.is_none() {
                return failed(
                    FailureReason::ChallengeUnresolved,
                    format!("challenge at submit: {marker}"),
                );
            }
        }
        if cancel.is_cancelled() {
            return canceled();
        }

        if let Err(e) = page.click(&form.submit).await {
            return failed(
                FailureReason::FormBroken,
                format!("submit control {}: {e}", form.submit),
            );
        }

        match page
            .wait_for_selector(&form.success, self.verify_timeout_ms)
            .await
        {
            Ok(()) => {
                let confirmation = page
                    .extract_text(&form.success)
                    .await
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                info!(url = %request.url, "application confirmed");
                AttemptOutcome::Succeeded { confirmation }
            }
            Err(_) => failed(
                FailureReason::Unverified,
                format!("no confirmation signal at {}", form.success),
            ),
        }
    }

    /// Try the platform's known form signatures, then the generic page scan.
    async fn detect_form(&self, page: &dyn PageHandle, request: &AttemptRequest) -> FormDetection {
        for signature in self.strategies.for_platform(&request.platform) {
            if page
                .wait_for_selector(&signature.probe, SIGNATURE_PROBE_MS)
                .await
                .is_ok()
            {
                debug!(probe = %signature.probe, "matched platform form signature");
                return FormDetection::Found(DetectedForm::from(signature));
            }
        }

        let html = match page.page_content().await {
            Ok(html) => html,
            Err(e) => return FormDetection::PageError(e.to_string()),
        };
        if let Some(form) = detect_generic(&html) {
            debug!(fields = form.fields.len(), "generic scan found a form");
            return FormDetection::Found(form);
        }

        // A challenge wall also presents as "no form".
        match detect_challenge(page).await {
            Some(marker) => FormDetection::Blocked(marker),
            None => FormDetection::Absent,
        }
    }

    async fn try_solve(&self, request: &AttemptRequest, marker: &str) -> Option<String> {
        let context = ChallengeContext {
            url: request.url.clone(),
            marker: marker.to_string(),
        };
        tokio::time::timeout(self.challenge_wait, self.solver.solve(&context, self.challenge_wait))
            .await
            .ok()
            .flatten()
    }

    /// Fill fields with human-like pacing. Returns a terminal outcome only
    /// when the fill cannot continue.
    async fn fill(
        &self,
        page: &dyn PageHandle,
        mut writes: Vec<FieldWrite>,
        cancel: &CancellationToken,
    ) -> Option<AttemptOutcome> {
        if self.jitter.shuffle_fields() {
            writes.shuffle(&mut rand::thread_rng());
        }

        for write in &writes {
            let delay = self.jitter.field_delay();
            tokio::select! {
                () = cancel.cancelled() => return Some(canceled()),
                () = tokio::time::sleep(delay) => {}
            }

            if self.jitter.should_scroll() {
                let amount = self.jitter.scroll_amount();
                if let Err(e) = page.scroll_by(amount).await {
                    debug!(error = %e, "scroll jitter failed");
                }
            }

            if let Err(e) = page.fill_field(&write.field.selector, &write.value).await {
                if write.field.kind.is_required() {
                    return Some(failed(
                        FailureReason::FormBroken,
                        format!("required field {}: {e}", write.field.selector),
                    ));
                }
                debug!(selector = %write.field.selector, error = %e, "skipping unfillable field");
            }
        }
        None
    }
}

enum FormDetection {
    Found(DetectedForm),
    /// No form, but a challenge marker is present.
    Blocked(String),
    Absent,
    PageError(String),
}

fn failed(reason: FailureReason, detail: String) -> AttemptOutcome {
    AttemptOutcome::Failed { reason, detail }
}

fn canceled() -> AttemptOutcome {
    failed(FailureReason::Canceled, "attempt canceled".to_string())
}
