//! Bounded worker-pool dispatch of application attempts.
//!
//! Tasks run through a `FuturesUnordered` capped at the configured worker
//! count. Attempt creation is insert-or-skip on the idempotency key, so
//! dispatching the same (user, job) twice — even from concurrent cycles —
//! produces exactly one attempt. Retryable failures re-run with exponential
//! backoff up to the failure class's attempt cap.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use jobpilot_automaton::{
    ApplicantProfile, AttemptOutcome, AttemptRequest, FailureReason, InteractionAutomaton,
};
use jobpilot_core::config::EngineConfig;
use jobpilot_core::types::{PlatformId, UserId};
use jobpilot_db::attempts;
use jobpilot_db::{AttemptState, Database};
use jobpilot_stealth::PageDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::events::{EngineEvent, NotificationSink};

/// One queued application for the worker pool.
#[derive(Debug, Clone)]
pub struct DispatchTask {
    pub user_id: UserId,
    pub platform: PlatformId,
    pub source_id: String,
    pub posting_url: String,
    pub profile: ApplicantProfile,
}

/// What a dispatch cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Attempts actually created and run.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Tasks dropped because a live attempt already held the key.
    pub deduped: usize,
    /// Tasks that errored outside the interaction itself.
    pub errored: usize,
}

enum TaskResult {
    Deduped,
    Completed(AttemptState),
    Errored,
}

/// Runs queued tasks on a fixed-size worker pool.
pub struct TaskDispatcher {
    db: Database,
    automaton: Arc<InteractionAutomaton>,
    driver: Arc<dyn PageDriver>,
    sink: Arc<dyn NotificationSink>,
    worker_count: usize,
    retry_base_delay: Duration,
}

impl TaskDispatcher {
    pub fn new(
        db: Database,
        automaton: Arc<InteractionAutomaton>,
        driver: Arc<dyn PageDriver>,
        sink: Arc<dyn NotificationSink>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            db,
            automaton,
            driver,
            sink,
            worker_count: config.worker_count.max(1),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Run all tasks, at most `worker_count` concurrently, in given order.
    pub async fn dispatch(
        &self,
        tasks: Vec<DispatchTask>,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let mut futures = FuturesUnordered::new();
        let mut report = DispatchReport::default();

        for task in tasks {
            if cancel.is_cancelled() {
                break;
            }
            futures.push(self.run_task(task, cancel));

            while futures.len() >= self.worker_count {
                if let Some(result) = futures.next().await {
                    absorb(&mut report, &result);
                }
            }
        }

        while let Some(result) = futures.next().await {
            absorb(&mut report, &result);
        }

        report
    }

    async fn run_task(&self, task: DispatchTask, cancel: &CancellationToken) -> TaskResult {
        match self.try_run_task(&task, cancel).await {
            Ok(result) => result,
            Err(e) => {
                error!(user = %task.user_id, url = %task.posting_url, error = %e, "task failed");
                self.sink
                    .publish(EngineEvent::Error {
                        user_id: Some(task.user_id.as_str().to_string()),
                        message: e.to_string(),
                    })
                    .await;
                TaskResult::Errored
            }
        }
    }

    async fn try_run_task(
        &self,
        task: &DispatchTask,
        cancel: &CancellationToken,
    ) -> Result<TaskResult> {
        let Some(attempt) = attempts::create_attempt(
            self.db.pool(),
            task.user_id.as_str(),
            task.platform.as_str(),
            &task.source_id,
            &task.posting_url,
        )
        .await?
        else {
            debug!(
                user = %task.user_id,
                platform = %task.platform,
                source_id = %task.source_id,
                "live attempt already exists, skipping"
            );
            return Ok(TaskResult::Deduped);
        };

        self.sink
            .publish(EngineEvent::ApplicationStarted {
                user_id: task.user_id.as_str().to_string(),
                attempt_id: attempt.id.clone(),
                posting_url: task.posting_url.clone(),
            })
            .await;

        let request = AttemptRequest {
            url: task.posting_url.clone(),
            platform: task.platform.clone(),
            profile: task.profile.clone(),
        };

        let mut runs: u32 = 0;
        let outcome = loop {
            attempts::mark_started(self.db.pool(), &attempt.id).await?;
            runs += 1;
            self.sink
                .publish(EngineEvent::ApplicationProgress {
                    user_id: task.user_id.as_str().to_string(),
                    attempt_id: attempt.id.clone(),
                    state: AttemptState::InProgress.to_string(),
                })
                .await;

            let outcome = self.automaton.run(self.driver.as_ref(), &request, cancel).await;

            let retryable = matches!(
                &outcome,
                AttemptOutcome::Failed { reason, .. } if *reason != FailureReason::Canceled
            ) && outcome.permits_retry(runs)
                && !cancel.is_cancelled();
            if !retryable {
                break outcome;
            }

            let delay = self.retry_base_delay * 2_u32.saturating_pow(runs - 1);
            warn!(
                attempt_id = %attempt.id,
                run = runs,
                ?delay,
                "retrying failed attempt after backoff"
            );
            tokio::select! {
                () = cancel.cancelled() => break outcome,
                () = tokio::time::sleep(delay) => {}
            }
        };

        let (state, failure_reason, detail, confirmation) = match &outcome {
            AttemptOutcome::Succeeded { confirmation } => {
                (AttemptState::Succeeded, None, None, confirmation.clone())
            }
            AttemptOutcome::Failed { reason, detail } => (
                AttemptState::Failed,
                Some(reason.as_str().to_string()),
                Some(detail.clone()),
                None,
            ),
            AttemptOutcome::Skipped { reason } => (
                AttemptState::Skipped,
                None,
                Some(reason.as_str().to_string()),
                None,
            ),
        };

        attempts::record_outcome(
            self.db.pool(),
            &attempt.id,
            state,
            failure_reason.as_deref(),
            detail.as_deref(),
            confirmation.as_deref(),
        )
        .await?;

        self.sink
            .publish(EngineEvent::ApplicationCompleted {
                user_id: task.user_id.as_str().to_string(),
                attempt_id: attempt.id.clone(),
                state: state.to_string(),
                failure_reason,
                confirmation,
            })
            .await;

        Ok(TaskResult::Completed(state))
    }
}

fn absorb(report: &mut DispatchReport, result: &TaskResult) {
    match result {
        TaskResult::Deduped => report.deduped += 1,
        TaskResult::Errored => report.errored += 1,
        TaskResult::Completed(state) => {
            report.attempted += 1;
            match state {
                AttemptState::Succeeded => report.succeeded += 1,
                AttemptState::Failed => report.failed += 1,
                AttemptState::Skipped => report.skipped += 1,
                AttemptState::Pending | AttemptState::InProgress => {}
            }
        }
    }
}

/// Interleave per-user task lists round-robin, preserving each user's rank
/// order, so no single user monopolizes the worker pool.
#[must_use]
pub fn interleave(mut per_user: Vec<Vec<DispatchTask>>) -> Vec<DispatchTask> {
    let total: usize = per_user.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    let mut index = 0;
    while out.len() < total {
        for queue in &mut per_user {
            if index < queue.len() {
                out.push(queue[index].clone());
            }
        }
        index += 1;
    }
    out
}
