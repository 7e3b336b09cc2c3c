//! The orchestration engine: discovery, candidate selection, dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobpilot_core::config::AppConfig;
use jobpilot_core::types::{PlatformId, UserId};
use jobpilot_db::attempts::{self, ApplicationAttempt};
use jobpilot_db::postings::{self, PostingRecord};
use jobpilot_db::{AttemptState, Database};
use jobpilot_discovery::{
    AdapterRegistry, DiscoveryAggregator, JobPosting, RankedPosting, SearchQuery,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collaborators::{CredentialStore, PolicyProvider, ProfileProvider};
use crate::dispatcher::{interleave, DispatchReport, DispatchTask, TaskDispatcher};
use crate::error::Result;
use crate::events::{EngineEvent, NotificationSink};
use crate::policy::{day_start, permitted_attempts, AutomationPolicy};

/// Snapshot of engine health for a status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Whether the run loop is active.
    pub running: bool,
    /// Users the policy provider currently serves.
    pub active_users: usize,
    /// Quota-consuming attempts across all users today (UTC).
    pub attempts_today: i64,
    /// When the last cycle finished.
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// What one `run_once` cycle did.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleReport {
    /// Users that had quota and produced a search.
    pub users_served: usize,
    /// Tasks handed to the dispatcher.
    pub tasks_queued: usize,
    /// Dispatch results.
    pub dispatch: DispatchReport,
}

/// The orchestration engine.
///
/// Owns the discovery aggregator and the dispatcher; asks the injected
/// providers for users, policies, and profiles each cycle so external
/// changes take effect without a restart.
pub struct Engine {
    config: AppConfig,
    db: Database,
    registry: AdapterRegistry,
    aggregator: DiscoveryAggregator,
    dispatcher: TaskDispatcher,
    profiles: Arc<dyn ProfileProvider>,
    policies: Arc<dyn PolicyProvider>,
    credentials: Arc<dyn CredentialStore>,
    sink: Arc<dyn NotificationSink>,
    running: AtomicBool,
    last_cycle_at: Mutex<Option<DateTime<Utc>>>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        db: Database,
        registry: AdapterRegistry,
        aggregator: DiscoveryAggregator,
        dispatcher: TaskDispatcher,
        profiles: Arc<dyn ProfileProvider>,
        policies: Arc<dyn PolicyProvider>,
        credentials: Arc<dyn CredentialStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            db,
            registry,
            aggregator,
            dispatcher,
            profiles,
            policies,
            credentials,
            sink,
            running: AtomicBool::new(false),
            last_cycle_at: Mutex::new(None),
        }
    }

    /// Run one full cycle: evaluate every active user's quota, search,
    /// select candidates, dispatch.
    ///
    /// Per-user failures are published and skipped; only systemic failures
    /// (the policy provider itself being down) error the cycle.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<CycleReport> {
        let now = Utc::now();
        let users = self.policies.active_users().await?;
        let mut per_user_tasks: Vec<Vec<DispatchTask>> = Vec::new();
        let mut users_served = 0;

        for user in &users {
            if cancel.is_cancelled() {
                break;
            }
            match self.plan_user(user, now).await {
                Ok(Some(tasks)) => {
                    users_served += 1;
                    per_user_tasks.push(tasks);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(user = %user, error = %e, "skipping user this cycle");
                    self.sink
                        .publish(EngineEvent::Error {
                            user_id: Some(user.as_str().to_string()),
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }

        let tasks = interleave(per_user_tasks);
        let tasks_queued = tasks.len();
        let dispatch = self.dispatcher.dispatch(tasks, cancel).await;

        let report = CycleReport {
            users_served,
            tasks_queued,
            dispatch,
        };
        info!(
            users = report.users_served,
            queued = report.tasks_queued,
            succeeded = report.dispatch.succeeded,
            failed = report.dispatch.failed,
            skipped = report.dispatch.skipped,
            "cycle complete"
        );

        *self
            .last_cycle_at
            .lock()
            .expect("acquire lock on last cycle timestamp") = Some(Utc::now());

        Ok(report)
    }

    /// Repeat `run_once` at the configured poll interval until canceled.
    pub async fn run_until_cancelled(&self, cancel: &CancellationToken) {
        let interval = Duration::from_secs(self.config.engine.poll_interval_secs);
        self.running.store(true, Ordering::SeqCst);
        info!(?interval, "engine loop started");

        loop {
            if let Err(e) = self.run_once(cancel).await {
                error!(error = %e, "cycle failed");
                self.sink
                    .publish(EngineEvent::Error {
                        user_id: None,
                        message: e.to_string(),
                    })
                    .await;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("engine loop stopped");
    }

    /// Current engine status.
    pub async fn status(&self) -> Result<EngineStatus> {
        let users = self.policies.active_users().await?;
        let since = day_start(Utc::now());
        let mut attempts_today = 0;
        for user in &users {
            attempts_today +=
                attempts::count_quota_used(self.db.pool(), user.as_str(), since).await?;
        }

        Ok(EngineStatus {
            running: self.running.load(Ordering::SeqCst),
            active_users: users.len(),
            attempts_today,
            last_cycle_at: *self
                .last_cycle_at
                .lock()
                .expect("acquire lock on last cycle timestamp"),
        })
    }

    /// A user's attempts, newest first.
    pub async fn list_attempts(
        &self,
        user: &UserId,
        state: Option<AttemptState>,
        limit: i64,
    ) -> Result<Vec<ApplicationAttempt>> {
        Ok(attempts::list_attempts(self.db.pool(), user.as_str(), state, limit).await?)
    }

    /// Evaluate one user: quota, search, filter, select.
    ///
    /// Returns `Ok(None)` when the user has nothing to do this cycle.
    async fn plan_user(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<DispatchTask>>> {
        let policy = self.policies.policy_for(user).await?;
        if !policy.enabled {
            return Ok(None);
        }

        let used = attempts::count_quota_used(self.db.pool(), user.as_str(), day_start(now))
            .await?
            .try_into()
            .unwrap_or(u32::MAX);
        let permitted = permitted_attempts(&policy, used, now);
        if permitted == 0 {
            debug!(user = %user, used, "no quota this cycle");
            return Ok(None);
        }

        self.sink
            .publish(EngineEvent::SearchStarted {
                user_id: user.as_str().to_string(),
            })
            .await;

        let profile = self.profiles.application_data(user).await?;
        let platforms = self.usable_platforms(user, &policy).await;
        if platforms.is_empty() {
            return Ok(None);
        }

        let query = SearchQuery::new(
            policy.include_keywords.clone(),
            profile.location.clone(),
            self.config.discovery.per_source_limit,
        );
        let outcome = self
            .aggregator
            .search(&query, &platforms, &profile.resume_text)
            .await;

        self.sink
            .publish(EngineEvent::SearchProgress {
                user_id: user.as_str().to_string(),
                found: outcome.postings.len(),
                warnings: outcome.warnings.clone(),
            })
            .await;

        for ranked in &outcome.postings {
            if let Err(e) = postings::store_posting(self.db.pool(), &to_record(&ranked.posting)).await
            {
                warn!(url = %ranked.posting.url, error = %e, "failed to store posting");
            }
        }

        let tasks = self.select_candidates(user, &policy, &profile, outcome.postings, permitted);
        if tasks.is_empty() {
            return Ok(None);
        }
        Ok(Some(tasks))
    }

    /// Enabled platforms whose credential requirements are satisfiable.
    async fn usable_platforms(&self, user: &UserId, policy: &AutomationPolicy) -> Vec<PlatformId> {
        let mut usable = Vec::with_capacity(policy.enabled_platforms.len());
        for platform in &policy.enabled_platforms {
            let Ok(adapter) = self.registry.get(platform) else {
                debug!(platform = %platform, "no adapter registered");
                continue;
            };
            if adapter.requires_credential() {
                let Some(credential) = policy.platform_credentials.get(platform) else {
                    self.sink
                        .publish(EngineEvent::Error {
                            user_id: Some(user.as_str().to_string()),
                            message: format!("no credential configured for {platform}"),
                        })
                        .await;
                    continue;
                };
                // Verify the credential decrypts before queueing work behind it.
                if let Err(e) = self
                    .credentials
                    .with_decrypted(credential, &mut |_secret| {})
                    .await
                {
                    self.sink
                        .publish(EngineEvent::Error {
                            user_id: Some(user.as_str().to_string()),
                            message: format!("credential for {platform} unavailable: {e}"),
                        })
                        .await;
                    continue;
                }
            }
            usable.push(platform.clone());
        }
        usable
    }

    /// Apply policy filters, the per-platform cycle cap, and the quota cap,
    /// preserving rank order.
    fn select_candidates(
        &self,
        user: &UserId,
        policy: &AutomationPolicy,
        profile: &jobpilot_automaton::ApplicantProfile,
        ranked: Vec<RankedPosting>,
        permitted: u32,
    ) -> Vec<DispatchTask> {
        let cycle_cap = self.config.engine.per_platform_cycle_cap;
        let mut per_platform: HashMap<PlatformId, usize> = HashMap::new();
        let mut tasks = Vec::new();

        for candidate in ranked {
            if tasks.len() >= permitted as usize {
                break;
            }
            if !policy.accepts_posting(&candidate.posting, candidate.score) {
                continue;
            }
            let count = per_platform
                .entry(candidate.posting.platform.clone())
                .or_insert(0);
            if *count >= cycle_cap {
                continue;
            }
            *count += 1;

            tasks.push(DispatchTask {
                user_id: user.clone(),
                platform: candidate.posting.platform.clone(),
                source_id: candidate.posting.source_id.clone(),
                posting_url: candidate.posting.url.clone(),
                profile: profile.clone(),
            });
        }
        tasks
    }
}

fn to_record(posting: &JobPosting) -> PostingRecord {
    PostingRecord {
        platform: posting.platform.as_str().to_string(),
        source_id: posting.source_id.clone(),
        title: posting.title.clone(),
        company: posting.company.clone(),
        location: posting.location.clone(),
        description: posting.description.clone(),
        url: posting.url.clone(),
        compensation_min: posting
            .compensation
            .as_ref()
            .and_then(|c| c.min)
            .and_then(|v| i64::try_from(v).ok()),
        compensation_max: posting
            .compensation
            .as_ref()
            .and_then(|c| c.max)
            .and_then(|v| i64::try_from(v).ok()),
        compensation_currency: posting.compensation.as_ref().map(|c| c.currency.clone()),
        posted_at: posting.posted_at,
        tags: posting.tags.clone(),
    }
}
