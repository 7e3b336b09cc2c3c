//! Shared fakes for engine integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jobpilot_automaton::{ApplicantProfile, InteractionAutomaton};
use jobpilot_core::config::{AppConfig, BrowserConfig, RateConfig, StealthConfig};
use jobpilot_core::types::{CredentialId, PlatformId, UserId};
use jobpilot_db::Database;
use jobpilot_discovery::{
    AdapterRegistry, DiscoveryAggregator, DiscoveryError, JobPosting, KeywordOverlapScorer,
    SearchQuery, SourceAdapter,
};
use jobpilot_engine::{
    AutomationPolicy, CredentialStore, Engine, EngineEvent, NotificationSink, PolicyProvider,
    ProfileProvider, TaskDispatcher,
};
use jobpilot_stealth::{
    JitterPolicy, PageDriver, PageHandle, RateLimiter, Result as StealthResult, SessionProfile,
    StealthError, StealthSessionPool,
};

/// Adapter serving a fixed list of postings.
pub struct FixedAdapter {
    platform: PlatformId,
    postings: Vec<JobPosting>,
    needs_credential: bool,
}

impl FixedAdapter {
    pub fn new(platform: &str, postings: Vec<JobPosting>) -> Self {
        Self {
            platform: PlatformId::new(platform).unwrap(),
            postings,
            needs_credential: false,
        }
    }

    pub fn requiring_credential(mut self) -> Self {
        self.needs_credential = true;
        self
    }
}

#[async_trait]
impl SourceAdapter for FixedAdapter {
    fn platform(&self) -> &PlatformId {
        &self.platform
    }

    fn requires_credential(&self) -> bool {
        self.needs_credential
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<JobPosting>, DiscoveryError> {
        Ok(self.postings.clone())
    }
}

/// Driver whose pages always carry a simple fillable form.
///
/// Each opened page tracks its own current URL, so concurrent attempts see
/// only their own navigation. `failing_navigations` makes the first N
/// navigations fail, for retry tests. Navigations are counted per posting
/// URL.
#[derive(Default)]
pub struct ScriptedDriver {
    pub failing_navigations: u32,
    /// URLs whose pages carry no form at all.
    pub formless_urls: HashSet<String>,
    pub state: Arc<Mutex<ScriptedState>>,
}

#[derive(Default)]
pub struct ScriptedState {
    nav_counts: HashMap<String, u32>,
    confirmed: HashSet<String>,
    /// URL each submit click landed on, in click order.
    submitted: Vec<String>,
}

impl ScriptedDriver {
    pub fn navigations(&self, url: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .nav_counts
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn submitted_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }
}

const FORM_HTML: &str = r#"
    <form action="/apply" method="post">
      <input type="text" name="first_name" />
      <input type="text" name="last_name" />
      <input type="email" name="email" />
      <input type="submit" value="Apply" />
    </form>
"#;

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn open_page(&self, _profile: &SessionProfile) -> StealthResult<Box<dyn PageHandle>> {
        Ok(Box::new(ScriptedPage {
            state: self.state.clone(),
            failing_navigations: self.failing_navigations,
            formless_urls: self.formless_urls.clone(),
            current_url: Mutex::new(String::new()),
        }))
    }
}

struct ScriptedPage {
    state: Arc<Mutex<ScriptedState>>,
    failing_navigations: u32,
    formless_urls: HashSet<String>,
    current_url: Mutex<String>,
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn navigate(&self, url: &str) -> StealthResult<()> {
        let failing = self.failing_navigations;
        {
            let mut state = self.state.lock().unwrap();
            let count = state.nav_counts.entry(url.to_string()).or_insert(0);
            *count += 1;
            if *count <= failing {
                return Err(StealthError::NavigationError(format!(
                    "transient failure for {url}"
                )));
            }
        }
        *self.current_url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn fill_field(&self, _selector: &str, _value: &str) -> StealthResult<()> {
        // Yield so concurrent attempts interleave mid-fill.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn click(&self, selector: &str) -> StealthResult<()> {
        if selector.contains("submit") {
            let url = self.current_url.lock().unwrap().clone();
            let mut state = self.state.lock().unwrap();
            state.submitted.push(url.clone());
            state.confirmed.insert(url);
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout_ms: u64) -> StealthResult<()> {
        if selector.contains("confirmation") {
            let url = self.current_url.lock().unwrap().clone();
            if self.state.lock().unwrap().confirmed.contains(&url) {
                return Ok(());
            }
        }
        Err(StealthError::SelectorNotFound(selector.to_string()))
    }

    async fn extract_text(&self, _selector: &str) -> StealthResult<String> {
        Ok("Application received".to_string())
    }

    async fn page_content(&self) -> StealthResult<String> {
        let url = self.current_url.lock().unwrap().clone();
        if self.formless_urls.contains(&url) {
            Ok("<html><body><h1>Job description only</h1></body></html>".to_string())
        } else {
            Ok(FORM_HTML.to_string())
        }
    }

    async fn scroll_by(&self, _pixels: i64) -> StealthResult<()> {
        Ok(())
    }
}

/// Sink that records every published event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| {
                serde_json::to_value(e).unwrap()["type"]
                    .as_str()
                    .unwrap()
                    .eq(event_type)
            })
            .count()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Static providers serving one user with a fixed policy and profile.
pub struct StaticProviders {
    pub user: UserId,
    pub policy: AutomationPolicy,
}

#[async_trait]
impl PolicyProvider for StaticProviders {
    async fn active_users(&self) -> jobpilot_engine::Result<Vec<UserId>> {
        Ok(vec![self.user.clone()])
    }

    async fn policy_for(&self, _user: &UserId) -> jobpilot_engine::Result<AutomationPolicy> {
        Ok(self.policy.clone())
    }
}

#[async_trait]
impl ProfileProvider for StaticProviders {
    async fn application_data(&self, _user: &UserId) -> jobpilot_engine::Result<ApplicantProfile> {
        Ok(test_profile())
    }
}

/// Credential store holding no credentials.
pub struct EmptyCredentialStore;

#[async_trait]
impl CredentialStore for EmptyCredentialStore {
    async fn with_decrypted(
        &self,
        id: &CredentialId,
        _use_secret: &mut (dyn FnMut(&str) + Send),
    ) -> jobpilot_engine::Result<()> {
        Err(jobpilot_engine::EngineError::Credential(format!(
            "no credential stored under {id}"
        )))
    }
}

pub fn test_profile() -> ApplicantProfile {
    ApplicantProfile {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: Some("+1-555-0100".to_string()),
        location: None,
        linkedin_url: None,
        resume_path: None,
        resume_text: "rust tokio distributed systems".to_string(),
        cover_letter: None,
    }
}

pub fn posting(platform: &str, source_id: &str, title: &str) -> JobPosting {
    JobPosting {
        platform: PlatformId::new(platform).unwrap(),
        source_id: source_id.to_string(),
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        description: "Rust systems work with tokio.".to_string(),
        compensation: None,
        posted_at: None,
        url: format!("https://jobs.example.com/{platform}/{source_id}"),
        tags: vec!["rust".to_string()],
    }
}

/// Policy that is always inside its window: every weekday, full day.
pub fn always_open_policy(max_per_day: u32, platforms: &[&str]) -> AutomationPolicy {
    use chrono::{NaiveTime, Weekday};
    AutomationPolicy {
        enabled: true,
        max_attempts_per_day: max_per_day,
        window_start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        window_end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        weekdays: vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ],
        enabled_platforms: platforms
            .iter()
            .map(|p| PlatformId::new(*p).unwrap())
            .collect(),
        ..AutomationPolicy::default()
    }
}

/// Dispatcher over in-memory persistence and a scripted driver, for tests
/// that exercise the worker pool directly.
pub async fn build_dispatcher(
    driver: Arc<ScriptedDriver>,
) -> (TaskDispatcher, Database, Arc<RecordingSink>) {
    let mut engine_config = jobpilot_core::config::EngineConfig::default();
    engine_config.worker_count = 2;
    engine_config.retry_base_delay_ms = 5;

    let db = Database::in_memory().await.expect("open in-memory database");
    let sink = Arc::new(RecordingSink::default());

    let stealth = StealthConfig {
        pool_size: 2,
        max_profile_uses: 10,
        min_field_delay_ms: 0,
        max_field_delay_ms: 1,
        scroll_probability: 0.0,
        shuffle_fields: false,
    };
    let rate = RateConfig {
        initial_delay_ms: 1,
        max_delay_ms: 10,
        growth_factor: 1.5,
        decay_factor: 0.9,
    };
    let browser = BrowserConfig {
        headless: true,
        navigation_timeout_secs: 5,
        verify_timeout_secs: 1,
        challenge_wait_secs: 1,
    };
    let automaton = InteractionAutomaton::new(
        StealthSessionPool::new(&stealth),
        Arc::new(RateLimiter::new(&rate)),
        JitterPolicy::disabled(),
        &browser,
    );

    let dispatcher = TaskDispatcher::new(
        db.clone(),
        Arc::new(automaton),
        driver,
        sink.clone(),
        &engine_config,
    );
    (dispatcher, db, sink)
}

pub struct Harness {
    pub engine: Engine,
    pub db: Database,
    pub driver: Arc<ScriptedDriver>,
    pub sink: Arc<RecordingSink>,
    pub user: UserId,
}

/// Build an engine over in-memory persistence, fake adapters, and a
/// scripted driver. `retry_base_delay_ms` is kept tiny so retry tests run
/// fast.
/// Installs a test subscriber once; respects `RUST_LOG` when set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn build_harness(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    driver: Arc<ScriptedDriver>,
    policy: AutomationPolicy,
) -> Harness {
    init_tracing();

    let mut config = AppConfig::default();
    config.engine.worker_count = 2;
    config.engine.retry_base_delay_ms = 5;
    config.discovery.search_deadline_secs = 5;

    let db = Database::in_memory().await.expect("open in-memory database");
    let sink = Arc::new(RecordingSink::default());
    let user = UserId::generate();

    let registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    let aggregator = DiscoveryAggregator::new(
        registry.clone(),
        Arc::new(KeywordOverlapScorer),
        &config.discovery,
    );

    let stealth = StealthConfig {
        pool_size: 2,
        max_profile_uses: 10,
        min_field_delay_ms: 0,
        max_field_delay_ms: 1,
        scroll_probability: 0.0,
        shuffle_fields: false,
    };
    let rate = RateConfig {
        initial_delay_ms: 1,
        max_delay_ms: 10,
        growth_factor: 1.5,
        decay_factor: 0.9,
    };
    let browser = BrowserConfig {
        headless: true,
        navigation_timeout_secs: 5,
        verify_timeout_secs: 1,
        challenge_wait_secs: 1,
    };
    let automaton = InteractionAutomaton::new(
        StealthSessionPool::new(&stealth),
        Arc::new(RateLimiter::new(&rate)),
        JitterPolicy::disabled(),
        &browser,
    );

    let dispatcher = TaskDispatcher::new(
        db.clone(),
        Arc::new(automaton),
        driver.clone(),
        sink.clone(),
        &config.engine,
    );

    let providers = Arc::new(StaticProviders {
        user: user.clone(),
        policy,
    });

    let engine = Engine::new(
        config,
        db.clone(),
        registry,
        aggregator,
        dispatcher,
        providers.clone(),
        providers,
        Arc::new(EmptyCredentialStore),
        sink.clone(),
    );

    Harness {
        engine,
        db,
        driver,
        sink,
        user,
    }
}
