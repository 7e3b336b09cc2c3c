//! End-to-end runs of the interaction automaton against a scripted driver.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jobpilot_automaton::{
    ApplicantProfile, AttemptOutcome, AttemptRequest, FailureReason, InteractionAutomaton,
    SkipReason,
};
use jobpilot_core::config::{BrowserConfig, RateConfig, StealthConfig};
use jobpilot_core::types::PlatformId;
use jobpilot_stealth::{
    JitterPolicy, PageDriver, PageHandle, RateLimiter, Result, SessionProfile, StealthError,
    StealthSessionPool,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct DriverState {
    html: String,
    present: HashSet<String>,
    /// Selectors that appear after a given selector is clicked.
    appear_after_click: HashMap<String, String>,
    texts: HashMap<String, String>,
    fail_navigation: bool,
    filled: Vec<(String, String)>,
    clicked: Vec<String>,
}

#[derive(Default)]
struct FakeDriver {
    state: Arc<Mutex<DriverState>>,
}

impl FakeDriver {
    fn with_state(state: DriverState) -> Self {
        FakeDriver {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn filled(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().filled.clone()
    }

    fn clicked(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.clone()
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn open_page(&self, _profile: &SessionProfile) -> Result<Box<dyn PageHandle>> {
        Ok(Box::new(FakePage {
            state: self.state.clone(),
        }))
    }
}

struct FakePage {
    state: Arc<Mutex<DriverState>>,
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        if state.fail_navigation {
            return Err(StealthError::NavigationError(format!(
                "unreachable: {url}"
            )));
        }
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .filled
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.clicked.push(selector.to_string());
        if let Some(appears) = state.appear_after_click.get(selector).cloned() {
            state.present.insert(appears);
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout_ms: u64) -> Result<()> {
        let state = self.state.lock().unwrap();
        // Grouped selectors match if any member is present.
        if selector
            .split(',')
            .map(str::trim)
            .any(|s| state.present.contains(s))
        {
            Ok(())
        } else {
            Err(StealthError::SelectorNotFound(selector.to_string()))
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        for part in selector.split(',').map(str::trim) {
            if let Some(text) = state.texts.get(part) {
                return Ok(text.clone());
            }
        }
        Err(StealthError::SelectorNotFound(selector.to_string()))
    }

    async fn page_content(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().html.clone())
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<()> {
        Ok(())
    }
}

fn automaton() -> InteractionAutomaton {
    let stealth = StealthConfig {
        pool_size: 2,
        max_profile_uses: 5,
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
    InteractionAutomaton::new(
        StealthSessionPool::new(&stealth),
        Arc::new(RateLimiter::new(&rate)),
        JitterPolicy::disabled(),
        &browser,
    )
}

fn request(platform: &str) -> AttemptRequest {
    AttemptRequest {
        url: "https://jobs.example.com/postings/42/apply".to_string(),
        platform: PlatformId::new(platform).unwrap(),
        profile: ApplicantProfile {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("+1-555-0100".to_string()),
            location: None,
            linkedin_url: None,
            resume_path: None,
            resume_text: "analytical engines".to_string(),
            cover_letter: Some("I would like to apply.".to_string()),
        },
    }
}

const GENERIC_FORM_HTML: &str = r#"
    <form action="/apply" method="post">
      <input type="text" name="first_name" />
      <input type="text" name="last_name" />
      <input type="email" name="email" />
      <input type="submit" value="Apply" />
    </form>
"#;

#[tokio::test]
async fn test_generic_form_success() {
    let mut state = DriverState {
        html: GENERIC_FORM_HTML.to_string(),
        ..DriverState::default()
    };
    state.appear_after_click.insert(
        "input[type=\"submit\"]".to_string(),
        "[class*=\"confirmation\"]".to_string(),
    );
    state.texts.insert(
        "[class*=\"confirmation\"]".to_string(),
        "Thanks for applying!".to_string(),
    );
    let driver = FakeDriver::with_state(state);

    let outcome = automaton()
        .run(&driver, &request("example-board"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        AttemptOutcome::Succeeded {
            confirmation: Some("Thanks for applying!".to_string())
        }
    );
    let filled = driver.filled();
    assert_eq!(filled.len(), 3);
    assert!(filled
        .iter()
        .any(|(s, v)| s == "[name=\"email\"]" && v == "ada@example.com"));
    assert_eq!(driver.clicked(), vec!["input[type=\"submit\"]".to_string()]);
}

#[tokio::test]
async fn test_platform_signature_preferred() {
    let mut state = DriverState::default();
    for selector in [
        "#application_form",
        "#first_name",
        "#last_name",
        "#email",
        "#phone",
        "#cover_letter_text",
    ] {
        state.present.insert(selector.to_string());
    }
    state.appear_after_click.insert(
        "#submit_app".to_string(),
        "#application_confirmation".to_string(),
    );
    let driver = FakeDriver::with_state(state);

    let outcome = automaton()
        .run(&driver, &request("greenhouse"), &CancellationToken::new())
        .await;

    assert!(outcome.is_success());
    let filled = driver.filled();
    assert!(filled.iter().any(|(s, _)| s == "#first_name"));
    assert!(filled.iter().any(|(s, _)| s == "#cover_letter_text"));
    assert_eq!(driver.clicked(), vec!["#submit_app".to_string()]);
}

#[tokio::test]
async fn test_no_form_is_skipped() {
    let driver = FakeDriver::with_state(DriverState {
        html: "<html><body><h1>Senior Rust Engineer</h1></body></html>".to_string(),
        ..DriverState::default()
    });

    let outcome = automaton()
        .run(&driver, &request("example-board"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        AttemptOutcome::Skipped {
            reason: SkipReason::NoForm
        }
    );
    assert!(driver.filled().is_empty());
    assert!(driver.clicked().is_empty());
}

#[tokio::test]
async fn test_challenge_wall_fails_unresolved() {
    let mut state = DriverState {
        html: "<html><body>Checking your browser</body></html>".to_string(),
        ..DriverState::default()
    };
    state.present.insert(".g-recaptcha".to_string());
    let driver = FakeDriver::with_state(state);

    let outcome = automaton()
        .run(&driver, &request("example-board"), &CancellationToken::new())
        .await;

    match outcome {
        AttemptOutcome::Failed { reason, .. } => {
            assert_eq!(reason, FailureReason::ChallengeUnresolved);
        }
        other => panic!("expected challenge failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_confirmation_is_unverified() {
    let driver = FakeDriver::with_state(DriverState {
        html: GENERIC_FORM_HTML.to_string(),
        ..DriverState::default()
    });

    let outcome = automaton()
        .run(&driver, &request("example-board"), &CancellationToken::new())
        .await;

    match outcome {
        AttemptOutcome::Failed { reason, .. } => {
            assert_eq!(reason, FailureReason::Unverified);
            assert!(!reason.is_transient());
        }
        other => panic!("expected unverified failure, got {other:?}"),
    }
    // The submit was clicked; only the confirmation never appeared.
    assert_eq!(driver.clicked(), vec!["input[type=\"submit\"]".to_string()]);
}

#[tokio::test]
async fn test_navigation_failure() {
    let driver = FakeDriver::with_state(DriverState {
        fail_navigation: true,
        ..DriverState::default()
    });

    let outcome = automaton()
        .run(&driver, &request("example-board"), &CancellationToken::new())
        .await;

    match outcome {
        AttemptOutcome::Failed { reason, .. } => {
            assert_eq!(reason, FailureReason::Navigation);
        }
        other => panic!("expected navigation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_before_start() {
    let driver = FakeDriver::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = automaton()
        .run(&driver, &request("example-board"), &cancel)
        .await;

    match outcome {
        AttemptOutcome::Failed { reason, .. } => {
            assert_eq!(reason, FailureReason::Canceled);
        }
        other => panic!("expected canceled failure, got {other:?}"),
    }
    assert!(driver.clicked().is_empty());
}
