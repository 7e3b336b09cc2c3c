//! Worker-pool dispatch tests: retry with backoff, idempotent creation.

mod common;

use std::sync::Arc;

use common::{build_dispatcher, test_profile, ScriptedDriver};
use jobpilot_core::types::{PlatformId, UserId};
use jobpilot_db::attempts::list_attempts;
use jobpilot_db::AttemptState;
use jobpilot_engine::DispatchTask;
use tokio_util::sync::CancellationToken;

fn make_task(user: &UserId, source_id: &str) -> DispatchTask {
    DispatchTask {
        user_id: user.clone(),
        platform: PlatformId::new("example-board").unwrap(),
        source_id: source_id.to_string(),
        posting_url: format!("https://jobs.example.com/example-board/{source_id}"),
        profile: test_profile(),
    }
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let driver = Arc::new(ScriptedDriver {
        failing_navigations: 1,
        ..ScriptedDriver::default()
    });
    let (dispatcher, db, _sink) = build_dispatcher(driver.clone()).await;
    let user = UserId::generate();
    let task = make_task(&user, "j1");
    let url = task.posting_url.clone();

    let report = dispatcher
        .dispatch(vec![task], &CancellationToken::new())
        .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(driver.navigations(&url), 2, "one failure, one retry");

    let attempts = list_attempts(db.pool(), user.as_str(), None, 10)
        .await
        .expect("list");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].state, AttemptState::Succeeded);
    assert_eq!(attempts[0].attempts_made, 2);
}

#[tokio::test]
async fn test_retry_bound_is_three_runs() {
    let driver = Arc::new(ScriptedDriver {
        failing_navigations: 100,
        ..ScriptedDriver::default()
    });
    let (dispatcher, db, _sink) = build_dispatcher(driver.clone()).await;
    let user = UserId::generate();
    let task = make_task(&user, "j1");
    let url = task.posting_url.clone();

    let report = dispatcher
        .dispatch(vec![task], &CancellationToken::new())
        .await;

    assert_eq!(report.failed, 1);
    assert_eq!(driver.navigations(&url), 3, "three runs, no more");

    let attempts = list_attempts(db.pool(), user.as_str(), None, 10)
        .await
        .expect("list");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].state, AttemptState::Failed);
    assert_eq!(attempts[0].attempts_made, 3);
    assert_eq!(attempts[0].failure_reason.as_deref(), Some("navigation"));
}

#[tokio::test]
async fn test_concurrent_attempts_submit_on_their_own_pages() {
    let driver = Arc::new(ScriptedDriver::default());
    let (dispatcher, db, _sink) = build_dispatcher(driver.clone()).await;
    let user = UserId::generate();
    let task_a = make_task(&user, "a");
    let task_b = make_task(&user, "b");
    let url_a = task_a.posting_url.clone();
    let url_b = task_b.posting_url.clone();

    // Both tasks run at once on the two-worker pool; each attempt's fills
    // and submit must land on the page it navigated, not the one the other
    // worker navigated last.
    let report = dispatcher
        .dispatch(vec![task_a, task_b], &CancellationToken::new())
        .await;

    assert_eq!(report.succeeded, 2);

    let mut submitted = driver.submitted_urls();
    submitted.sort();
    assert_eq!(submitted, vec![url_a, url_b], "one submit per posting");

    let attempts = list_attempts(db.pool(), user.as_str(), None, 10)
        .await
        .expect("list");
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.state == AttemptState::Succeeded));
}

#[tokio::test]
async fn test_duplicate_tasks_create_one_attempt() {
    let driver = Arc::new(ScriptedDriver::default());
    let (dispatcher, db, _sink) = build_dispatcher(driver).await;
    let user = UserId::generate();
    let task = make_task(&user, "j1");

    let report = dispatcher
        .dispatch(vec![task.clone(), task], &CancellationToken::new())
        .await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.deduped, 1);

    let attempts = list_attempts(db.pool(), user.as_str(), None, 10)
        .await
        .expect("list");
    assert_eq!(attempts.len(), 1, "exactly one row for the pair");
}

#[tokio::test]
async fn test_cancellation_stops_queueing() {
    let driver = Arc::new(ScriptedDriver::default());
    let (dispatcher, db, _sink) = build_dispatcher(driver).await;
    let user = UserId::generate();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let tasks = vec![make_task(&user, "j1"), make_task(&user, "j2")];
    let report = dispatcher.dispatch(tasks, &cancel).await;

    assert_eq!(report.attempted, 0);
    let attempts = list_attempts(db.pool(), user.as_str(), None, 10)
        .await
        .expect("list");
    assert!(attempts.is_empty());
}
