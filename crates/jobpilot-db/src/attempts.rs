//! Application attempt operations.
//!
//! CRUD for the `application_attempts` table, which records every
//! application the dispatcher queues along with its state-machine history.
//! A partial unique index on the idempotency key makes attempt creation an
//! insert-or-skip: whichever worker inserts first owns the attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};

/// State of an application attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttemptState {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// A worker is driving the interaction.
    InProgress,
    /// Submitted and confirmed.
    Succeeded,
    /// Terminally failed.
    Failed,
    /// No form was found; consumed no quota.
    Skipped,
}

impl AttemptState {
    /// States that still hold the idempotency slot.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            AttemptState::Pending | AttemptState::InProgress | AttemptState::Succeeded
        )
    }

    /// Whether this attempt counts against the daily quota.
    pub fn consumes_quota(&self) -> bool {
        !matches!(self, AttemptState::Skipped)
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(AttemptState::Pending),
            "InProgress" => Some(AttemptState::InProgress),
            "Succeeded" => Some(AttemptState::Succeeded),
            "Failed" => Some(AttemptState::Failed),
            "Skipped" => Some(AttemptState::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Skipped => write!(f, "Skipped"),
        }
    }
}

/// One application attempt for one (user, job) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAttempt {
    /// Unique identifier.
    pub id: String,
    /// Applicant user id.
    pub user_id: String,
    /// Platform the posting came from.
    pub platform: String,
    /// Source-native job id.
    pub source_id: String,
    /// Page the automaton navigates to.
    pub posting_url: String,
    /// Derived from (user, platform, source job id).
    pub idempotency_key: String,
    /// Current state.
    pub state: AttemptState,
    /// Classified failure cause, for failed attempts.
    pub failure_reason: Option<String>,
    /// Free-text detail accompanying the outcome.
    pub detail: Option<String>,
    /// Confirmation text captured on success.
    pub confirmation: Option<String>,
    /// Interaction runs consumed so far (retries included).
    pub attempts_made: i64,
    /// When the attempt was queued.
    pub queued_at: DateTime<Utc>,
    /// When a worker first picked it up.
    pub started_at: Option<DateTime<Utc>>,
    /// When it reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Build the idempotency key for a (user, platform, source job) triple.
#[must_use]
pub fn idempotency_key(user_id: &str, platform: &str, source_id: &str) -> String {
    format!("{user_id}|{platform}|{source_id}")
}

/// Create a new attempt in `Pending` state.
///
/// Returns `Ok(None)` when a live attempt with the same idempotency key
/// already exists, which callers treat as "someone else got there first".
///
/// # Errors
/// Returns `DatabaseError` on any failure other than the unique-key skip.
pub async fn create_attempt(
    pool: &Pool<Sqlite>,
    user_id: &str,
    platform: &str,
    source_id: &str,
    posting_url: &str,
) -> Result<Option<ApplicationAttempt>> {
    let id = Uuid::new_v4().to_string();
    let key = idempotency_key(user_id, platform, source_id);
    let queued_at = Utc::now();

    let inserted = sqlx::query(
        "INSERT INTO application_attempts
             (id, user_id, platform, source_id, posting_url, idempotency_key,
              state, attempts_made, queued_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(platform)
    .bind(source_id)
    .bind(posting_url)
    .bind(&key)
    .bind(AttemptState::Pending.to_string())
    .bind(queued_at.to_rfc3339())
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => Ok(Some(ApplicationAttempt {
            id,
            user_id: user_id.to_string(),
            platform: platform.to_string(),
            source_id: source_id.to_string(),
            posting_url: posting_url.to_string(),
            idempotency_key: key,
            state: AttemptState::Pending,
            failure_reason: None,
            detail: None,
            confirmation: None,
            attempts_made: 0,
            queued_at,
            started_at: None,
            completed_at: None,
        })),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Move an attempt to `InProgress` and bump its run counter.
///
/// Called at the start of every interaction run, retries included, so
/// `attempts_made` reflects the true number of runs.
pub async fn mark_started(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE application_attempts
         SET state = ?, attempts_made = attempts_made + 1,
             started_at = COALESCE(started_at, ?)
         WHERE id = ?",
    )
    .bind(AttemptState::InProgress.to_string())
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound);
    }
    Ok(())
}

/// Record the terminal outcome of an attempt.
pub async fn record_outcome(
    pool: &Pool<Sqlite>,
    id: &str,
    state: AttemptState,
    failure_reason: Option<&str>,
    detail: Option<&str>,
    confirmation: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE application_attempts
         SET state = ?, failure_reason = ?, detail = ?, confirmation = ?,
             completed_at = ?
         WHERE id = ?",
    )
    .bind(state.to_string())
    .bind(failure_reason)
    .bind(detail)
    .bind(confirmation)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound);
    }
    Ok(())
}

/// Get an attempt by id.
pub async fn get_attempt(pool: &Pool<Sqlite>, id: &str) -> Result<ApplicationAttempt> {
    let row = sqlx::query(
        "SELECT id, user_id, platform, source_id, posting_url, idempotency_key,
                state, failure_reason, detail, confirmation, attempts_made,
                queued_at, started_at, completed_at
         FROM application_attempts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DatabaseError::NotFound)?;

    attempt_from_row(&row)
}

/// The live attempt (if any) holding the given idempotency key.
pub async fn get_live_by_key(
    pool: &Pool<Sqlite>,
    key: &str,
) -> Result<Option<ApplicationAttempt>> {
    let row = sqlx::query(
        "SELECT id, user_id, platform, source_id, posting_url, idempotency_key,
                state, failure_reason, detail, confirmation, attempts_made,
                queued_at, started_at, completed_at
         FROM application_attempts
         WHERE idempotency_key = ? AND state IN ('Pending', 'InProgress', 'Succeeded')",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(attempt_from_row).transpose()
}

/// Count the user's quota-consuming attempts queued at or after `since`.
///
/// `Skipped` attempts never count.
pub async fn count_quota_used(
    pool: &Pool<Sqlite>,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM application_attempts
         WHERE user_id = ? AND queued_at >= ? AND state != 'Skipped'",
    )
    .bind(user_id)
    .bind(since.to_rfc3339())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List a user's attempts, newest first, optionally filtered by state.
pub async fn list_attempts(
    pool: &Pool<Sqlite>,
    user_id: &str,
    state: Option<AttemptState>,
    limit: i64,
) -> Result<Vec<ApplicationAttempt>> {
    let rows = match state {
        Some(state) => {
            sqlx::query(
                "SELECT id, user_id, platform, source_id, posting_url, idempotency_key,
                        state, failure_reason, detail, confirmation, attempts_made,
                        queued_at, started_at, completed_at
                 FROM application_attempts
                 WHERE user_id = ? AND state = ?
                 ORDER BY queued_at DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(state.to_string())
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT id, user_id, platform, source_id, posting_url, idempotency_key,
                        state, failure_reason, detail, confirmation, attempts_made,
                        queued_at, started_at, completed_at
                 FROM application_attempts
                 WHERE user_id = ?
                 ORDER BY queued_at DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(attempt_from_row).collect()
}

fn attempt_from_row(row: &SqliteRow) -> Result<ApplicationAttempt> {
    let state_str: String = row.try_get("state")?;
    let state = AttemptState::parse(&state_str)
        .ok_or_else(|| DatabaseError::Decode(format!("unknown attempt state: {state_str}")))?;

    Ok(ApplicationAttempt {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        platform: row.try_get("platform")?,
        source_id: row.try_get("source_id")?,
        posting_url: row.try_get("posting_url")?,
        idempotency_key: row.try_get("idempotency_key")?,
        state,
        failure_reason: row.try_get("failure_reason")?,
        detail: row.try_get("detail")?,
        confirmation: row.try_get("confirmation")?,
        attempts_made: row.try_get("attempts_made")?,
        queued_at: parse_timestamp(&row.try_get::<String, _>("queued_at")?)?,
        started_at: row
            .try_get::<Option<String>, _>("started_at")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        completed_at: row
            .try_get::<Option<String>, _>("completed_at")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("bad timestamp {s}: {e}")))
}
