//! Discovered posting storage.
//!
//! Posting rows are immutable snapshots. When a re-scrape returns different
//! content for the same (platform, source id), the old row is marked
//! superseded and a new revision is inserted; queries for "the posting"
//! always return the current revision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};

/// A stored job posting revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPosting {
    /// Row identifier.
    pub id: String,
    /// Platform the posting came from.
    pub platform: String,
    /// Source-native job id.
    pub source_id: String,
    /// Revision number, starting at 1.
    pub revision: i64,
    /// Job title as published.
    pub title: String,
    /// Hiring company.
    pub company: String,
    /// Location string as published.
    pub location: String,
    /// Full or summary description.
    pub description: String,
    /// Canonical posting URL.
    pub url: String,
    /// Lower compensation bound, when published.
    pub compensation_min: Option<i64>,
    /// Upper compensation bound, when published.
    pub compensation_max: Option<i64>,
    /// ISO currency code for the compensation range.
    pub compensation_currency: Option<String>,
    /// When the posting was published, when known.
    pub posted_at: Option<DateTime<Utc>>,
    /// Normalized skill tags, stored as a JSON array.
    pub tags: Vec<String>,
    /// When this revision was recorded.
    pub discovered_at: DateTime<Utc>,
}

/// Content fields of a posting, before storage assigns identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingRecord {
    /// Platform the posting came from.
    pub platform: String,
    /// Source-native job id.
    pub source_id: String,
    /// Job title as published.
    pub title: String,
    /// Hiring company.
    pub company: String,
    /// Location string as published.
    pub location: String,
    /// Full or summary description.
    pub description: String,
    /// Canonical posting URL.
    pub url: String,
    /// Lower compensation bound, when published.
    pub compensation_min: Option<i64>,
    /// Upper compensation bound, when published.
    pub compensation_max: Option<i64>,
    /// ISO currency code for the compensation range.
    pub compensation_currency: Option<String>,
    /// When the posting was published, when known.
    pub posted_at: Option<DateTime<Utc>>,
    /// Normalized skill tags.
    pub tags: Vec<String>,
}

impl StoredPosting {
    fn same_content(&self, record: &PostingRecord) -> bool {
        self.title == record.title
            && self.company == record.company
            && self.location == record.location
            && self.description == record.description
            && self.url == record.url
            && self.compensation_min == record.compensation_min
            && self.compensation_max == record.compensation_max
            && self.compensation_currency == record.compensation_currency
            && self.posted_at == record.posted_at
            && self.tags == record.tags
    }
}

/// Store a scraped posting.
///
/// Inserts revision 1 for a new (platform, source id), returns the existing
/// row untouched when content is unchanged, and otherwise supersedes the
/// current revision with a new one.
pub async fn store_posting(pool: &Pool<Sqlite>, record: &PostingRecord) -> Result<StoredPosting> {
    let current = current_posting(pool, &record.platform, &record.source_id).await?;

    if let Some(existing) = &current {
        if existing.same_content(record) {
            return Ok(existing.clone());
        }
    }

    let revision = current.as_ref().map_or(1, |p| p.revision + 1);
    if let Some(existing) = &current {
        sqlx::query("UPDATE job_postings SET superseded = 1 WHERE id = ?")
            .bind(&existing.id)
            .execute(pool)
            .await?;
    }

    let id = Uuid::new_v4().to_string();
    let discovered_at = Utc::now();
    let tags_json = serde_json::to_string(&record.tags)
        .map_err(|e| DatabaseError::Decode(format!("tags serialization: {e}")))?;

    sqlx::query(
        "INSERT INTO job_postings
             (id, platform, source_id, revision, superseded, title, company,
              location, description, url, compensation_min, compensation_max,
              compensation_currency, posted_at, tags, discovered_at)
         VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&record.platform)
    .bind(&record.source_id)
    .bind(revision)
    .bind(&record.title)
    .bind(&record.company)
    .bind(&record.location)
    .bind(&record.description)
    .bind(&record.url)
    .bind(record.compensation_min)
    .bind(record.compensation_max)
    .bind(&record.compensation_currency)
    .bind(record.posted_at.map(|dt| dt.to_rfc3339()))
    .bind(&tags_json)
    .bind(discovered_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(StoredPosting {
        id,
        platform: record.platform.clone(),
        source_id: record.source_id.clone(),
        revision,
        title: record.title.clone(),
        company: record.company.clone(),
        location: record.location.clone(),
        description: record.description.clone(),
        url: record.url.clone(),
        compensation_min: record.compensation_min,
        compensation_max: record.compensation_max,
        compensation_currency: record.compensation_currency.clone(),
        posted_at: record.posted_at,
        tags: record.tags.clone(),
        discovered_at,
    })
}

/// The current (non-superseded) revision of a posting, if any.
pub async fn current_posting(
    pool: &Pool<Sqlite>,
    platform: &str,
    source_id: &str,
) -> Result<Option<StoredPosting>> {
    let row = sqlx::query(
        "SELECT id, platform, source_id, revision, title, company, location,
                description, url, compensation_min, compensation_max,
                compensation_currency, posted_at, tags, discovered_at
         FROM job_postings
         WHERE platform = ? AND source_id = ? AND superseded = 0",
    )
    .bind(platform)
    .bind(source_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(posting_from_row).transpose()
}

/// All revisions of a posting, oldest first.
pub async fn posting_history(
    pool: &Pool<Sqlite>,
    platform: &str,
    source_id: &str,
) -> Result<Vec<StoredPosting>> {
    let rows = sqlx::query(
        "SELECT id, platform, source_id, revision, title, company, location,
                description, url, compensation_min, compensation_max,
                compensation_currency, posted_at, tags, discovered_at
         FROM job_postings
         WHERE platform = ? AND source_id = ?
         ORDER BY revision ASC",
    )
    .bind(platform)
    .bind(source_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(posting_from_row).collect()
}

fn posting_from_row(row: &SqliteRow) -> Result<StoredPosting> {
    let tags_json: String = row.try_get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| DatabaseError::Decode(format!("tags deserialization: {e}")))?;

    Ok(StoredPosting {
        id: row.try_get("id")?,
        platform: row.try_get("platform")?,
        source_id: row.try_get("source_id")?,
        revision: row.try_get("revision")?,
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        compensation_min: row.try_get("compensation_min")?,
        compensation_max: row.try_get("compensation_max")?,
        compensation_currency: row.try_get("compensation_currency")?,
        posted_at: row
            .try_get::<Option<String>, _>("posted_at")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        tags,
        discovered_at: parse_timestamp(&row.try_get::<String, _>("discovered_at")?)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("bad timestamp {s}: {e}")))
}
