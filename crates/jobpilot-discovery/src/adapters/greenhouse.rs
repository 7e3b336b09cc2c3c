//! Adapter for Greenhouse-hosted job boards.
//!
//! Greenhouse exposes a public JSON API per board:
//! `https://boards-api.greenhouse.io/v1/boards/{board}/jobs?content=true`.
//! The API has no server-side keyword search, so filtering happens here.

use crate::adapter::{SearchQuery, SourceAdapter};
use crate::error::{DiscoveryError, Result};
use crate::posting::{normalize_tags, JobPosting};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobpilot_core::PlatformId;
use serde::Deserialize;

const API_BASE: &str = "https://boards-api.greenhouse.io/v1/boards";

#[derive(Debug, Deserialize)]
struct BoardResponse {
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
struct BoardJob {
    id: u64,
    title: String,
    absolute_url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    location: Option<BoardLocation>,
    #[serde(default)]
    departments: Vec<BoardDepartment>,
}

#[derive(Debug, Deserialize)]
struct BoardLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BoardDepartment {
    name: String,
}

/// Source adapter for one company's Greenhouse board.
pub struct GreenhouseAdapter {
    platform: PlatformId,
    board: String,
    company: String,
    client: reqwest::Client,
    api_base: String,
}

impl GreenhouseAdapter {
    /// Create an adapter for the given board token and display company name.
    pub fn new(board: impl Into<String>, company: impl Into<String>) -> Result<Self> {
        Ok(Self {
            platform: PlatformId::new("greenhouse")
                .map_err(|e| DiscoveryError::Parse(e.to_string()))?,
            board: board.into(),
            company: company.into(),
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the adapter at a different API base (tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn to_posting(&self, job: BoardJob) -> JobPosting {
        let raw_tags: Vec<String> = job.departments.into_iter().map(|d| d.name).collect();

        JobPosting {
            platform: self.platform.clone(),
            source_id: job.id.to_string(),
            title: job.title,
            company: self.company.clone(),
            location: job.location.map(|l| l.name).unwrap_or_default(),
            description: job.content,
            compensation: None, // Greenhouse boards don't publish structured salary
            posted_at: job.updated_at,
            url: job.absolute_url,
            tags: normalize_tags(&raw_tags),
        }
    }
}

#[async_trait]
impl SourceAdapter for GreenhouseAdapter {
    fn platform(&self) -> &PlatformId {
        &self.platform
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>> {
        let url = format!("{}/{}/jobs?content=true", self.api_base, self.board);
        tracing::debug!(board = %self.board, "fetching greenhouse board");

        let response: BoardResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut postings: Vec<JobPosting> = response
            .jobs
            .into_iter()
            .map(|job| self.to_posting(job))
            .filter(|p| query.matches(&format!("{} {}", p.title, p.description)))
            .filter(|p| match &query.location {
                Some(loc) => p.location.to_lowercase().contains(&loc.to_lowercase()),
                None => true,
            })
            .collect();

        if query.limit > 0 {
            postings.truncate(query.limit);
        }

        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_board_response() {
        let raw = r#"{
            "jobs": [
                {
                    "id": 4277117,
                    "title": "Senior Rust Engineer",
                    "absolute_url": "https://boards.greenhouse.io/acme/jobs/4277117",
                    "content": "Build backend services in Rust.",
                    "updated_at": "2026-07-01T12:00:00Z",
                    "location": {"name": "Berlin, Germany"},
                    "departments": [{"name": "Engineering"}]
                }
            ],
            "meta": {"total": 1}
        }"#;

        let parsed: BoardResponse = serde_json::from_str(raw).expect("parse board response");
        assert_eq!(parsed.jobs.len(), 1);
        assert_eq!(parsed.jobs[0].title, "Senior Rust Engineer");
    }

    #[test]
    fn test_to_posting() {
        let adapter = GreenhouseAdapter::new("acme", "Acme Inc").expect("create adapter");
        let job = BoardJob {
            id: 42,
            title: "Rust Engineer".to_string(),
            absolute_url: "https://boards.greenhouse.io/acme/jobs/42".to_string(),
            content: "desc".to_string(),
            updated_at: None,
            location: None,
            departments: vec![BoardDepartment {
                name: " Engineering ".to_string(),
            }],
        };

        let posting = adapter.to_posting(job);
        assert_eq!(posting.source_id, "42");
        assert_eq!(posting.company, "Acme Inc");
        assert_eq!(posting.tags, vec!["engineering"]);
    }
}
