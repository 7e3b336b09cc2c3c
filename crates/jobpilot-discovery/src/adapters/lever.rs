//! Adapter for Lever-hosted job boards.
//!
//! Lever exposes a public JSON API per site:
//! `https://api.lever.co/v0/postings/{site}?mode=json`.

use crate::adapter::{SearchQuery, SourceAdapter};
use crate::error::{DiscoveryError, Result};
use crate::posting::{normalize_tags, Compensation, JobPosting};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobpilot_core::PlatformId;
use serde::Deserialize;

const API_BASE: &str = "https://api.lever.co/v0/postings";

#[derive(Debug, Deserialize)]
struct LeverPosting {
    id: String,
    /// Job title
    text: String,
    #[serde(rename = "hostedUrl")]
    hosted_url: String,
    /// Epoch milliseconds
    #[serde(rename = "createdAt", default)]
    created_at: Option<i64>,
    #[serde(rename = "descriptionPlain", default)]
    description_plain: String,
    #[serde(default)]
    categories: LeverCategories,
    #[serde(rename = "salaryRange", default)]
    salary_range: Option<LeverSalaryRange>,
}

#[derive(Debug, Default, Deserialize)]
struct LeverCategories {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    commitment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeverSalaryRange {
    #[serde(default)]
    min: Option<u64>,
    #[serde(default)]
    max: Option<u64>,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Source adapter for one company's Lever site.
pub struct LeverAdapter {
    platform: PlatformId,
    site: String,
    company: String,
    client: reqwest::Client,
    api_base: String,
}

impl LeverAdapter {
    /// Create an adapter for the given site token and display company name.
    pub fn new(site: impl Into<String>, company: impl Into<String>) -> Result<Self> {
        Ok(Self {
            platform: PlatformId::new("lever").map_err(|e| DiscoveryError::Parse(e.to_string()))?,
            site: site.into(),
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

    fn to_posting(&self, raw: LeverPosting) -> JobPosting {
        let posted_at: Option<DateTime<Utc>> = raw
            .created_at
            .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms));

        let mut raw_tags = Vec::new();
        if let Some(team) = raw.categories.team {
            raw_tags.push(team);
        }
        if let Some(commitment) = raw.categories.commitment {
            raw_tags.push(commitment);
        }

        JobPosting {
            platform: self.platform.clone(),
            source_id: raw.id,
            title: raw.text,
            company: self.company.clone(),
            location: raw.categories.location.unwrap_or_default(),
            description: raw.description_plain,
            compensation: raw.salary_range.map(|s| Compensation {
                min: s.min,
                max: s.max,
                currency: s.currency,
            }),
            posted_at,
            url: raw.hosted_url,
            tags: normalize_tags(&raw_tags),
        }
    }
}

#[async_trait]
impl SourceAdapter for LeverAdapter {
    fn platform(&self) -> &PlatformId {
        &self.platform
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>> {
        let url = format!("{}/{}?mode=json", self.api_base, self.site);
        tracing::debug!(site = %self.site, "fetching lever site");

        let response: Vec<LeverPosting> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut postings: Vec<JobPosting> = response
            .into_iter()
            .map(|raw| self.to_posting(raw))
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
