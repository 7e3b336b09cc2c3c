//! The common job posting shape every source adapter normalizes into.

use chrono::{DateTime, Utc};
use jobpilot_core::PlatformId;
use serde::{Deserialize, Serialize};

/// Structured compensation range, when the source exposes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    /// Lower bound in the posting's currency
    pub min: Option<u64>,
    /// Upper bound in the posting's currency
    pub max: Option<u64>,
    /// ISO currency code, e.g. "USD"
    pub currency: String,
}

/// A job posting normalized from one source platform.
///
/// Postings are immutable once fetched; a re-scrape produces a superseding
/// record instead of mutating this one. Identity for dedup within one search
/// is (normalized title, company, location); identity across scrapes is
/// (platform, `source_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    /// Source platform this posting came from
    pub platform: PlatformId,
    /// Source-native posting identifier
    pub source_id: String,
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Location string as published by the source
    pub location: String,
    /// Full or summary description
    pub description: String,
    /// Structured compensation, when published
    pub compensation: Option<Compensation>,
    /// When the posting was published, when known
    pub posted_at: Option<DateTime<Utc>>,
    /// Canonical URL of the posting
    pub url: String,
    /// Normalized skill tags
    pub tags: Vec<String>,
}

impl JobPosting {
    /// Cross-source dedup key: normalized title + company + location.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            normalize(&self.title),
            normalize(&self.company),
            normalize(&self.location)
        )
    }

    /// Merge optional fields from a later duplicate: fill what this record
    /// is missing, never overwrite populated fields.
    pub fn merge_missing_from(&mut self, other: &JobPosting) {
        if self.compensation.is_none() {
            self.compensation = other.compensation.clone();
        }
        if self.posted_at.is_none() {
            self.posted_at = other.posted_at;
        }
        if self.description.is_empty() {
            self.description = other.description.clone();
        }
        for tag in &other.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
    }
}

/// Normalize a free-text field for dedup comparison: lowercase, collapse
/// whitespace, strip punctuation.
#[must_use]
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize raw skill tags: lowercase, trim, drop empties and duplicates.
#[must_use]
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
