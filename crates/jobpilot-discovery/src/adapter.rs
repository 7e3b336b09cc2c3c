//! The source adapter seam.
//!
//! Adding a platform means implementing [`SourceAdapter`] and registering
//! it, not editing a central conditional.

use crate::error::Result;
use crate::posting::JobPosting;
use async_trait::async_trait;
use jobpilot_core::PlatformId;
use serde::{Deserialize, Serialize};

/// A discovery search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Keywords matched against title and description
    pub keywords: Vec<String>,
    /// Optional location filter
    pub location: Option<String>,
    /// Maximum postings to return per source
    pub limit: usize,
}

impl SearchQuery {
    /// Convenience constructor.
    #[must_use]
    pub fn new(keywords: Vec<String>, location: Option<String>, limit: usize) -> Self {
        Self {
            keywords,
            location,
            limit,
        }
    }

    /// Case-insensitive match of any keyword against the given text.
    /// An empty keyword list matches everything.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .any(|kw| text.contains(&kw.to_lowercase()))
    }
}

/// Translates one external job board into the common [`JobPosting`] shape.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The platform this adapter serves.
    fn platform(&self) -> &PlatformId;

    /// Whether applying on this platform requires a stored credential.
    fn requires_credential(&self) -> bool {
        false
    }

    /// Run a search against the source and normalize the results.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_matches() {
        let query = SearchQuery::new(vec!["rust".to_string()], None, 10);
        assert!(query.matches("Senior Rust Engineer"));
        assert!(!query.matches("Java Developer"));
    }

    #[test]
    fn test_empty_keywords_match_all() {
        let query = SearchQuery::new(vec![], None, 10);
        assert!(query.matches("anything at all"));
    }
}
