//! Concurrent discovery fan-out with dedup and ranking.

use crate::adapter::{SearchQuery, SourceAdapter};
use crate::posting::JobPosting;
use crate::registry::AdapterRegistry;
use crate::score::MatchScorer;
use futures::stream::{FuturesUnordered, StreamExt};
use jobpilot_core::{DiscoveryConfig, PlatformId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A posting paired with the match score used to rank it.
#[derive(Debug, Clone)]
pub struct RankedPosting {
    pub posting: JobPosting,
    pub score: f64,
}

/// Result of one aggregated search.
///
/// Always a valid value: when every adapter fails this carries an empty
/// posting list plus one warning per failure, never a hard error, so
/// downstream scheduling keeps operating.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Deduplicated postings in rank order
    pub postings: Vec<RankedPosting>,
    /// One entry per adapter that failed or timed out
    pub warnings: Vec<String>,
}

impl SearchOutcome {
    /// True if no adapter produced a result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

/// Fans a query out to enabled source adapters, merges and ranks results.
pub struct DiscoveryAggregator {
    registry: AdapterRegistry,
    scorer: Arc<dyn MatchScorer>,
    search_deadline: Duration,
    per_source_limit: usize,
}

impl DiscoveryAggregator {
    /// Create an aggregator over the given registry and scorer.
    #[must_use]
    pub fn new(
        registry: AdapterRegistry,
        scorer: Arc<dyn MatchScorer>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self {
            registry,
            scorer,
            search_deadline: Duration::from_secs(config.search_deadline_secs),
            per_source_limit: config.per_source_limit,
        }
    }

    /// Run one search across the enabled platforms.
    ///
    /// Each adapter runs concurrently under the overall deadline and fails
    /// in isolation. `resume_text` feeds the injected scorer; ordering is
    /// (score desc, posting recency desc), stable.
    pub async fn search(
        &self,
        query: &SearchQuery,
        enabled_platforms: &[PlatformId],
        resume_text: &str,
    ) -> SearchOutcome {
        let adapters = self.registry.get_enabled(enabled_platforms);
        let mut outcome = SearchOutcome::default();

        if adapters.is_empty() {
            outcome
                .warnings
                .push("no source adapters enabled".to_string());
            return outcome;
        }

        let mut futures = FuturesUnordered::new();
        for adapter in adapters {
            futures.push(Self::search_one(
                adapter,
                query.clone(),
                self.search_deadline,
                self.per_source_limit,
            ));
        }

        let mut merged: Vec<JobPosting> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        while let Some((platform, result)) = futures.next().await {
            match result {
                Ok(postings) => {
                    tracing::info!(platform = %platform, count = postings.len(), "adapter returned postings");
                    for posting in postings {
                        let key = posting.dedup_key();
                        if let Some(&idx) = seen.get(&key) {
                            // First-seen record wins; later duplicates only
                            // fill in missing optional fields
                            merged[idx].merge_missing_from(&posting);
                        } else {
                            seen.insert(key, merged.len());
                            merged.push(posting);
                        }
                    }
                }
                Err(warning) => {
                    tracing::warn!(platform = %platform, "{warning}");
                    outcome.warnings.push(warning);
                }
            }
        }

        let mut ranked: Vec<RankedPosting> = merged
            .into_iter()
            .map(|posting| {
                let score = self.scorer.score(resume_text, &posting.description);
                RankedPosting { posting, score }
            })
            .collect();

        // Stable: equal (score, recency) keeps merge order
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.posting.posted_at.cmp(&a.posting.posted_at))
        });

        outcome.postings = ranked;
        outcome
    }

    async fn search_one(
        adapter: Arc<dyn SourceAdapter>,
        query: SearchQuery,
        deadline: Duration,
        limit: usize,
    ) -> (PlatformId, std::result::Result<Vec<JobPosting>, String>) {
        let platform = adapter.platform().clone();

        let result = match tokio::time::timeout(deadline, adapter.search(&query)).await {
            Ok(Ok(mut postings)) => {
                postings.truncate(limit);
                Ok(postings)
            }
            Ok(Err(e)) => Err(format!("adapter '{platform}' failed: {e}")),
            Err(_) => Err(format!("adapter '{platform}' exceeded the search deadline")),
        };

        (platform, result)
    }
}
