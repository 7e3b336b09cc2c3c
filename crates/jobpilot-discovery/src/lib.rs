//! Multi-source job discovery for JobPilot.
//!
//! Fans a search query out to every enabled source adapter concurrently,
//! normalizes the results into the common [`JobPosting`] shape, deduplicates
//! across sources, and ranks by injected match score and recency.
//!
//! Adapters fail independently: one broken source produces a warning, never
//! an aborted search.

pub mod adapter;
pub mod adapters;
pub mod aggregator;
pub mod error;
pub mod posting;
pub mod registry;
pub mod score;

pub use adapter::{SearchQuery, SourceAdapter};
pub use aggregator::{DiscoveryAggregator, RankedPosting, SearchOutcome};
pub use error::{DiscoveryError, Result};
pub use posting::{Compensation, JobPosting};
pub use registry::AdapterRegistry;
pub use score::{KeywordOverlapScorer, MatchScorer};
