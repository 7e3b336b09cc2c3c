//! In-memory source adapter registry.

use crate::adapter::SourceAdapter;
use crate::error::{DiscoveryError, Result};
use jobpilot_core::PlatformId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Registry of source adapters, indexed by platform ID.
///
/// The aggregator queries this to fan a search out; the surrounding
/// application registers adapters at startup.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Arc<RwLock<HashMap<PlatformId, Arc<dyn SourceAdapter>>>>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an adapter for its platform.
    pub fn register(&self, adapter: Arc<dyn SourceAdapter>) {
        let platform = adapter.platform().clone();
        let mut adapters = self
            .adapters
            .write()
            .expect("acquire write lock on adapters");
        adapters.insert(platform.clone(), adapter);
        info!(platform = %platform, "registered source adapter");
    }

    /// Get an adapter by platform.
    pub fn get(&self, platform: &PlatformId) -> Result<Arc<dyn SourceAdapter>> {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");
        adapters
            .get(platform)
            .cloned()
            .ok_or_else(|| DiscoveryError::NotRegistered(platform.to_string()))
    }

    /// Adapters for the given platform subset. Unknown platforms are skipped.
    #[must_use]
    pub fn get_enabled(&self, platforms: &[PlatformId]) -> Vec<Arc<dyn SourceAdapter>> {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");
        platforms
            .iter()
            .filter_map(|p| adapters.get(p).cloned())
            .collect()
    }

    /// All registered adapters.
    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<dyn SourceAdapter>> {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");
        adapters.values().cloned().collect()
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn count(&self) -> usize {
        self.adapters
            .read()
            .expect("acquire read lock on adapters")
            .len()
    }

    /// Whether the platform has a registered adapter.
    #[must_use]
    pub fn contains(&self, platform: &PlatformId) -> bool {
        self.adapters
            .read()
            .expect("acquire read lock on adapters")
            .contains_key(platform)
    }
}
