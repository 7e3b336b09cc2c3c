//! Configuration management for JobPilot.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobpilot/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scheduler and worker pool settings
    pub engine: EngineConfig,
    /// Job discovery settings
    pub discovery: DiscoveryConfig,
    /// Session pool and anti-fingerprinting settings
    pub stealth: StealthConfig,
    /// Per-domain rate limiting settings
    pub rate: RateConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBPILOT_WORKERS`: Override worker pool size
    /// - `JOBPILOT_POLL_SECS`: Override scheduler poll interval
    /// - `JOBPILOT_HEADLESS`: Override browser headless mode (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        // Override from environment
        if let Ok(val) = std::env::var("JOBPILOT_WORKERS") {
            if let Ok(workers) = val.parse() {
                config.engine.worker_count = workers;
                tracing::debug!("Override engine.worker_count from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("JOBPILOT_POLL_SECS") {
            if let Ok(secs) = val.parse() {
                config.engine.poll_interval_secs = secs;
                tracing::debug!("Override engine.poll_interval_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("JOBPILOT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                config.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobpilot/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("dev", "jobpilot", "jobpilot").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/jobpilot`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("dev", "jobpilot", "jobpilot").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Scheduler and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of parallel application workers
    pub worker_count: usize,
    /// Seconds between scheduler evaluation cycles
    pub poll_interval_secs: u64,
    /// Maximum applications per platform within one cycle
    pub per_platform_cycle_cap: usize,
    /// Base delay in milliseconds between retry attempts
    pub retry_base_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            poll_interval_secs: 300,
            per_platform_cycle_cap: 5,
            retry_base_delay_ms: 30_000,
        }
    }
}

/// Job discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Overall deadline for one fan-out search in seconds
    pub search_deadline_secs: u64,
    /// Maximum postings requested per source adapter
    pub per_source_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_deadline_secs: 45,
            per_source_limit: 20,
        }
    }
}

/// Session pool and anti-fingerprinting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    /// Number of simultaneous automated sessions
    pub pool_size: usize,
    /// Uses before a session profile is rotated
    pub max_profile_uses: u32,
    /// Minimum delay between form field fills in milliseconds
    pub min_field_delay_ms: u64,
    /// Maximum delay between form field fills in milliseconds
    pub max_field_delay_ms: u64,
    /// Probability (0.0-1.0) of a scroll jitter between fields
    pub scroll_probability: f64,
    /// Shuffle field-filling order per attempt
    pub shuffle_fields: bool,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            max_profile_uses: 10,
            min_field_delay_ms: 300,
            max_field_delay_ms: 1500,
            scroll_probability: 0.3,
            shuffle_fields: true,
        }
    }
}

/// Per-domain rate limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Initial (and floor) delay between requests to one domain, in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay after repeated throttling, in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier applied when a caller arrives before the delay has elapsed
    pub growth_factor: f64,
    /// Multiplier applied when a domain has been quiet long enough
    pub decay_factor: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            max_delay_ms: 30_000,
            growth_factor: 1.5,
            decay_factor: 0.9,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Submission verification timeout in seconds
    pub verify_timeout_secs: u64,
    /// Bounded wait for an external challenge solver in seconds
    pub challenge_wait_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 30,
            verify_timeout_secs: 10,
            challenge_wait_secs: 120,
        }
    }
}
