//! JobPilot Core - Foundation crate for the JobPilot automation engine.
//!
//! This crate provides shared types, error handling, and configuration
//! management that all other JobPilot crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`UserId`, `PlatformId`, `CredentialId`)
//!
//! # Example
//!
//! ```rust
//! use jobpilot_core::{AppConfig, PlatformId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert!(config.engine.worker_count > 0);
//!
//! let platform = PlatformId::new("greenhouse")?;
//! assert_eq!(platform.as_str(), "greenhouse");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DiscoveryConfig, EngineConfig, RateConfig, StealthConfig,
};
pub use error::{ConfigError, ConfigResult, PilotError, Result};
pub use types::{CredentialId, PlatformId, UserId};
