//! Stealth session layer for automated job-board interaction.
//!
//! Provides the bounded session pool with rotating identity profiles,
//! the adaptive per-domain rate limiter, human-like jitter policies,
//! and the headless-browser driver abstraction.

pub mod chromium;
pub mod driver;
pub mod error;
pub mod fingerprint;
pub mod jitter;
pub mod pool;
pub mod rate;

pub use chromium::ChromiumDriver;
pub use driver::{extract_domain, PageDriver, PageHandle};
pub use error::{Result, StealthError};
pub use fingerprint::{ProxyEndpoint, SessionProfile};
pub use jitter::JitterPolicy;
pub use pool::{ScopedSession, StealthSessionPool};
pub use rate::RateLimiter;
