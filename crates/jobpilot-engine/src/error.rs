//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the orchestration engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Shared core error.
    #[error(transparent)]
    Core(#[from] jobpilot_core::error::PilotError),

    /// Persistence failure.
    #[error(transparent)]
    Database(#[from] jobpilot_db::DatabaseError),

    /// Discovery failure escalated past the aggregator.
    #[error(transparent)]
    Discovery(#[from] jobpilot_discovery::DiscoveryError),

    /// A collaborator (profile/policy/credential provider) failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// A stored credential could not be resolved.
    #[error("credential error: {0}")]
    Credential(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
