use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("adapter '{platform}' failed: {reason}")]
    AdapterError { platform: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("adapter not registered: {0}")]
    NotRegistered(String),

    #[error("search deadline exceeded")]
    DeadlineExceeded,
}
