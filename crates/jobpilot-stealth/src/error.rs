use thiserror::Error;

pub type Result<T> = std::result::Result<T, StealthError>;

#[derive(Debug, Error)]
pub enum StealthError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("session pool is closed")]
    PoolClosed,

    #[error("operation canceled")]
    Canceled,
}
