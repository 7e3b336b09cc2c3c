use crate::error::{Result, StealthError};
use crate::fingerprint::SessionProfile;

/// Opens isolated pages, one per application attempt.
///
/// A single driver (one browser process) serves many concurrent attempts;
/// each attempt works through its own [`PageHandle`] so workers never
/// observe another attempt's navigation or form state.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Open a fresh page carrying the given session identity.
    async fn open_page(&self, profile: &SessionProfile) -> Result<Box<dyn PageHandle>>;
}

/// Actions on one attempt's page.
///
/// The automaton is written against this trait so it can run under the real
/// chromium driver in production and a scripted fake in tests.
#[async_trait::async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate this page to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Fill a form field by CSS selector.
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Click an element by CSS selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Wait for a selector to appear.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Extract text from an element.
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Full HTML content of this page.
    async fn page_content(&self) -> Result<String>;

    /// Scroll the page vertically by the given pixel amount.
    async fn scroll_by(&self, pixels: i64) -> Result<()>;
}

/// Helper to extract the domain from a URL.
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| StealthError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| StealthError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}
