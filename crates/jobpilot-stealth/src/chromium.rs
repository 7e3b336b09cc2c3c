//! Chromium-backed implementation of [`PageDriver`].

use crate::driver::{PageDriver, PageHandle};
use crate::error::{Result, StealthError};
use crate::fingerprint::SessionProfile;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use jobpilot_core::BrowserConfig as BrowserSettings;
use std::time::{Duration, Instant};

/// Headless Chromium driver.
///
/// One driver wraps one browser process. Every attempt gets its own tab via
/// [`PageDriver::open_page`], so concurrent attempts never share navigation
/// state.
pub struct ChromiumDriver {
    browser: Browser,
}

impl ChromiumDriver {
    /// Launch a browser process according to the given settings.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;

        // Drive the CDP event loop in the background
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser })
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromiumDriver {
    async fn open_page(&self, profile: &SessionProfile) -> Result<Box<dyn PageHandle>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;

        page.set_user_agent(profile.user_agent.as_str())
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;

        Ok(Box::new(ChromiumPage { page }))
    }
}

/// One attempt's tab. Closed when the handle is dropped.
pub struct ChromiumPage {
    page: Page,
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        let page = self.page.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}

#[async_trait::async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| StealthError::NavigationError(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| StealthError::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| StealthError::SelectorNotFound(selector.to_string()))?;

        element
            .click()
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;
        element
            .type_str(value)
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| StealthError::SelectorNotFound(selector.to_string()))?
            .click()
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StealthError::Timeout(format!(
                    "selector '{selector}' not found within {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| StealthError::SelectorNotFound(selector.to_string()))?;

        element
            .inner_text()
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?
            .ok_or_else(|| StealthError::SelectorNotFound(selector.to_string()))
    }

    async fn page_content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {pixels});"))
            .await
            .map_err(|e| StealthError::ChromiumError(e.to_string()))?;
        Ok(())
    }
}
