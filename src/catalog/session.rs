//! Browser session: the seam between the scraper and a live browser.
//!
//! [`BrowserSession`] is selector-based so that tests can script a fake
//! page, while [`ChromiumSession`] drives headless Chromium over CDP.

use crate::config::BrowserConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DISPLAY_FN: &str = "function() { return window.getComputedStyle(this).display; }";

/// Operations the page loader and orchestrator need from a browser.
///
/// Lookups that match nothing are not errors: they report `None`,
/// `false`, zero or an empty list. Errors are reserved for the session
/// itself failing.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates to `url` and waits for the page to load.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Returns the computed CSS `display` of the first match.
    async fn display(&self, selector: &str) -> Result<Option<String>>;

    /// Clicks the first match. Returns false if nothing matched.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Counts the elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Returns the outer HTML of every match, in document order.
    async fn outer_html_all(&self, selector: &str) -> Result<Vec<String>>;

    /// Shuts the browser down. Called exactly once per session.
    async fn close(&self) -> Result<()>;
}

/// Headless Chromium driven through chromiumoxide.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launches Chromium and opens a blank tab.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(config.window_width, config.window_height);

        // chromiumoxide launches headless unless told otherwise
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &config.chrome_path {
            debug!("Using Chromium at {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) =
            Browser::launch(cdp_config).await.context("Failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await.context("Failed to open browser tab")?;

        info!("Browser session started (headless: {})", config.headless);

        Ok(Self { browser: Mutex::new(browser), page, handler })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("GET {}", url);
        self.page.goto(url).await.with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn display(&self, selector: &str) -> Result<Option<String>> {
        let mut elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query '{}'", selector))?;

        if elements.is_empty() {
            return Ok(None);
        }

        let element = elements.swap_remove(0);
        let returns = element
            .call_js_fn(DISPLAY_FN, false)
            .await
            .with_context(|| format!("Failed to read display of '{}'", selector))?;

        let display = returns
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Some(display))
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query '{}'", selector))?;

        let Some(element) = elements.first() else {
            return Ok(false);
        };

        element.click().await.with_context(|| format!("Failed to click '{}'", selector))?;
        Ok(true)
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query '{}'", selector))?;
        Ok(elements.len())
    }

    async fn outer_html_all(&self, selector: &str) -> Result<Vec<String>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query '{}'", selector))?;

        let mut html = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let outer = element
                .outer_html()
                .await
                .with_context(|| format!("Failed to read HTML of '{}' #{}", selector, index))?
                .with_context(|| format!("Element '{}' #{} has no HTML", selector, index))?;
            html.push(outer);
        }

        Ok(html)
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;

        browser.close().await.context("Failed to close browser")?;
        if let Err(e) = browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }

        self.handler.abort();
        info!("Browser session closed");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
