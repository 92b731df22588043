// src/browser/chrome.rs

//! Headless Chromium driver.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::browser::{BrowserDriver, DriverFactory};
use crate::error::{AppError, Result};
use crate::models::BrowserConfig;

/// Launches one Chromium process per run.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for ChromeLauncher {
    type Driver = ChromeDriver;

    async fn launch(&self) -> Result<ChromeDriver> {
        let mut builder = ChromiumConfig::builder()
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(agent) = &self.config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }
        let browser_config = builder
            .build()
            .map_err(|e| AppError::browser(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AppError::browser(format!("browser launch failed: {e}")))?;
        let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::browser(format!("failed to open page: {e}")))?;

        Ok(ChromeDriver {
            browser: Mutex::new(browser),
            page,
            events,
        })
    }
}

/// One Chromium process with a single page.
pub struct ChromeDriver {
    browser: Mutex<Browser>,
    page: Page,
    events: JoinHandle<()>,
}

/// First match for a selector, checked for layout and visibility.
fn visibility_script(selector: &str) -> Result<String> {
    let quoted = serde_json::to_string(selector)?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({quoted}); \
         if (!el) return false; \
         const style = window.getComputedStyle(el); \
         const rect = el.getBoundingClientRect(); \
         return style.visibility !== 'hidden' && style.display !== 'none' \
             && rect.width > 0 && rect.height > 0; }})()"
    ))
}

/// Classify a failed `querySelectorAll`.
///
/// Syntax errors come back from the page as a DOMException; anything else
/// is a protocol or connection failure.
fn query_error(selector: &str, message: &str) -> AppError {
    if message.contains("is not a valid selector") || message.contains("SyntaxError") {
        AppError::selector(selector, message)
    } else {
        AppError::browser(format!("query '{selector}' failed: {message}"))
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    type Node = Arc<Element>;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::browser(format!("navigation to {url} failed: {e}")))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| AppError::browser(format!("page load for {url} failed: {e}")))?;
        Ok(())
    }

    async fn query_nodes(
        &self,
        selector: &str,
        scope: Option<&Arc<Element>>,
    ) -> Result<Vec<Arc<Element>>> {
        let found = match scope {
            Some(parent) => parent.find_elements(selector).await,
            None => self.page.find_elements(selector).await,
        };
        let elements = found.map_err(|e| query_error(selector, &e.to_string()))?;
        Ok(elements.into_iter().map(Arc::new).collect())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let script = visibility_script(selector)?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| AppError::browser(format!("visibility check failed: {e}")))?;
        result
            .into_value::<bool>()
            .map_err(|e| AppError::browser(format!("visibility check returned {e}")))
    }

    async fn click(&self, node: &Arc<Element>) -> Result<()> {
        node.click()
            .await
            .map_err(|e| AppError::browser(format!("click failed: {e}")))?;
        Ok(())
    }

    async fn text(&self, node: &Arc<Element>) -> Result<String> {
        let text = node
            .inner_text()
            .await
            .map_err(|e| AppError::browser(format!("text read failed: {e}")))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn inner_html(&self, node: &Arc<Element>) -> Result<String> {
        let html = node
            .inner_html()
            .await
            .map_err(|e| AppError::browser(format!("inner HTML read failed: {e}")))?;
        Ok(html.unwrap_or_default().trim().to_string())
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            log::warn!("Browser close error: {}", e);
        }
        if let Err(e) = browser.wait().await {
            log::debug!("Browser process wait error: {}", e);
        }
        self.events.abort();
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        self.events.abort();
    }
}
