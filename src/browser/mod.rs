//! Browser automation behind a deadline.
//!
//! Extraction logic never talks to a browser directly. It goes through
//! [`BrowserSession`], which bounds every primitive by the session deadline
//! and turns elapsed waits into [`AppError::NavigationTimeout`] or
//! [`AppError::SelectorNotFound`]. The session is backed by any
//! [`BrowserDriver`]:
//!
//! - [`FixtureDriver`]: static HTML pages parsed with `scraper`
//! - `ChromeDriver`: headless Chromium (feature `chrome`)

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod fixture;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AppError, Result};

#[cfg(feature = "chrome")]
pub use chrome::{ChromeDriver, ChromeLauncher};
pub use fixture::{FixtureDriver, FixtureSite};

/// Raw browser primitives implemented by each backend.
///
/// Methods return immediately with what the page currently holds; waiting
/// and deadlines are the session's job.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Handle to a located element, usable as a query scope.
    type Node: Clone + Send + Sync;

    /// Load a page and wait for the document to finish loading.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// All elements matching `selector`, relative to `scope` when given.
    async fn query_nodes(&self, selector: &str, scope: Option<&Self::Node>)
    -> Result<Vec<Self::Node>>;

    /// Whether the first element matching `selector` is rendered and visible.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    async fn click(&self, node: &Self::Node) -> Result<()>;

    /// Rendered text of the element.
    async fn text(&self, node: &Self::Node) -> Result<String>;

    async fn inner_html(&self, node: &Self::Node) -> Result<String>;

    /// Release the page and the browser process.
    async fn close(&self) -> Result<()>;
}

/// Creates one fresh driver per run.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: BrowserDriver + 'static;

    async fn launch(&self) -> Result<Self::Driver>;
}

/// A browser context bound to a deadline.
///
/// Cloning is cheap and shares the driver; [`BrowserSession::within`] gives a
/// view with a tighter deadline for elements whose absence is normal.
pub struct BrowserSession<D: BrowserDriver> {
    driver: Arc<D>,
    deadline: Instant,
    poll_interval: Duration,
}

impl<D: BrowserDriver> Clone for BrowserSession<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            deadline: self.deadline,
            poll_interval: self.poll_interval,
        }
    }
}

impl<D: BrowserDriver> BrowserSession<D> {
    /// Start a session that expires `timeout` from now.
    pub fn open(driver: D, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            driver: Arc::new(driver),
            deadline: Instant::now() + timeout,
            poll_interval,
        }
    }

    /// A view of this session that gives up after `timeout` (or the session
    /// deadline, whichever comes first).
    pub fn within(&self, timeout: Duration) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            deadline: self.deadline.min(Instant::now() + timeout),
            poll_interval: self.poll_interval,
        }
    }

    /// Run a driver call, failing with `on_timeout` if the deadline passes first.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T>>,
        on_timeout: impl FnOnce() -> AppError,
    ) -> Result<T> {
        match tokio::time::timeout_at(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout()),
        }
    }

    /// Sleep one poll interval, or fail if the deadline has passed.
    async fn pause(&self, selector: &str) -> Result<()> {
        let now = Instant::now();
        if now >= self.deadline {
            return Err(AppError::selector_not_found(selector));
        }
        tokio::time::sleep(self.poll_interval.min(self.deadline - now)).await;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        log::debug!("Navigating to {}", url);
        self.bounded(self.driver.navigate(url), || AppError::navigation_timeout(url))
            .await
    }

    /// Wait until the first match for `selector` is visible.
    pub async fn wait_visible(&self, selector: &str) -> Result<()> {
        loop {
            let visible = self
                .bounded(self.driver.is_visible(selector), || {
                    AppError::selector_not_found(selector)
                })
                .await?;
            if visible {
                return Ok(());
            }
            self.pause(selector).await?;
        }
    }

    /// Wait until `selector` matches at least one element.
    pub async fn wait_ready(&self, selector: &str) -> Result<()> {
        self.first_node(selector, None).await.map(|_| ())
    }

    /// Wait for `selector` and click its first match.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let node = self.first_node(selector, None).await?;
        self.click_node(&node, selector).await
    }

    /// Click an element located earlier. `label` names it in errors.
    pub async fn click_node(&self, node: &D::Node, label: &str) -> Result<()> {
        self.bounded(self.driver.click(node), || AppError::selector_not_found(label))
            .await
    }

    /// Every current match for `selector`, without waiting.
    pub async fn query_nodes(&self, selector: &str, scope: Option<&D::Node>) -> Result<Vec<D::Node>> {
        self.bounded(self.driver.query_nodes(selector, scope), || {
            AppError::selector_not_found(selector)
        })
        .await
    }

    /// Wait for `selector` (inside `scope`) and read its text.
    pub async fn read_text(&self, selector: &str, scope: Option<&D::Node>) -> Result<String> {
        let node = self.first_node(selector, scope).await?;
        self.bounded(self.driver.text(&node), || AppError::selector_not_found(selector))
            .await
    }

    /// Wait for `selector` and read its inner HTML.
    pub async fn read_inner_html(&self, selector: &str) -> Result<String> {
        let node = self.first_node(selector, None).await?;
        self.bounded(self.driver.inner_html(&node), || {
            AppError::selector_not_found(selector)
        })
        .await
    }

    async fn first_node(&self, selector: &str, scope: Option<&D::Node>) -> Result<D::Node> {
        loop {
            let nodes = self.query_nodes(selector, scope).await?;
            if let Some(node) = nodes.into_iter().next() {
                return Ok(node);
            }
            self.pause(selector).await?;
        }
    }

    /// Release the browser.
    pub async fn close(self) -> Result<()> {
        self.driver.close().await
    }
}
