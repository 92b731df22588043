// src/browser/fixture.rs

//! Browser driver over static HTML.
//!
//! Pages are registered per URL and parsed with `scraper` on every call, so
//! a run can be replayed from saved HTML without launching a browser.
//! Click-to-reveal behaviour is modelled with reveal rules: clicking an
//! element that matches a rule's selector replaces the current document with
//! the rule's HTML. Node handles are child-index paths from the document
//! root, so they survive a reveal as long as the revealed page keeps the
//! clicked elements where they were.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::browser::{BrowserDriver, DriverFactory};
use crate::error::{AppError, Result};

/// Handle to an element in a fixture document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureNode {
    path: Vec<usize>,
}

#[derive(Debug, Clone)]
struct RevealRule {
    selector: String,
    html: String,
}

/// What every driver built from a site has done.
#[derive(Debug, Default)]
struct History {
    visits: Vec<String>,
    clicks: Vec<String>,
    launched: usize,
    closed: usize,
}

/// A set of fixture pages; builds one [`FixtureDriver`] per run.
#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    pages: HashMap<String, String>,
    reveals: Vec<RevealRule>,
    history: Arc<Mutex<History>>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` when `url` is navigated to.
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// After a click on an element matching `selector`, show `html` instead.
    pub fn on_click(mut self, selector: impl Into<String>, html: impl Into<String>) -> Self {
        self.reveals.push(RevealRule {
            selector: selector.into(),
            html: html.into(),
        });
        self
    }

    pub fn build(&self) -> FixtureDriver {
        if let Ok(mut history) = self.history.lock() {
            history.launched += 1;
        }
        FixtureDriver {
            pages: self.pages.clone(),
            reveals: self.reveals.clone(),
            document: Mutex::new(None),
            history: Arc::clone(&self.history),
        }
    }

    /// URLs navigated to, in order, across all drivers.
    pub fn visits(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|h| h.visits.clone())
            .unwrap_or_default()
    }

    /// Clicked elements described as `tag.class`, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|h| h.clicks.clone())
            .unwrap_or_default()
    }

    /// Drivers built and drivers closed.
    pub fn sessions(&self) -> (usize, usize) {
        self.history
            .lock()
            .map(|h| (h.launched, h.closed))
            .unwrap_or_default()
    }
}

#[async_trait]
impl DriverFactory for FixtureSite {
    type Driver = FixtureDriver;

    async fn launch(&self) -> Result<FixtureDriver> {
        Ok(self.build())
    }
}

/// Driver serving registered pages.
#[derive(Debug)]
pub struct FixtureDriver {
    pages: HashMap<String, String>,
    reveals: Vec<RevealRule>,
    document: Mutex<Option<String>>,
    history: Arc<Mutex<History>>,
}

impl FixtureDriver {
    fn document(&self) -> Result<MutexGuard<'_, Option<String>>> {
        self.document
            .lock()
            .map_err(|e| AppError::browser(format!("fixture document lock poisoned: {e}")))
    }

    fn record(&self, update: impl FnOnce(&mut History)) {
        if let Ok(mut history) = self.history.lock() {
            update(&mut history);
        }
    }

    /// Parse the current page and run `f` against it.
    fn with_page<T>(&self, f: impl FnOnce(&Html) -> Result<T>) -> Result<T> {
        let guard = self.document()?;
        let source = guard
            .as_deref()
            .ok_or_else(|| AppError::browser("no page loaded"))?;
        let document = Html::parse_document(source);
        f(&document)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

fn node_path(element: ElementRef<'_>) -> Vec<usize> {
    let mut path = Vec::new();
    let mut node = *element;
    while let Some(parent) = node.parent() {
        path.push(node.prev_siblings().count());
        node = parent;
    }
    path.reverse();
    path
}

fn resolve<'a>(document: &'a Html, node: &FixtureNode) -> Result<ElementRef<'a>> {
    let mut current = document.tree.root();
    for &index in &node.path {
        current = current
            .children()
            .nth(index)
            .ok_or_else(|| AppError::browser("stale element handle"))?;
    }
    ElementRef::wrap(current).ok_or_else(|| AppError::browser("stale element handle"))
}

fn is_rendered(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| {
            let value = el.value();
            let hidden_style = value
                .attr("style")
                .is_some_and(|style| style.replace(' ', "").contains("display:none"));
            value.attr("hidden").is_none() && !hidden_style
        })
}

fn describe(element: ElementRef<'_>) -> String {
    let value = element.value();
    let mut label = value.name().to_string();
    for class in value.classes() {
        label.push('.');
        label.push_str(class);
    }
    label
}

#[async_trait]
impl BrowserDriver for FixtureDriver {
    type Node = FixtureNode;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(|h| h.visits.push(url.to_string()));
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| AppError::browser(format!("no fixture page for {url}")))?;
        *self.document()? = Some(html.clone());
        Ok(())
    }

    async fn query_nodes(
        &self,
        selector: &str,
        scope: Option<&FixtureNode>,
    ) -> Result<Vec<FixtureNode>> {
        let selector = Self::parse_selector(selector)?;
        self.with_page(|document| {
            let nodes = match scope {
                Some(scope) => resolve(document, scope)?
                    .select(&selector)
                    .map(|el| FixtureNode { path: node_path(el) })
                    .collect(),
                None => document
                    .select(&selector)
                    .map(|el| FixtureNode { path: node_path(el) })
                    .collect(),
            };
            Ok(nodes)
        })
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let selector = Self::parse_selector(selector)?;
        self.with_page(|document| Ok(document.select(&selector).next().is_some_and(is_rendered)))
    }

    async fn click(&self, node: &FixtureNode) -> Result<()> {
        let mut guard = self.document()?;
        let source = guard
            .as_deref()
            .ok_or_else(|| AppError::browser("no page loaded"))?;
        let document = Html::parse_document(source);
        let element = resolve(&document, node)?;

        let label = describe(element);
        self.record(|h| h.clicks.push(label));

        let revealed = self.reveals.iter().find(|rule| {
            Self::parse_selector(&rule.selector)
                .map(|s| s.matches(&element))
                .unwrap_or(false)
        });
        if let Some(rule) = revealed {
            *guard = Some(rule.html.clone());
        }
        Ok(())
    }

    async fn text(&self, node: &FixtureNode) -> Result<String> {
        self.with_page(|document| {
            let element = resolve(document, node)?;
            Ok(element.text().collect::<String>().trim().to_string())
        })
    }

    async fn inner_html(&self, node: &FixtureNode) -> Result<String> {
        self.with_page(|document| Ok(resolve(document, node)?.inner_html().trim().to_string()))
    }

    async fn close(&self) -> Result<()> {
        self.record(|h| h.closed += 1);
        Ok(())
    }
}
