//! Navigation capability
//!
//! The crawl core drives the site only through `NavigationCapability`:
//! render a URL, click, wait for an element, read the current content,
//! type into an input, press a key. Every operation is bounded by a timeout
//! and fails with a `NavError`, whose timeouts and missing elements count as
//! transient.
//!
//! - `ChromeNavigator`: headless Chrome backend
//! - `Session`: wraps a capability with bounded in-place retries
//! - `check_reachable`: plain HTTP preflight run before the browser starts

mod chrome;
mod preflight;
mod session;

pub use chrome::ChromeNavigator;
pub use preflight::check_reachable;
pub use session::Session;

use crate::extract::has_element;
use crate::NavResult;
use async_trait::async_trait;
use std::time::Duration;

/// Rendered HTML of the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub html: String,
}

impl Content {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Returns true if `locator` matches an element of this content
    pub fn contains(&self, locator: &str) -> bool {
        has_element(&self.html, locator)
    }
}

/// A single browser session as the crawl core sees it
#[async_trait]
pub trait NavigationCapability: Send {
    /// Loads `url` and returns the rendered page
    async fn render(&mut self, url: &str) -> NavResult<Content>;

    /// Clicks the first element matching `locator`
    async fn click(&mut self, locator: &str) -> NavResult<()>;

    /// Waits until `locator` is present, then returns the rendered page
    async fn wait_for(&mut self, locator: &str, timeout: Duration) -> NavResult<Content>;

    /// Returns the page as currently rendered
    async fn current_content(&mut self) -> NavResult<Content>;

    /// Replaces the value of the input matching `locator` with `text`
    async fn type_text(&mut self, locator: &str, text: &str) -> NavResult<()>;

    /// Sends a key press (e.g. "Escape") to the page
    async fn press_key(&mut self, key: &str) -> NavResult<()>;
}
