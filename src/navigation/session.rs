use crate::navigation::{Content, NavigationCapability};
use crate::{NavError, NavResult};
use std::time::Duration;
use tracing::debug;

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// A navigation capability with bounded in-place retries
///
/// Transient failures (timeouts, elements not rendered yet) are retried up
/// to `retries` extra times with a short linear backoff. Persistent failures
/// are returned immediately.
pub struct Session<'a> {
    nav: &'a mut dyn NavigationCapability,
    retries: u32,
    element_timeout: Duration,
}

impl<'a> Session<'a> {
    pub fn new(nav: &'a mut dyn NavigationCapability, retries: u32, element_timeout: Duration) -> Self {
        Self {
            nav,
            retries,
            element_timeout,
        }
    }

    pub fn element_timeout(&self) -> Duration {
        self.element_timeout
    }

    pub async fn render(&mut self, url: &str) -> NavResult<Content> {
        let mut attempt = 0;
        loop {
            match self.nav.render(url).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if !should_retry(self.retries, "render", attempt, &e).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }

    pub async fn click(&mut self, locator: &str) -> NavResult<()> {
        let mut attempt = 0;
        loop {
            match self.nav.click(locator).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if !should_retry(self.retries, "click", attempt, &e).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }

    pub async fn wait_for(&mut self, locator: &str) -> NavResult<Content> {
        let timeout = self.element_timeout;
        let mut attempt = 0;
        loop {
            match self.nav.wait_for(locator, timeout).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if !should_retry(self.retries, "wait_for", attempt, &e).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Clicks `target` and waits for `ready`, retrying the pair as one step
    pub async fn open(&mut self, target: &str, ready: &str) -> NavResult<Content> {
        let timeout = self.element_timeout;
        let mut attempt = 0;
        loop {
            let result = match self.nav.click(target).await {
                Ok(()) => self.nav.wait_for(ready, timeout).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if !should_retry(self.retries, "open", attempt, &e).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }

    pub async fn current_content(&mut self) -> NavResult<Content> {
        self.nav.current_content().await
    }

    pub async fn type_text(&mut self, locator: &str, text: &str) -> NavResult<()> {
        let mut attempt = 0;
        loop {
            match self.nav.type_text(locator, text).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if !should_retry(self.retries, "type_text", attempt, &e).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Single attempt; dismissal loops bound their own retries
    pub async fn press_key(&mut self, key: &str) -> NavResult<()> {
        self.nav.press_key(key).await
    }

    /// Single attempt, used when probing for optional elements
    pub async fn try_click(&mut self, locator: &str) -> NavResult<()> {
        self.nav.click(locator).await
    }
}

/// Decides whether to retry after `err`, sleeping before the next attempt
async fn should_retry(retries: u32, step: &str, attempt: u32, err: &NavError) -> bool {
    if !err.is_transient() || attempt >= retries {
        return false;
    }
    debug!(step, attempt = attempt + 1, "Transient navigation failure, retrying: {}", err);
    tokio::time::sleep(RETRY_BACKOFF * (attempt + 1)).await;
    true
}
