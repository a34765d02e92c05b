//! Headless Chrome backend
//!
//! `headless_chrome` is synchronous, so every call runs on the blocking pool
//! under a tokio timeout. The browser process lives as long as the navigator.

use crate::navigation::{Content, NavigationCapability};
use crate::{NavError, NavResult};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Extra time granted to a blocking call beyond its own timeout
const BLOCKING_GRACE: Duration = Duration::from_secs(2);

pub struct ChromeNavigator {
    // Dropping the browser kills the Chrome process
    _browser: Browser,
    tab: Arc<Tab>,
    navigation_timeout: Duration,
    element_timeout: Duration,
}

impl ChromeNavigator {
    /// Launches Chrome and opens the tab the whole run will use
    pub fn launch(
        headless: bool,
        navigation_timeout: Duration,
        element_timeout: Duration,
    ) -> NavResult<Self> {
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(navigation_timeout.max(Duration::from_secs(300)))
            .build()
            .map_err(|e| NavError::Failed(format!("Invalid browser options: {}", e)))?;

        let browser = Browser::new(options)
            .map_err(|e| NavError::Failed(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| NavError::Failed(format!("Failed to open tab: {}", e)))?;
        tab.set_default_timeout(element_timeout);

        info!(headless, "Browser launched");
        Ok(Self {
            _browser: browser,
            tab,
            navigation_timeout,
            element_timeout,
        })
    }

    /// Runs a blocking tab operation with a hard deadline
    async fn blocking<T, F>(&self, locator: &str, timeout: Duration, op: F) -> NavResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> anyhow::Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        let task = tokio::task::spawn_blocking(move || op(tab));

        match tokio::time::timeout(timeout + BLOCKING_GRACE, task).await {
            Err(_) => Err(NavError::Timeout {
                locator: locator.to_string(),
                waited_ms: millis(timeout),
            }),
            Ok(Err(join_error)) => Err(NavError::Failed(format!(
                "Browser task panicked: {}",
                join_error
            ))),
            Ok(Ok(result)) => result.map_err(|e| classify(locator, timeout, &e)),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Maps a `headless_chrome` error onto the crawl's error taxonomy
fn classify(locator: &str, timeout: Duration, error: &anyhow::Error) -> NavError {
    let message = format!("{:#}", error);
    let lower = message.to_lowercase();

    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("never came") {
        NavError::Timeout {
            locator: locator.to_string(),
            waited_ms: millis(timeout),
        }
    } else if lower.contains("couldn't find element")
        || lower.contains("no element")
        || lower.contains("could not find node")
    {
        NavError::ElementNotFound(locator.to_string())
    } else {
        NavError::Failed(message)
    }
}

#[async_trait]
impl NavigationCapability for ChromeNavigator {
    async fn render(&mut self, url: &str) -> NavResult<Content> {
        debug!(url, "Rendering");
        let target = url.to_string();
        let html = self
            .blocking(url, self.navigation_timeout, move |tab| {
                tab.navigate_to(&target)?;
                tab.wait_until_navigated()?;
                tab.get_content()
            })
            .await?;
        Ok(Content::new(html))
    }

    async fn click(&mut self, locator: &str) -> NavResult<()> {
        debug!(locator, "Clicking");
        let selector = locator.to_string();
        self.blocking(locator, self.element_timeout, move |tab| {
            tab.find_element(&selector)?.click()?;
            Ok(())
        })
        .await
    }

    async fn wait_for(&mut self, locator: &str, timeout: Duration) -> NavResult<Content> {
        let selector = locator.to_string();
        let html = self
            .blocking(locator, timeout, move |tab| {
                tab.wait_for_element_with_custom_timeout(&selector, timeout)?;
                tab.get_content()
            })
            .await?;
        Ok(Content::new(html))
    }

    async fn current_content(&mut self) -> NavResult<Content> {
        let html = self
            .blocking("document", self.element_timeout, |tab| tab.get_content())
            .await?;
        Ok(Content::new(html))
    }

    async fn type_text(&mut self, locator: &str, text: &str) -> NavResult<()> {
        let selector = locator.to_string();
        let text = text.to_string();
        self.blocking(locator, self.element_timeout, move |tab| {
            let input = tab.find_element(&selector)?;
            input.call_js_fn("function() { this.value = ''; }", vec![], false)?;
            input.click()?;
            input.type_into(&text)?;
            Ok(())
        })
        .await
    }

    async fn press_key(&mut self, key: &str) -> NavResult<()> {
        let key_name = key.to_string();
        self.blocking(key, self.element_timeout, move |tab| {
            tab.press_key(&key_name)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_timeout() {
        let err = anyhow::anyhow!("The event waited for never came");
        assert!(matches!(
            classify("#grid", Duration::from_secs(1), &err),
            NavError::Timeout { waited_ms: 1000, .. }
        ));
    }

    #[test]
    fn test_classify_missing_element() {
        let err = anyhow::anyhow!("Couldn't find element using selector #row");
        assert_eq!(
            classify("#row", Duration::from_secs(1), &err),
            NavError::ElementNotFound("#row".to_string())
        );
    }

    #[test]
    fn test_classify_other() {
        let err = anyhow::anyhow!("Target closed");
        assert!(matches!(
            classify("#row", Duration::from_secs(1), &err),
            NavError::Failed(_)
        ));
    }
}
