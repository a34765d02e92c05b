//! Retry of queued failures through the site's search
//!
//! Each failed notice is looked up by its number in the list's search form
//! rather than by walking pages, then run through the same deep crawl as the
//! normal walk. The pagination cursor is never touched here.

use crate::config::Config;
use crate::crawler::deep_crawl::{build_record, DeepCrawler, ItemFailure};
use crate::crawler::stores::CrawlStores;
use crate::crawler::{pause, RunSummary};
use crate::extract::{parse_list_page, Candidate};
use crate::navigation::{NavigationCapability, Session};
use crate::record::{Fingerprint, NoticeField, Record};
use crate::state::DeepCrawlState;
use crate::storage::FailedItem;
use crate::{NavResult, Result};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polling step while waiting for search results to render
const SEARCH_POLL: Duration = Duration::from_millis(250);

/// Page number recorded for notices re-collected through search
pub const SEARCH_SOURCE_PAGE: u32 = 0;

/// Replays the failed-item queue
pub struct RetryCoordinator<'a> {
    config: &'a Config,
    session: Session<'a>,
    stores: &'a mut CrawlStores,
    deep: DeepCrawler<'a>,
    cancel: CancellationToken,
    required: Vec<NoticeField>,
    summary: RunSummary,
}

impl<'a> RetryCoordinator<'a> {
    pub fn new(
        config: &'a Config,
        nav: &'a mut dyn NavigationCapability,
        stores: &'a mut CrawlStores,
        cancel: CancellationToken,
    ) -> Self {
        let required = config
            .crawler
            .required_fields
            .iter()
            .filter_map(|name| NoticeField::from_name(name))
            .collect();

        Self {
            config,
            session: Session::new(
                nav,
                config.crawler.transient_retries,
                config.element_timeout(),
            ),
            stores,
            deep: DeepCrawler::new(&config.site.layout, config.crawler.dismiss_attempts),
            cancel,
            required,
            summary: RunSummary::default(),
        }
    }

    /// Retries every eligible queued item once
    pub async fn run(mut self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let max_attempts = self.config.retry.max_attempts;
        let eligible = self.stores.state.retry_eligible(max_attempts);
        let already_exhausted = self.stores.state.exhausted(max_attempts).len() as u64;

        info!(
            eligible = eligible.len(),
            exhausted = already_exhausted,
            "Retrying failed items"
        );
        self.summary.retry_exhausted = already_exhausted;

        if !eligible.is_empty() {
            let retried = self.retry_all(&eligible).await;
            self.stores.flush()?;
            retried?;
        }

        self.summary.elapsed = start_time.elapsed();
        info!("Retry finished: {}", self.summary);
        Ok(self.summary)
    }

    async fn retry_all(&mut self, eligible: &[FailedItem]) -> Result<()> {
        self.open_list().await?;

        for item in eligible {
            if self.cancel.is_cancelled() {
                self.summary.interrupted = true;
                return Ok(());
            }

            // Queued without a name means the list row had none
            let queued = Fingerprint::of(
                &item.notice_number,
                item.notice_name.as_deref().unwrap_or_default(),
            );
            if self.stores.dedup.contains(&queued) {
                info!(notice = %item.notice_number, "Collected since it failed, dropping from queue");
                self.stores.state.remove_failed(&item.notice_number);
                self.summary.skipped += 1;
                self.stores.save()?;
                continue;
            }

            match self.retry_one(item).await {
                Ok((record, fingerprint)) => match self.stores.commit(&record, fingerprint) {
                    Ok(()) => {
                        self.stores.state.remove_failed(&item.notice_number);
                        self.summary.retried_ok += 1;
                        info!(notice = %item.notice_number, "Re-collected");
                    }
                    Err(e) => {
                        let failure = ItemFailure::new(
                            DeepCrawlState::Done,
                            format!("persisting record: {}", e),
                        );
                        self.record_failure(item, &failure);
                    }
                },
                Err(failure) => {
                    self.record_failure(item, &failure);
                    if failure.session_lost {
                        warn!("Session lost its place, reloading the list");
                        self.open_list().await?;
                    }
                }
            }
            self.stores.save()?;

            if !pause(&self.cancel, self.config.crawler.delay_between_items_ms).await {
                self.summary.interrupted = true;
                return Ok(());
            }
        }
        Ok(())
    }

    fn record_failure(&mut self, item: &FailedItem, failure: &ItemFailure) {
        let attempts = self.stores.state.record_failure(
            &item.notice_number,
            item.notice_name.as_deref(),
            &failure.to_string(),
        );
        self.summary.failed += 1;
        if attempts > self.config.retry.max_attempts {
            self.summary.retry_exhausted += 1;
            warn!(
                notice = %item.notice_number,
                attempts,
                "Retry failed, giving up until inspected: {}",
                failure
            );
        } else {
            warn!(notice = %item.notice_number, attempts, "Retry failed: {}", failure);
        }
    }

    /// Searches for the notice and deep-crawls the matching row
    ///
    /// Returns the record with the search row's fingerprint, which is the
    /// same key a list walk checks for that notice.
    async fn retry_one(
        &mut self,
        item: &FailedItem,
    ) -> std::result::Result<(Record, Fingerprint), ItemFailure> {
        let candidate = self.search(&item.notice_number).await?;
        let fields = self.deep.crawl(&mut self.session, &candidate).await?;
        let record = build_record(fields, SEARCH_SOURCE_PAGE, &self.required)?;
        Ok((record, candidate.fingerprint()))
    }

    async fn search(&mut self, notice_number: &str) -> std::result::Result<Candidate, ItemFailure> {
        let config = self.config;
        let layout = &config.site.layout;
        let searched = async {
            self.session
                .type_text(&layout.search_input, notice_number)
                .await?;
            self.session.click(&layout.search_button).await?;
            self.session.wait_for(&layout.list_ready).await?;
            NavResult::Ok(())
        }
        .await;
        searched.map_err(|e| {
            ItemFailure::new(DeepCrawlState::ListContext, format!("search failed: {}", e))
        })?;

        self.await_search_result(notice_number).await.ok_or_else(|| {
            ItemFailure::new(
                DeepCrawlState::ListContext,
                format!("search returned no row for {}", notice_number),
            )
        })
    }

    /// Polls the list until a row with `notice_number` shows up
    async fn await_search_result(&mut self, notice_number: &str) -> Option<Candidate> {
        let deadline = Instant::now() + self.session.element_timeout();
        loop {
            if let Ok(content) = self.session.current_content().await {
                let found = parse_list_page(&content.html, &self.config.site.layout)
                    .candidates
                    .into_iter()
                    .find(|c| c.notice_number() == notice_number);
                if found.is_some() {
                    return found;
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            debug!(notice = notice_number, "Waiting for search results");
            tokio::time::sleep(SEARCH_POLL).await;
        }
    }

    async fn open_list(&mut self) -> NavResult<()> {
        let config = self.config;
        self.session.render(&config.site.list_url).await?;
        self.session.wait_for(&config.site.layout.list_ready).await?;
        Ok(())
    }
}
