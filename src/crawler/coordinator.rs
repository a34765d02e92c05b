//! Crawl orchestrator - the normal list walk
//!
//! This module contains the main crawl loop:
//! - Walking list pages in ascending order and rows in document order
//! - Skipping already-collected notices before any navigation
//! - Running the deep crawl for new notices and persisting the results
//! - Recording failed items without stopping the run
//! - Saving the cursor so an interrupted run resumes where it stopped

use crate::config::Config;
use crate::crawler::deep_crawl::{build_record, DeepCrawler, ItemFailure};
use crate::crawler::stores::CrawlStores;
use crate::crawler::{pause, RunSummary, StartMode};
use crate::extract::{parse_list_page, Candidate};
use crate::navigation::{Content, NavigationCapability, Session};
use crate::record::NoticeField;
use crate::state::{CrawlStatus, DeepCrawlState};
use crate::storage::Cursor;
use crate::{NavError, NavResult, Result};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Polling step while waiting for the pagination control to settle
const PAGE_SETTLE_POLL: Duration = Duration::from_millis(250);

/// What happened to one candidate row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Collected,
    Duplicate,
    Failed,
}

/// Why the list walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkEnd {
    /// No further list page exists
    Exhausted,
    /// `max-pages` or `max-items` was reached
    CapReached,
    /// Too many consecutive duplicates
    EarlyExit,
    Cancelled,
}

/// Walks the notice list and deep-crawls every new notice
pub struct CrawlOrchestrator<'a> {
    config: &'a Config,
    session: Session<'a>,
    stores: &'a mut CrawlStores,
    deep: DeepCrawler<'a>,
    cancel: CancellationToken,
    required: Vec<NoticeField>,
    summary: RunSummary,
    duplicate_streak: u32,
}

impl<'a> CrawlOrchestrator<'a> {
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
            duplicate_streak: 0,
        }
    }

    /// Runs the walk to its end and returns the summary
    ///
    /// Only run-level failures (the list itself cannot be reached, state
    /// cannot be saved) are returned as errors. The checkpoint is saved with
    /// a status matching how the run ended in every case.
    pub async fn run(mut self, mode: StartMode, config_hash: Option<&str>) -> Result<RunSummary> {
        let start_time = Instant::now();
        self.prepare(mode, config_hash);
        self.stores.save()?;

        let walked = self.walk().await;

        let status = match &walked {
            Ok(WalkEnd::Cancelled) => {
                self.summary.interrupted = true;
                CrawlStatus::Paused
            }
            Ok(WalkEnd::EarlyExit) => {
                self.summary.early_exit = true;
                CrawlStatus::Completed
            }
            Ok(WalkEnd::Exhausted | WalkEnd::CapReached) => CrawlStatus::Completed,
            Err(e) => {
                error!("Crawl stopped: {}", e);
                CrawlStatus::Failed
            }
        };
        self.stores.state.mark(status);
        self.stores.flush()?;
        walked?;

        self.summary.elapsed = start_time.elapsed();
        info!(status = %status, "Crawl finished: {}", self.summary);
        Ok(self.summary)
    }

    /// Decides where the walk starts
    fn prepare(&mut self, mode: StartMode, config_hash: Option<&str>) {
        let state = &mut self.stores.state;
        match mode {
            StartMode::Fresh => {
                info!("Starting a fresh walk from page 1");
                state.restart(config_hash);
            }
            StartMode::Resume if state.status.resumes_at_cursor() => {
                info!(
                    page = state.cursor.page,
                    item = state.cursor.item_index,
                    previous = %state.status,
                    "Resuming interrupted walk"
                );
                state.resume(config_hash);
            }
            StartMode::Resume => {
                info!(previous = %state.status, "No interrupted walk, starting from page 1");
                state.restart(config_hash);
            }
        }
    }

    async fn walk(&mut self) -> Result<WalkEnd> {
        let mut page = self.stores.state.cursor.page.max(1);
        let mut resume_index = self.stores.state.cursor.item_index;

        let mut list = self.open_list(page).await?;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(WalkEnd::Cancelled);
            }

            let candidates = parse_list_page(&list.html, &self.config.site.layout).candidates;
            info!(page, candidates = candidates.len(), "Processing list page");

            for (position, candidate) in candidates.iter().enumerate() {
                if position < resume_index {
                    continue;
                }
                if self.cancel.is_cancelled() {
                    return Ok(WalkEnd::Cancelled);
                }

                let outcome = self.process(candidate, page).await?;
                self.stores.state.cursor = Cursor {
                    page,
                    item_index: position + 1,
                };
                if outcome == ItemOutcome::Failed {
                    self.stores.save()?;
                } else {
                    self.stores.outcome_recorded()?;
                }

                if self.items_capped() {
                    info!(collected = self.summary.collected, "Item cap reached");
                    return Ok(WalkEnd::CapReached);
                }
                let early_exit = self.config.crawler.early_exit_after_duplicates;
                if early_exit > 0 && self.duplicate_streak >= early_exit {
                    info!(
                        streak = self.duplicate_streak,
                        "Stopping after consecutive duplicates"
                    );
                    return Ok(WalkEnd::EarlyExit);
                }

                if outcome != ItemOutcome::Duplicate
                    && !pause(&self.cancel, self.config.crawler.delay_between_items_ms).await
                {
                    return Ok(WalkEnd::Cancelled);
                }
            }
            resume_index = 0;

            self.stores.state.stats.pages_crawled += 1;
            self.summary.pages += 1;
            debug!(page, "List page done");

            if self.config.crawler.max_pages > 0
                && self.summary.pages >= u64::from(self.config.crawler.max_pages)
            {
                info!(pages = self.summary.pages, "Page cap reached");
                return Ok(WalkEnd::CapReached);
            }
            if !self.has_next_page(&list, page) {
                info!(page, "Last list page reached");
                return Ok(WalkEnd::Exhausted);
            }

            page += 1;
            self.stores.state.cursor = Cursor {
                page,
                item_index: 0,
            };
            self.stores.save()?;

            if !pause(&self.cancel, self.config.crawler.delay_between_pages_ms).await {
                return Ok(WalkEnd::Cancelled);
            }
            list = self.goto_page(page).await?;
        }
    }

    fn items_capped(&self) -> bool {
        let cap = self.config.crawler.max_items;
        cap > 0 && self.summary.collected >= u64::from(cap)
    }

    /// Handles one candidate: dedup gate, deep crawl, persistence
    async fn process(&mut self, candidate: &Candidate, page: u32) -> Result<ItemOutcome> {
        let number = candidate.notice_number();
        let fingerprint = candidate.fingerprint();

        if self.stores.dedup.contains(&fingerprint) {
            debug!(notice = number, "Already collected, skipping");
            self.stores.state.stats.skipped += 1;
            self.summary.skipped += 1;
            self.duplicate_streak += 1;
            return Ok(ItemOutcome::Duplicate);
        }
        self.duplicate_streak = 0;

        let collected = match self.deep.crawl(&mut self.session, candidate).await {
            Ok(fields) => build_record(fields, page, &self.required),
            Err(failure) => Err(failure),
        };

        let failure = match collected {
            Ok(record) => match self.stores.commit(&record, fingerprint) {
                Ok(()) => {
                    self.stores.state.remove_failed(number);
                    self.stores.state.stats.collected += 1;
                    self.summary.collected += 1;
                    info!(notice = number, page, "Collected");
                    return Ok(ItemOutcome::Collected);
                }
                Err(e) => ItemFailure::new(DeepCrawlState::Done, format!("persisting record: {}", e)),
            },
            Err(failure) => failure,
        };

        let attempts = self.stores.state.record_failure(
            number,
            Some(candidate.notice_name()).filter(|name| !name.is_empty()),
            &failure.to_string(),
        );
        self.stores.state.stats.failed += 1;
        self.summary.failed += 1;
        warn!(notice = number, attempts, "Item failed: {}", failure);

        if failure.session_lost {
            warn!(page, "Session lost its place, reloading the list");
            self.goto_page(page).await?;
        }
        Ok(ItemOutcome::Failed)
    }

    /// Loads the list URL and moves to `page`
    async fn open_list(&mut self, page: u32) -> NavResult<Content> {
        let config = self.config;
        let layout = &config.site.layout;
        self.session.render(&config.site.list_url).await?;
        let first = self.session.wait_for(&layout.list_ready).await?;
        if page <= 1 {
            return Ok(first);
        }
        self.advance_to(page, first).await
    }

    /// Moves the list to `page`, reloading from the list URL if needed
    async fn goto_page(&mut self, page: u32) -> NavResult<Content> {
        let current = self.session.current_content().await?;
        if current.contains(&self.config.site.layout.list_ready) {
            self.advance_to(page, current).await
        } else {
            self.open_list(page).await
        }
    }

    /// Clicks through the pagination control until `page` is selected
    ///
    /// Pages outside the visible group are reached through the next-group
    /// button, one group at a time.
    async fn advance_to(&mut self, page: u32, mut content: Content) -> NavResult<Content> {
        let config = self.config;
        let layout = &config.site.layout;
        let link = layout.page_link_for(page);

        for _ in 0..page {
            if self.selected_page(&content) == Some(page) {
                return Ok(content);
            }
            if content.contains(&link) {
                self.session.open(&link, &layout.list_ready).await?;
                return self.settle_on(page).await;
            }
            if !content.contains(&layout.next_group) {
                break;
            }
            debug!(page, "Page link not visible, moving to the next page group");
            content = self
                .session
                .open(&layout.next_group, &layout.list_ready)
                .await?;
        }

        Err(NavError::ElementNotFound(link))
    }

    /// Waits until the pagination control reports `page` as current
    async fn settle_on(&mut self, page: u32) -> NavResult<Content> {
        let deadline = Instant::now() + self.session.element_timeout();
        loop {
            let content = self.session.current_content().await?;
            match self.selected_page(&content) {
                Some(selected) if selected != page => {}
                // Sites without a selected-page marker are trusted
                _ => return Ok(content),
            }
            if Instant::now() >= deadline {
                return Err(NavError::Timeout {
                    locator: self.config.site.layout.page_link_for(page),
                    waited_ms: self.config.crawler.element_timeout_ms,
                });
            }
            tokio::time::sleep(PAGE_SETTLE_POLL).await;
        }
    }

    fn selected_page(&self, content: &Content) -> Option<u32> {
        parse_list_page(&content.html, &self.config.site.layout).selected_page
    }

    fn has_next_page(&self, list: &Content, page: u32) -> bool {
        let layout = &self.config.site.layout;
        list.contains(&layout.page_link_for(page + 1)) || list.contains(&layout.next_group)
    }
}
