//! Per-item deep crawl
//!
//! Opens one list row's detail view, then the "notice detail" modal, then
//! the "contact detail" popup, extracting each view on the way down and
//! closing them on the way back up. Every step is a transition of
//! `DeepCrawlState`. A failure anywhere moves the machine to `Recovering`,
//! which closes whatever is open and returns the session to the list so the
//! next item starts from a known state.

use crate::config::SiteLayout;
use crate::extract::{extract_view, Candidate, View};
use crate::navigation::Session;
use crate::record::{FieldSet, NoticeField, Record};
use crate::state::DeepCrawlState;
use crate::{NavError, NavResult, SweepError};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause before re-checking an overlay that survived a close click
const DISMISS_SETTLE: Duration = Duration::from_millis(250);

/// Why one item could not be collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// State the machine was in when the failure happened
    pub stage: DeepCrawlState,
    pub reason: String,
    /// Recovery could not bring the list back; the caller must reload it
    pub session_lost: bool,
}

impl ItemFailure {
    pub fn new(stage: DeepCrawlState, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
            session_lost: false,
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.reason)
    }
}

/// Tracks the current state and refuses illegal steps
struct Machine {
    state: DeepCrawlState,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: DeepCrawlState::ListContext,
        }
    }

    fn enter(&mut self, next: DeepCrawlState) -> Result<(), SweepError> {
        if !self.state.can_transition_to(next) {
            return Err(SweepError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "Deep-crawl step");
        self.state = next;
        Ok(())
    }
}

/// Reason text for a navigation failure at `step`
fn nav_reason(step: &str, err: NavError) -> String {
    format!("{} failed: {}", step, err)
}

/// Drives the deep-crawl machine for one item at a time
pub struct DeepCrawler<'a> {
    layout: &'a SiteLayout,
    dismiss_attempts: u32,
}

impl<'a> DeepCrawler<'a> {
    pub fn new(layout: &'a SiteLayout, dismiss_attempts: u32) -> Self {
        Self {
            layout,
            dismiss_attempts: dismiss_attempts.max(1),
        }
    }

    /// Collects the merged fields of `candidate`, leaving the list showing
    pub async fn crawl(
        &self,
        session: &mut Session<'_>,
        candidate: &Candidate,
    ) -> Result<FieldSet, ItemFailure> {
        let mut machine = Machine::new();

        match self.descend(session, &mut machine, candidate).await {
            Ok(fields) => Ok(fields),
            Err(reason) => {
                let mut failure = ItemFailure::new(machine.state, reason);
                warn!(
                    notice = candidate.notice_number(),
                    stage = %failure.stage,
                    "Deep crawl failed: {}",
                    failure.reason
                );
                failure.session_lost = !self.recover(session, &mut machine).await;
                Err(failure)
            }
        }
    }

    async fn descend(
        &self,
        session: &mut Session<'_>,
        machine: &mut Machine,
        candidate: &Candidate,
    ) -> Result<FieldSet, String> {
        let layout = self.layout;
        let number = candidate.notice_number();

        machine
            .enter(DeepCrawlState::Detail)
            .map_err(|e| e.to_string())?;
        let detail_view = session
            .open(&layout.row_link_for(candidate.row_position), &layout.detail_ready)
            .await
            .map_err(|e| nav_reason("opening detail view", e))?;

        let mut fields = extract_view(&detail_view.html, layout, View::Detail);
        if let Some(shown) = fields.get(NoticeField::NoticeNumber) {
            // The detail view may add a revision suffix to the number
            if !shown.contains(number) && !number.contains(shown) {
                return Err(format!(
                    "detail view shows notice {} instead of {}",
                    shown, number
                ));
            }
        }

        if detail_view.contains(&layout.modal_open) {
            machine.enter(DeepCrawlState::Modal).map_err(|e| e.to_string())?;
            let modal_view = session
                .open(&layout.modal_open, &layout.modal_ready)
                .await
                .map_err(|e| nav_reason("opening notice detail modal", e))?;
            fields.fill_missing(&extract_view(&modal_view.html, layout, View::Modal));

            if modal_view.contains(&layout.popup_open) {
                machine.enter(DeepCrawlState::Popup).map_err(|e| e.to_string())?;
                let popup_view = session
                    .open(&layout.popup_open, &layout.popup_ready)
                    .await
                    .map_err(|e| nav_reason("opening contact popup", e))?;
                let contacts = extract_view(&popup_view.html, layout, View::Popup);
                fields.override_with(&contacts, NoticeField::contact_fields());
                fields.fill_missing(&contacts);

                machine
                    .enter(DeepCrawlState::ClosingPopup)
                    .map_err(|e| e.to_string())?;
                self.dismiss(session, &layout.popup_close, &layout.popup_ready)
                    .await
                    .map_err(|e| nav_reason("closing contact popup", e))?;
            } else {
                debug!(notice = number, "No contact popup button in the modal");
            }

            machine
                .enter(DeepCrawlState::ClosingModal)
                .map_err(|e| e.to_string())?;
            self.dismiss(session, &layout.modal_close, &layout.modal_ready)
                .await
                .map_err(|e| nav_reason("closing notice detail modal", e))?;
        } else {
            debug!(notice = number, "No notice detail button on the detail view");
        }

        machine
            .enter(DeepCrawlState::ReturningToList)
            .map_err(|e| e.to_string())?;
        session
            .open(&layout.back_to_list, &layout.list_ready)
            .await
            .map_err(|e| nav_reason("returning to list", e))?;
        machine.enter(DeepCrawlState::Done).map_err(|e| e.to_string())?;

        // The list row is the dedup key, so its number and name win
        fields.override_with(
            &candidate.fields,
            &[NoticeField::NoticeNumber, NoticeField::NoticeName],
        );
        fields.fill_missing(&candidate.fields);
        Ok(fields)
    }

    /// Closes an overlay with bounded attempts: close button first, then Escape
    ///
    /// Succeeds once `open_marker` is gone from the page.
    async fn dismiss(
        &self,
        session: &mut Session<'_>,
        close: &str,
        open_marker: &str,
    ) -> NavResult<()> {
        for attempt in 1..=self.dismiss_attempts {
            match session.try_click(close).await {
                Ok(()) | Err(NavError::ElementNotFound(_)) => {}
                Err(e) => debug!(attempt, "Close click failed: {}", e),
            }
            if !session.current_content().await?.contains(open_marker) {
                return Ok(());
            }

            tokio::time::sleep(DISMISS_SETTLE).await;
            if !session.current_content().await?.contains(open_marker) {
                return Ok(());
            }

            debug!(attempt, overlay = open_marker, "Overlay still open, sending Escape");
            if let Err(e) = session.press_key("Escape").await {
                debug!(attempt, "Escape failed: {}", e);
            }
            if !session.current_content().await?.contains(open_marker) {
                return Ok(());
            }
        }

        Err(NavError::Failed(format!(
            "'{}' still open after {} dismissal attempt(s)",
            open_marker, self.dismiss_attempts
        )))
    }

    /// Force-closes every overlay and returns to the list
    ///
    /// Returns false if the list could not be reached.
    async fn recover(&self, session: &mut Session<'_>, machine: &mut Machine) -> bool {
        let layout = self.layout;
        if machine.enter(DeepCrawlState::Recovering).is_err() {
            return machine.state.is_at_list();
        }

        let content = match session.current_content().await {
            Ok(content) => content,
            Err(e) => {
                warn!("Recovery could not read the page: {}", e);
                return false;
            }
        };

        if content.contains(&layout.popup_ready) {
            if let Err(e) = self
                .dismiss(session, &layout.popup_close, &layout.popup_ready)
                .await
            {
                warn!("Recovery could not close the contact popup: {}", e);
            }
        }
        if content.contains(&layout.open_window) {
            if let Err(e) = self
                .dismiss(session, &layout.modal_close, &layout.open_window)
                .await
            {
                warn!("Recovery could not close open windows: {}", e);
            }
        }

        let back = match session.current_content().await {
            Ok(content) if content.contains(&layout.back_to_list) => {
                session.open(&layout.back_to_list, &layout.list_ready).await
            }
            Ok(_) => session.wait_for(&layout.list_ready).await,
            Err(e) => Err(e),
        };

        match back {
            Ok(_) => {
                info!("Recovered to the list");
                machine.enter(DeepCrawlState::ListContext).is_ok()
            }
            Err(e) => {
                warn!("Recovery could not return to the list: {}", e);
                false
            }
        }
    }
}

/// Turns merged fields into a record, applying the required-fields gate
pub fn build_record(
    fields: FieldSet,
    source_page: u32,
    required: &[NoticeField],
) -> Result<Record, ItemFailure> {
    let record = Record::from_fields(fields, source_page).ok_or_else(|| {
        ItemFailure::new(DeepCrawlState::Done, "record has no notice number")
    })?;

    let missing = record.missing(required);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
        return Err(ItemFailure::new(
            DeepCrawlState::Done,
            format!("missing required fields: {}", names.join(", ")),
        ));
    }
    Ok(record)
}
