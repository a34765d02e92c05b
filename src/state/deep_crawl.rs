//! States of the per-item deep-crawl machine
//!
//! An item walks list → detail → modal → popup and back out again. A view
//! whose opener is absent is skipped. Any state except `Done` may fall into
//! `Recovering`, which force-closes every open overlay and returns the
//! session to the list.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepCrawlState {
    // ===== Base =====
    /// The list grid is showing and no overlay is open
    ListContext,

    // ===== Descending =====
    /// The detail view of the item is open in place
    Detail,

    /// The "notice detail" modal is open over the detail view
    Modal,

    /// The "contact detail" popup is open over the modal
    Popup,

    // ===== Ascending =====
    ClosingPopup,
    ClosingModal,
    ReturningToList,

    /// The item finished and the list is showing again
    Done,

    // ===== Error =====
    /// Force-closing overlays after a failure
    Recovering,
}

impl DeepCrawlState {
    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: DeepCrawlState) -> bool {
        use DeepCrawlState::*;

        if next == Recovering {
            return *self != Done && *self != Recovering;
        }

        matches!(
            (self, next),
            (ListContext, Detail)
                | (Detail, Modal)
                | (Modal, Popup)
                | (Popup, ClosingPopup)
                | (ClosingPopup, ClosingModal)
                | (ClosingModal, ReturningToList)
                | (ReturningToList, Done)
                | (Detail, ReturningToList)
                | (Modal, ClosingModal)
                | (Recovering, ListContext)
                | (Done, ListContext)
        )
    }

    /// Returns true if a modal or popup may be covering the list
    pub fn has_open_overlay(&self) -> bool {
        matches!(
            self,
            Self::Modal | Self::Popup | Self::ClosingPopup | Self::ClosingModal
        )
    }

    /// Returns true if the session is back on the list
    pub fn is_at_list(&self) -> bool {
        matches!(self, Self::ListContext | Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListContext => "list_context",
            Self::Detail => "detail",
            Self::Modal => "modal",
            Self::Popup => "popup",
            Self::ClosingPopup => "closing_popup",
            Self::ClosingModal => "closing_modal",
            Self::ReturningToList => "returning_to_list",
            Self::Done => "done",
            Self::Recovering => "recovering",
        }
    }

    pub fn all_states() -> Vec<Self> {
        vec![
            Self::ListContext,
            Self::Detail,
            Self::Modal,
            Self::Popup,
            Self::ClosingPopup,
            Self::ClosingModal,
            Self::ReturningToList,
            Self::Done,
            Self::Recovering,
        ]
    }
}

impl fmt::Display for DeepCrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
