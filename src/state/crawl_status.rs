use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a crawl as recorded in the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    /// No run has touched this checkpoint yet
    #[default]
    Initialized,

    /// A run is walking pages, or crashed while doing so
    InProgress,

    /// The last run was interrupted and flushed its state
    Paused,

    /// The last run walked every page it was asked to
    Completed,

    /// The last run stopped on a run-level error
    Failed,
}

impl CrawlStatus {
    /// Returns true if a resumed run should continue from the saved cursor
    ///
    /// A completed crawl restarts from page 1 so new notices are picked up.
    pub fn resumes_at_cursor(&self) -> bool {
        matches!(self, Self::InProgress | Self::Paused | Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "initialized" => Some(Self::Initialized),
            "in_progress" => Some(Self::InProgress),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_policy() {
        assert!(CrawlStatus::InProgress.resumes_at_cursor());
        assert!(CrawlStatus::Paused.resumes_at_cursor());
        assert!(CrawlStatus::Failed.resumes_at_cursor());
        assert!(!CrawlStatus::Completed.resumes_at_cursor());
        assert!(!CrawlStatus::Initialized.resumes_at_cursor());
    }

    #[test]
    fn test_db_string_matches_serde() {
        for status in [
            CrawlStatus::Initialized,
            CrawlStatus::InProgress,
            CrawlStatus::Paused,
            CrawlStatus::Completed,
            CrawlStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.to_db_string()));
            assert_eq!(CrawlStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(CrawlStatus::from_db_string("running"), None);
    }
}
