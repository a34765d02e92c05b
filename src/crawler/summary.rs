use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How a run ended, in the counts a user cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// New records persisted by this run
    pub collected: u64,
    /// Candidates skipped because their fingerprint was already indexed
    pub skipped: u64,
    /// Items that ended in the failed queue during this run
    pub failed: u64,
    /// Queued failures re-collected by a retry run
    pub retried_ok: u64,
    /// Queued failures past the attempt bound, left for manual inspection
    pub retry_exhausted: u64,
    /// List pages fully walked
    pub pages: u64,
    /// The run stopped on a user interrupt
    pub interrupted: bool,
    /// The run stopped after too many consecutive duplicates
    pub early_exit: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total item outcomes recorded by this run
    pub fn processed(&self) -> u64 {
        self.collected + self.skipped + self.failed + self.retried_ok
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.retry_exhausted > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collected {}, skipped {} duplicate(s), failed {}",
            self.collected, self.skipped, self.failed
        )?;
        if self.retried_ok > 0 || self.retry_exhausted > 0 {
            write!(
                f,
                ", retried {} ok, {} exhausted",
                self.retried_ok, self.retry_exhausted
            )?;
        }
        write!(
            f,
            " over {} page(s) in {:.1}s",
            self.pages,
            self.elapsed.as_secs_f64()
        )?;
        if self.early_exit {
            write!(f, " (stopped early on duplicates)")?;
        }
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_run() {
        let summary = RunSummary {
            collected: 9,
            skipped: 3,
            failed: 1,
            pages: 2,
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        assert_eq!(
            summary.to_string(),
            "collected 9, skipped 3 duplicate(s), failed 1 over 2 page(s) in 1.5s"
        );
        assert_eq!(summary.processed(), 13);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_display_retry_and_interrupt() {
        let summary = RunSummary {
            retried_ok: 2,
            retry_exhausted: 1,
            interrupted: true,
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.contains("retried 2 ok, 1 exhausted"));
        assert!(text.ends_with("(interrupted)"));
    }

    #[test]
    fn test_clean_run_has_no_failures() {
        let summary = RunSummary {
            collected: 4,
            ..Default::default()
        };
        assert!(!summary.has_failures());
    }
}
