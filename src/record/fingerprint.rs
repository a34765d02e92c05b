use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deduplication key of a notice
///
/// SHA-256 over the trimmed, lowercased `notice_number|notice_name`.
/// Distinct notices sharing a fingerprint are treated as the same notice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(notice_number: &str, notice_name: &str) -> Self {
        let key = format!(
            "{}|{}",
            notice_number.trim().to_lowercase(),
            notice_name.trim().to_lowercase()
        );
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 12 hex chars are plenty for log lines
        write!(f, "{}", &self.0[..self.0.len().min(12)])
    }
}
