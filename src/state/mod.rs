//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus`: Lifecycle of a whole crawl, persisted in the checkpoint
//! - `DeepCrawlState`: Per-item navigation state machine (list → detail → modal → popup → back)

mod crawl_status;
mod deep_crawl;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use deep_crawl::DeepCrawlState;
