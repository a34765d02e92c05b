use serde::Deserialize;

/// Main configuration structure for Notice-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// URL of the notice list page
    #[serde(rename = "list-url")]
    pub list_url: String,

    /// Whether to probe the list URL over plain HTTP before starting the browser
    #[serde(rename = "reachability-check", default = "default_true")]
    pub reachability_check: bool,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// CSS locators describing the site's structure
    #[serde(default)]
    pub layout: SiteLayout,
}

/// CSS locators for every element the crawl interacts with
///
/// The defaults describe the WebSquare-based listing the crawler was built
/// for. `page-link` contains a `{page}` placeholder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SiteLayout {
    pub list_ready: String,
    pub row: String,
    pub number_cell: String,
    pub name_cell: String,
    pub organization_cell: String,
    pub announcement_date_cell: String,
    pub deadline_date_cell: String,
    pub row_link: String,
    pub page_link: String,
    pub next_group: String,
    pub selected_page: String,
    pub detail_ready: String,
    pub detail_scope: String,
    pub modal_open: String,
    pub modal_ready: String,
    pub modal_scope: String,
    pub modal_close: String,
    pub popup_open: String,
    pub popup_ready: String,
    pub popup_scope: String,
    pub popup_close: String,
    pub open_window: String,
    pub back_to_list: String,
    pub search_input: String,
    pub search_button: String,
    pub excluded_regions: Vec<String>,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            list_ready: "#mf_wfm_container_grdBidPbancList_body_table, .w2grid_body_table"
                .to_string(),
            row: "tr.grid_body_row".to_string(),
            number_cell: r#"td[col_id="bidPbancNum"]"#.to_string(),
            name_cell: r#"td[col_id="bidPbancNm"]"#.to_string(),
            organization_cell: r#"td[col_id="grpNm"]"#.to_string(),
            announcement_date_cell: r#"td[col_id="pbancPstgDt"]"#.to_string(),
            deadline_date_cell: r#"td[col_id="slprRcptDdlnDt"]"#.to_string(),
            row_link: r#"td[col_id="bidPbancNm"]"#.to_string(),
            page_link: "#mf_wfm_container_pagelist_page_{page}".to_string(),
            next_group: "#mf_wfm_container_pagelist_next_btn".to_string(),
            selected_page: ".w2pageList_col_selected, .w2pageList_label_selected".to_string(),
            detail_ready: ".w2tabcontrol_contents_wrapper_selected".to_string(),
            detail_scope: ".w2tabcontrol_contents_wrapper_selected".to_string(),
            modal_open: "#mf_wfm_container_btnBidPbancP".to_string(),
            modal_ready: ".w2window_content".to_string(),
            modal_scope: ".w2window_content".to_string(),
            modal_close: ".w2window_close".to_string(),
            popup_open: r#"[id*="btnUsrDtail"]"#.to_string(),
            popup_ready: "#mf_wfm_container_BidPbancUsrP_close".to_string(),
            popup_scope: "#mf_wfm_container_BidPbancUsrP".to_string(),
            popup_close: "#mf_wfm_container_BidPbancUsrP_close".to_string(),
            open_window: ".w2window".to_string(),
            back_to_list: r#"a[id*="btn_menuLvl3"]"#.to_string(),
            search_input: "#mf_wfm_container_tbxBidPbancNo".to_string(),
            search_button: "#mf_wfm_container_btnS0001".to_string(),
            excluded_regions: vec![
                "#mf_wfm_container_shcBidPbanc".to_string(),
                "#mf_wfm_container_grpSrchBox".to_string(),
                ".sh_group".to_string(),
            ],
        }
    }
}

impl SiteLayout {
    /// Locator of the numbered pagination link for `page`
    pub fn page_link_for(&self, page: u32) -> String {
        self.page_link.replace("{page}", &page.to_string())
    }

    /// Locator of the clickable cell inside the grid row at `position`
    ///
    /// `position` is the row's 1-based `nth-of-type` position, counted over
    /// every sibling element with the same tag (header rows included), as
    /// reported by `Candidate::row_position`.
    pub fn row_link_for(&self, position: usize) -> String {
        format!("{}:nth-of-type({}) {}", self.row, position, self.row_link)
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of list pages to walk (0 = unlimited)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u32,

    /// Maximum number of new records to collect in one run (0 = unlimited)
    #[serde(rename = "max-items", default)]
    pub max_items: u32,

    /// Timeout for loading a URL (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Timeout for a single wait-for-element (milliseconds)
    #[serde(rename = "element-timeout-ms", default = "default_element_timeout")]
    pub element_timeout_ms: u64,

    /// In-place retries of a navigation step that failed transiently
    #[serde(rename = "transient-retries", default = "default_transient_retries")]
    pub transient_retries: u32,

    /// Maximum attempts to dismiss an open modal or popup
    #[serde(rename = "dismiss-attempts", default = "default_dismiss_attempts")]
    pub dismiss_attempts: u32,

    /// Pause between items (milliseconds)
    #[serde(rename = "delay-between-items-ms", default)]
    pub delay_between_items_ms: u64,

    /// Pause between list pages (milliseconds)
    #[serde(rename = "delay-between-pages-ms", default = "default_page_delay")]
    pub delay_between_pages_ms: u64,

    /// Stop the run after this many consecutive duplicates (0 = never)
    #[serde(rename = "early-exit-after-duplicates", default)]
    pub early_exit_after_duplicates: u32,

    /// Fields whose absence turns an otherwise collected item into a failure
    #[serde(rename = "required-fields", default)]
    pub required_fields: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 0,
            max_items: 0,
            navigation_timeout_ms: default_navigation_timeout(),
            element_timeout_ms: default_element_timeout(),
            transient_retries: default_transient_retries(),
            dismiss_attempts: default_dismiss_attempts(),
            delay_between_items_ms: 0,
            delay_between_pages_ms: default_page_delay(),
            early_exit_after_duplicates: 0,
            required_fields: Vec::new(),
        }
    }
}

/// Failed-item retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Items whose attempt count exceeds this are left for manual inspection
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Checkpoint and deduplication state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Directory holding the checkpoint, dedup index and run lock
    #[serde(default = "default_state_dir")]
    pub directory: String,

    #[serde(rename = "checkpoint-file", default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    #[serde(rename = "dedup-file", default = "default_dedup_file")]
    pub dedup_file: String,

    /// Flush the checkpoint every N item outcomes
    #[serde(rename = "save-interval", default = "default_save_interval")]
    pub save_interval: u32,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            directory: default_state_dir(),
            checkpoint_file: default_checkpoint_file(),
            dedup_file: default_dedup_file(),
            save_interval: default_save_interval(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for the record database and exports
    #[serde(default = "default_output_dir")]
    pub directory: String,

    /// File name of the SQLite record store inside `directory`
    #[serde(rename = "database-file", default = "default_database_file")]
    pub database_file: String,

    /// Export formats written at the end of a run ("json", "csv")
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            database_file: default_database_file(),
            formats: default_formats(),
        }
    }
}

/// Scheduled-mode configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between the start of consecutive scheduled runs
    #[serde(rename = "interval-minutes", default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_element_timeout() -> u64 {
    10_000
}

fn default_transient_retries() -> u32 {
    2
}

fn default_dismiss_attempts() -> u32 {
    3
}

fn default_page_delay() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_state_dir() -> String {
    "checkpoints".to_string()
}

fn default_checkpoint_file() -> String {
    "crawler_checkpoint.json".to_string()
}

fn default_dedup_file() -> String {
    "seen_items.json".to_string()
}

fn default_save_interval() -> u32 {
    1
}

fn default_output_dir() -> String {
    "data".to_string()
}

fn default_database_file() -> String {
    "notices.db".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string(), "csv".to_string()]
}

fn default_interval_minutes() -> u64 {
    360
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_link_uses_position_as_given() {
        let layout = SiteLayout {
            row: "tr.row".to_string(),
            row_link: "td.name a".to_string(),
            ..SiteLayout::default()
        };
        assert_eq!(layout.row_link_for(3), "tr.row:nth-of-type(3) td.name a");
    }
}
