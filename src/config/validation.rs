use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, SiteLayout, StateConfig,
};
use crate::record::NoticeField;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

const KNOWN_FORMATS: &[&str] = &["json", "csv"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_state_config(&config.state)?;
    validate_output_config(&config.output)?;

    if config.scheduler.interval_minutes == 0 {
        return Err(ConfigError::Validation(
            "scheduler interval-minutes must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the target site and its layout locators
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.list_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid list-url: {}", e)))?;

    if url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "list-url '{}' must use HTTPS scheme",
            config.list_url
        )));
    }

    validate_layout(&config.layout)
}

/// Validates that every layout locator is a parsable CSS selector
fn validate_layout(layout: &SiteLayout) -> Result<(), ConfigError> {
    if !layout.page_link.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "page-link '{}' must contain a {{page}} placeholder",
            layout.page_link
        )));
    }

    let locators = [
        &layout.list_ready,
        &layout.row,
        &layout.number_cell,
        &layout.name_cell,
        &layout.organization_cell,
        &layout.announcement_date_cell,
        &layout.deadline_date_cell,
        &layout.row_link,
        &layout.next_group,
        &layout.selected_page,
        &layout.detail_ready,
        &layout.detail_scope,
        &layout.modal_open,
        &layout.modal_ready,
        &layout.modal_scope,
        &layout.modal_close,
        &layout.popup_open,
        &layout.popup_ready,
        &layout.popup_scope,
        &layout.popup_close,
        &layout.open_window,
        &layout.back_to_list,
        &layout.search_input,
        &layout.search_button,
    ];

    for locator in locators {
        validate_locator(locator)?;
    }
    validate_locator(&layout.page_link_for(1))?;
    validate_locator(&layout.row_link_for(1))?;
    for region in &layout.excluded_regions {
        validate_locator(region)?;
    }

    Ok(())
}

/// Validates a single CSS locator
fn validate_locator(locator: &str) -> Result<(), ConfigError> {
    if locator.trim().is_empty() {
        return Err(ConfigError::InvalidLocator {
            locator: locator.to_string(),
            reason: "locator cannot be empty".to_string(),
        });
    }

    Selector::parse(locator).map_err(|e| ConfigError::InvalidLocator {
        locator: locator.to_string(),
        reason: format!("{:?}", e),
    })?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.element_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "element-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.dismiss_attempts < 1 || config.dismiss_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "dismiss-attempts must be between 1 and 10, got {}",
            config.dismiss_attempts
        )));
    }

    if config.transient_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "transient-retries must be <= 10, got {}",
            config.transient_retries
        )));
    }

    for name in &config.required_fields {
        if NoticeField::from_name(name).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown required field '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates checkpoint/dedup state configuration
fn validate_state_config(config: &StateConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "state directory cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_file.is_empty() || config.dedup_file.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-file and dedup-file cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_file == config.dedup_file {
        return Err(ConfigError::Validation(format!(
            "checkpoint-file and dedup-file must differ, both are '{}'",
            config.checkpoint_file
        )));
    }

    if config.save_interval < 1 {
        return Err(ConfigError::Validation(
            "save-interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.database_file.is_empty() {
        return Err(ConfigError::Validation(
            "database-file cannot be empty".to_string(),
        ));
    }

    for format in &config.formats {
        if !KNOWN_FORMATS.contains(&format.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown output format '{}', expected one of {:?}",
                format, KNOWN_FORMATS
            )));
        }
    }

    Ok(())
}
