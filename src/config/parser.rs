use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use notice_sweep::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Max pages: {}", config.crawler.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored in the checkpoint so a resumed run can tell when the
/// configuration changed underneath it.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let config_content = r#"
[site]
list-url = "https://nuri.example.go.kr/list"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.list_url, "https://nuri.example.go.kr/list");
        assert!(config.site.reachability_check);
        assert!(config.site.headless);
        assert_eq!(config.crawler.max_pages, 0);
        assert_eq!(config.crawler.transient_retries, 2);
        assert_eq!(config.crawler.dismiss_attempts, 3);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.state.directory, "checkpoints");
        assert_eq!(config.output.formats, vec!["json", "csv"]);
        assert_eq!(config.site.layout.row, "tr.grid_body_row");
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[site]
list-url = "https://nuri.example.go.kr/list"
reachability-check = false
headless = false

[site.layout]
row = "tr.notice"
page-link = "a.page-{page}"

[crawler]
max-pages = 5
max-items = 40
element-timeout-ms = 2500
early-exit-after-duplicates = 30
required-fields = ["opening_date"]

[retry]
max-attempts = 5

[state]
directory = "/tmp/sweep-state"
save-interval = 10

[output]
directory = "/tmp/sweep-out"
formats = ["json"]

[scheduler]
interval-minutes = 60
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert!(!config.site.reachability_check);
        assert!(!config.site.headless);
        assert_eq!(config.site.layout.row, "tr.notice");
        assert_eq!(config.site.layout.page_link_for(7), "a.page-7");
        // Unspecified layout keys keep their defaults
        assert_eq!(config.site.layout.search_button, "#mf_wfm_container_btnS0001");
        assert_eq!(config.crawler.max_pages, 5);
        assert_eq!(config.crawler.max_items, 40);
        assert_eq!(config.crawler.element_timeout_ms, 2500);
        assert_eq!(config.crawler.early_exit_after_duplicates, 30);
        assert_eq!(config.crawler.required_fields, vec!["opening_date"]);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.state.save_interval, 10);
        assert!(config.exports("json"));
        assert!(!config.exports("csv"));
        assert_eq!(config.scheduler.interval_minutes, 60);
        assert!(config
            .checkpoint_path()
            .ends_with("sweep-state/crawler_checkpoint.json"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_missing_site_section() {
        let file = create_temp_config("[crawler]\nmax-pages = 1\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[site]
list-url = "https://nuri.example.go.kr/list"

[crawler]
dismiss-attempts = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
