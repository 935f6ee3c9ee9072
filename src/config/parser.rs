use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses configuration from TOML text without validating it
///
/// Callers that merge further settings (e.g. command-line flags) validate
/// the merged result themselves.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

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
/// use pagetrawl::config::load_config;
///
/// let config = load_config(Path::new("trawl.toml")).unwrap();
/// println!("Start URL: {}", config.crawl.start_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    validate(&config.crawl)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be matched to the exact file that drove it.
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
    fn test_load_valid_config() {
        let config_content = r#"
[crawl]
start-url = "https://example.com/list"
selector = "li.item a"
attribute = "href"
next-selector = "a.next"
max-pages = 3
delay-ms = 250
user-agent = "TestCrawler/1.0"
timeout-secs = 5

[output]
csv-path = "out.csv"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.start_url, "https://example.com/list");
        assert_eq!(config.crawl.attribute.as_deref(), Some("href"));
        assert_eq!(config.crawl.next_selector.as_deref(), Some("a.next"));
        assert_eq!(config.crawl.max_pages, 3);
        assert_eq!(config.crawl.delay_ms, 250);
        assert_eq!(config.crawl.user_agent, "TestCrawler/1.0");
        assert_eq!(config.crawl.timeout_secs, 5);
        assert_eq!(config.output.csv_path.as_deref(), Some("out.csv"));
        assert!(config.output.json_path.is_none());
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(
            r#"
[crawl]
start-url = "https://example.com/"
selector = "h1"
"#,
        )
        .unwrap();

        assert_eq!(config.crawl.max_pages, 1);
        assert_eq!(config.crawl.delay_ms, 1000);
        assert_eq!(config.crawl.timeout_secs, 10);
        assert_eq!(config.crawl.user_agent, crate::config::DEFAULT_USER_AGENT);
        assert!(config.crawl.attribute.is_none());
        assert!(config.crawl.next_selector.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/trawl.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawl]
start-url = "https://example.com/"
selector = "h1"
max-pages = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
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
