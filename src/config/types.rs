use serde::Deserialize;
use std::time::Duration;

/// User agent sent when the configuration does not name one
pub const DEFAULT_USER_AGENT: &str = "SimpleScraper/1.0 (+https://github.com/yourname)";

/// Main configuration structure for Pagetrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of a single crawl run
///
/// Immutable once a run has started: the coordinator takes its own copy.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First page to fetch
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// CSS selector for the values to extract
    pub selector: String,

    /// Attribute to read from each match; absent or "text" means visible text
    #[serde(default)]
    pub attribute: Option<String>,

    /// CSS selector locating the "next page" link
    #[serde(rename = "next-selector", default)]
    pub next_selector: Option<String>,

    /// Maximum number of pages to fetch (at least 1)
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause between successive page fetches (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// User-Agent header for every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where results are exported after a successful run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,

    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,
}

fn default_max_pages() -> u32 {
    1
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl CrawlConfig {
    /// Creates a configuration with default limits for the given start page and selector
    pub fn new(start_url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            selector: selector.into(),
            attribute: None,
            next_selector: None,
            max_pages: default_max_pages(),
            delay_ms: default_delay_ms(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
