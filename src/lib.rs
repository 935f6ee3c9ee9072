//! Pagetrawl: a selector-driven page scraper
//!
//! This crate fetches web pages, extracts values with CSS selectors, follows
//! "next page" links up to a page limit, and exports the collected records
//! to CSV or JSON.

pub mod config;
pub mod crawler;
pub mod output;

use thiserror::Error;

/// Main error type for Pagetrawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Extract(#[from] ExtractError),

    #[error("{0}")]
    Crawl(#[from] CrawlError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Export error: {0}")]
    Export(#[from] output::ExportError),

    #[error("A crawl is already in progress")]
    Busy,

    #[error("Crawl worker stopped without reporting a result")]
    WorkerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a single HTTP request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timeout")]
    Timeout { url: String, source: reqwest::Error },

    #[error("{source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    /// The URL of the request that failed
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Transport { url, .. } | Self::HttpStatus { url, .. } => {
                url
            }
        }
    }

    /// Wraps a reqwest error, separating timeouts from other transport failures
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                source,
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Errors raised while applying selectors to a document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// A failure that aborted a crawl run, tagged with the page being processed
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        page: u32,
        source: FetchError,
    },

    #[error("Failed to resolve next page link '{href}' on {url}: {source}")]
    Resolve {
        url: String,
        page: u32,
        href: String,
        source: ::url::ParseError,
    },
}

impl CrawlError {
    /// URL being processed when the run aborted
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::Resolve { url, .. } => url,
        }
    }

    /// 1-based index of the page being processed
    pub fn page(&self) -> u32 {
        match self {
            Self::Fetch { page, .. } | Self::Resolve { page, .. } => *page,
        }
    }
}

/// Result type alias for Pagetrawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for extraction operations
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

// Re-export commonly used types
pub use config::{Config, CrawlConfig};
pub use crawler::{CrawlEvent, CrawlResult, Engine, ExtractedRecord};
