//! Configuration module for Pagetrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pagetrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawl.toml")).unwrap();
//! println!("Crawler will fetch at most {} page(s)", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, OutputConfig, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
