//! Crawler module for page fetching and value extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a per-run cookie session
//! - Selector-driven extraction of text or attribute values
//! - "Next page" link discovery and URL resolution
//! - The page loop, run exclusivity, and progress events

mod coordinator;
mod events;
mod extractor;
mod fetcher;
mod pagination;
mod result;

pub use coordinator::{fetch_table, preview, run_crawl, Coordinator, Engine, RunHandle};
pub use events::{CancelFlag, CrawlEvent};
pub use extractor::{compile_selector, extract, extract_table, Extractor, Table, ValueSource};
pub use fetcher::{build_http_client, Fetcher};
pub use pagination::{find_next, find_next_in, resolve, NextLink};
pub use result::{CrawlResult, ExtractedRecord};
