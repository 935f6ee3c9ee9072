//! Output records of a crawl run

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One extracted value and the page it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    pub page: String,
    pub value: String,
}

impl ExtractedRecord {
    pub fn new(page: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            value: value.into(),
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// Records in page order, then document order within a page
    pub records: Vec<ExtractedRecord>,

    /// Number of pages fetched and extracted
    pub pages_fetched: u32,

    /// URLs fetched, in fetch order
    pub visited: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    pub fn items_found(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Wall-clock duration of the run in seconds
    pub fn elapsed_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Status line shown when a run completes
    pub fn status_line(&self) -> String {
        format!(
            "Finished: {} items from {} page(s).",
            self.items_found(),
            self.pages_fetched
        )
    }
}
