//! Terminal rendering of crawl results

use crate::crawler::CrawlResult;
use chrono::{DateTime, Utc};

/// Renders one `value \t| page` line per record
pub fn format_results(result: &CrawlResult) -> String {
    result
        .records
        .iter()
        .map(|record| format!("{} \t| {}\n", record.value, record.page))
        .collect()
}

/// Prints run counters to stdout
pub fn print_summary(result: &CrawlResult) {
    println!("=== Crawl Summary ===\n");
    println!("Pages fetched: {}", result.pages_fetched);
    println!("Items found:   {}", result.items_found());
    println!("Elapsed:       {:.2}s", result.elapsed_seconds());
    if !result.visited.is_empty() {
        println!("\nPages:");
        for url in &result.visited {
            println!("  - {}", url);
        }
    }
    println!("\n{}", result.status_line());
}

/// Builds a timestamped export file name: `<stem>_YYYYmmdd_HHMMSS.<ext>`
pub fn default_export_name(stem: &str, ext: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.{}", stem, now.format("%Y%m%d_%H%M%S"), ext)
}
