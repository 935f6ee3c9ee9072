//! Output module for exporting and displaying crawl results
//!
//! This module handles:
//! - Writing records to CSV (`page,value`) and pretty-printed JSON
//! - Writing extracted tables to CSV
//! - Rendering results and run summaries for the terminal

mod csv;
mod json;
mod summary;

pub use self::csv::{table_to_csv_string, to_csv_string, write_csv, write_table_csv};
pub use self::json::{to_json_string, write_json};
pub use self::summary::{default_export_name, format_results, print_summary};

use thiserror::Error;

/// Errors that can occur during export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No results to export")]
    Empty,

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
