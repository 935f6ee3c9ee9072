//! CSV export
//!
//! Rows end with CRLF. Fields containing a comma, quote, CR or LF are quoted
//! and inner quotes doubled.

use crate::crawler::{CrawlResult, ExtractedRecord, Table};
use crate::output::{ExportError, ExportResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const LINE_END: &str = "\r\n";

/// Escapes a string for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let row: Vec<String> = fields.into_iter().map(escape_csv).collect();
    out.push_str(&row.join(","));
    out.push_str(LINE_END);
}

/// Renders records as CSV with a `page,value` header
pub fn to_csv_string(records: &[ExtractedRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, ["page", "value"]);
    for record in records {
        push_row(&mut out, [record.page.as_str(), record.value.as_str()]);
    }
    out
}

/// Writes a run's records to `path` as UTF-8 CSV
///
/// # Returns
///
/// * `Ok(())` - File written
/// * `Err(ExportError::Empty)` - The run produced no records; nothing is written
/// * `Err(ExportError::Io)` - The file could not be written
pub fn write_csv(result: &CrawlResult, path: &Path) -> ExportResult<()> {
    if result.is_empty() {
        return Err(ExportError::Empty);
    }
    let mut file = File::create(path)?;
    file.write_all(to_csv_string(&result.records).as_bytes())?;
    tracing::info!("Saved CSV to {}", path.display());
    Ok(())
}

/// Renders a table as CSV with its own header row
pub fn table_to_csv_string(table: &Table) -> String {
    let mut out = String::new();
    push_row(&mut out, table.headers.iter().map(String::as_str));
    for row in &table.rows {
        push_row(&mut out, row.iter().map(String::as_str));
    }
    out
}

/// Writes a table to `path` as CSV; refuses an empty table
pub fn write_table_csv(table: &Table, path: &Path) -> ExportResult<()> {
    if table.is_empty() {
        return Err(ExportError::Empty);
    }
    let mut file = File::create(path)?;
    file.write_all(table_to_csv_string(table).as_bytes())?;
    tracing::info!("Saved table CSV to {}", path.display());
    Ok(())
}
