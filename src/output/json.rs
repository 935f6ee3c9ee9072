//! JSON export

use crate::crawler::{CrawlResult, ExtractedRecord};
use crate::output::{ExportError, ExportResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Renders records as a pretty-printed JSON array of `{"page", "value"}` objects
///
/// Non-ASCII characters are written as-is, not escaped.
pub fn to_json_string(records: &[ExtractedRecord]) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Writes a run's records to `path` as UTF-8 JSON; refuses an empty run
pub fn write_json(result: &CrawlResult, path: &Path) -> ExportResult<()> {
    if result.is_empty() {
        return Err(ExportError::Empty);
    }
    let json = to_json_string(&result.records)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    tracing::info!("Saved JSON to {}", path.display());
    Ok(())
}
