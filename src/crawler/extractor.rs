//! Selector-driven value extraction
//!
//! This module turns an HTML document into values:
//! - Text or attribute values for every node matching a CSS selector
//! - Header and body cells of a table located by a selector
//!
//! Parsing is forgiving: html5ever recovers from malformed markup, so any
//! input string yields a document. Only an invalid selector is an error.

use crate::{ExtractError, ExtractResult};
use scraper::{ElementRef, Html, Selector};

/// Compiles a CSS selector, keeping the offending text in the error
pub fn compile_selector(selector: &str) -> ExtractResult<Selector> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// What to read from each matched node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Trimmed text content of the node and its descendants
    Text,
    /// The named attribute, or "" when the node does not carry it
    Attribute(String),
}

impl ValueSource {
    /// Absent, blank, or "text" (any case) selects text content
    pub fn from_attribute(attribute: Option<&str>) -> Self {
        match attribute.map(str::trim) {
            None | Some("") => Self::Text,
            Some(name) if name.eq_ignore_ascii_case("text") => Self::Text,
            Some(name) => Self::Attribute(name.to_string()),
        }
    }

    fn read(&self, element: ElementRef<'_>) -> String {
        match self {
            Self::Text => element_text(element),
            Self::Attribute(name) => element.value().attr(name).unwrap_or("").to_string(),
        }
    }
}

/// A compiled selector plus the value to read from each match
#[derive(Debug, Clone)]
pub struct Extractor {
    selector: Selector,
    source: ValueSource,
}

impl Extractor {
    pub fn new(selector: &str, attribute: Option<&str>) -> ExtractResult<Self> {
        Ok(Self {
            selector: compile_selector(selector)?,
            source: ValueSource::from_attribute(attribute),
        })
    }

    /// Extracts one value per matching node, in document order
    pub fn extract(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        self.extract_from(&document)
    }

    /// Same as `extract`, against an already parsed document
    pub fn extract_from(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.selector)
            .map(|element| self.source.read(element))
            .collect()
    }
}

/// Extracts values from `html` for every node matching `selector`
///
/// Returns one entry per match, duplicates included. When `attribute` is
/// None or "text", each entry is the node's trimmed text; otherwise it is
/// the attribute value or an empty string.
///
/// # Example
///
/// ```
/// use pagetrawl::crawler::extract;
///
/// let html = r#"<ul><li><a href="/a">A</a></li><li><a>B</a></li></ul>"#;
/// assert_eq!(extract(html, "li a", None).unwrap(), vec!["A", "B"]);
/// assert_eq!(extract(html, "li a", Some("href")).unwrap(), vec!["/a", ""]);
/// ```
pub fn extract(html: &str, selector: &str, attribute: Option<&str>) -> ExtractResult<Vec<String>> {
    Ok(Extractor::new(selector, attribute)?.extract(html))
}

/// Text nodes of an element and its descendants, each trimmed, blanks dropped, joined
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Header and body cells of an HTML table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// True when there are no headers or no data rows
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }
}

/// Extracts the first table matching `table_selector`
///
/// Headers come from the `th` cells of the first row; data rows come from
/// the `td` cells of each later row, skipping rows without any `td`.
///
/// # Returns
///
/// * `Ok(None)` - No element matched: the table is absent
/// * `Ok(Some(table))` - The table exists, possibly with no headers or rows
/// * `Err(ExtractError)` - The selector is invalid
pub fn extract_table(html: &str, table_selector: &str) -> ExtractResult<Option<Table>> {
    let table_selector = compile_selector(table_selector)?;
    let row_selector = compile_selector("tr")?;
    let header_selector = compile_selector("th")?;
    let cell_selector = compile_selector("td")?;

    let document = Html::parse_document(html);
    let Some(table) = document.select(&table_selector).next() else {
        return Ok(None);
    };

    let mut rows = table.select(&row_selector);

    let headers: Vec<String> = rows
        .next()
        .map(|row| row.select(&header_selector).map(element_text).collect())
        .unwrap_or_default();

    let rows = rows
        .map(|row| row.select(&cell_selector).map(element_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    Ok(Some(Table { headers, rows }))
}
