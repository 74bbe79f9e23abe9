//! HTML table extraction.
//!
//! The site ships some tables inside HTML comments and un-comments them with
//! JavaScript, so when the anchor is not part of the live document every
//! comment body that mentions it is parsed as a fragment and searched too.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static HEADER_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("thead tr").unwrap());
static BODY_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody tr").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Row classes the site uses for repeated headers and separators.
const STRUCTURAL_ROW_CLASSES: &[&str] = &["thead", "spacer", "over_header"];

/// Text and first link target of one table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCell {
    pub text: String,
    pub link: Option<String>,
}

impl RawCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: None,
        }
    }

    pub fn linked(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(href.into()),
        }
    }
}

/// Source field name to raw cell content.
pub type RawRow = BTreeMap<String, RawCell>;

/// The expected table structure was absent or malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' has no header row")]
    MissingHeader(String),
}

/// Extract the data rows of the table whose id is `anchor`.
pub fn extract_table(markup: &str, anchor: &str) -> Result<Vec<RawRow>, ExtractError> {
    let document = Html::parse_document(markup);
    if let Some(table) = find_table(&document, anchor) {
        return read_table(table, anchor);
    }

    for node in document.tree.root().descendants() {
        let Some(comment) = node.value().as_comment() else {
            continue;
        };
        let body: &str = comment;
        if !body.contains(anchor) {
            continue;
        }
        let fragment = Html::parse_fragment(body);
        if let Some(table) = find_table(&fragment, anchor) {
            debug!("Found table '{}' inside an HTML comment", anchor);
            return read_table(table, anchor);
        }
    }

    Err(ExtractError::TableNotFound(anchor.to_string()))
}

fn find_table<'a>(document: &'a Html, anchor: &str) -> Option<ElementRef<'a>> {
    document
        .select(&TABLE)
        .find(|table| table.value().id() == Some(anchor))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn cells(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
}

fn read_table(table: ElementRef<'_>, anchor: &str) -> Result<Vec<RawRow>, ExtractError> {
    // The last header row carries the column names; earlier ones are groupings.
    let header_row = table
        .select(&HEADER_ROW)
        .last()
        .ok_or_else(|| ExtractError::MissingHeader(anchor.to_string()))?;

    let headers: Vec<String> = cells(header_row)
        .map(|th| {
            th.value()
                .attr("data-stat")
                .map(str::to_string)
                .unwrap_or_else(|| cell_text(th))
        })
        .collect();

    let mut rows = Vec::new();
    for row in table.select(&BODY_ROW) {
        if row
            .value()
            .classes()
            .any(|class| STRUCTURAL_ROW_CLASSES.contains(&class))
        {
            continue;
        }
        if !cells(row).any(|c| c.value().name() == "td") {
            continue;
        }

        let mut raw = RawRow::new();
        for (index, cell) in cells(row).enumerate() {
            let key = match cell.value().attr("data-stat") {
                Some(stat) => stat.to_string(),
                None => match headers.get(index) {
                    Some(h) if !h.is_empty() => h.clone(),
                    _ => continue,
                },
            };
            let link = cell
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);
            raw.entry(key).or_insert(RawCell {
                text: cell_text(cell),
                link,
            });
        }
        rows.push(raw);
    }

    debug!("Extracted {} rows from table '{}'", rows.len(), anchor);
    Ok(rows)
}
