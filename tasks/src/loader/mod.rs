//! Table loading for CSV (plain or gzip-compressed) and Excel files.
//!
//! [`load_table`] picks the reader from the file name (see [`format`]), then
//! hands off to [`load_csv`] or [`load_xls`]. Both readers refuse tables that
//! parse fine but hold no data rows.
//!
//! ```rust,ignore
//! use data_tasks::loader::{load_table, LoadOptions};
//! use data_tasks::logs::ConsoleLogger;
//!
//! let table = load_table("visits.csv.gz".as_ref(), &LoadOptions::default(), &ConsoleLogger::default())?;
//! println!("{} rows", table.height());
//! ```

pub mod delimited;
pub mod format;
pub mod workbook;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{LoadError, LoadResult, ValidationError};
use crate::logs::Logger;
use crate::models::Table;

pub use delimited::load_csv;
pub use format::{is_csv, is_excel, sniff, Format};
pub use workbook::load_xls;

/// Worksheet to read from a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

/// Options for loading a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Worksheet for Excel files (default: first sheet)
    #[serde(default)]
    pub sheet: SheetSelector,

    /// CSV delimiter (auto-detect if not specified)
    #[serde(default)]
    pub delimiter: Option<char>,

    /// CSV text encoding label (auto-detect if not specified)
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Load a CSV or Excel table, choosing the reader from the file name.
pub fn load_table(path: &Path, options: &LoadOptions, log: &dyn Logger) -> LoadResult<Table> {
    match sniff(path) {
        Format::Csv => load_csv(path, options, log),
        Format::Excel => load_xls(path, options, log),
        Format::Unknown => {
            let file = file_name(path);
            log.error(&format!("Cannot tell how to read {}: expected a csv, xls or xlsx file.", file));
            Err(LoadError::UnknownFormat { file })
        }
    }
}

/// File name used in messages.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reject parsed tables without data rows.
pub(crate) fn ensure_not_empty(table: Table, file: &str, log: &dyn Logger) -> LoadResult<Table> {
    if table.is_empty() {
        let err = ValidationError::EmptyTable { file: file.to_string() };
        log.error(&err.to_string());
        return Err(err.into());
    }
    Ok(table)
}

/// Cell contents read as missing.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub(crate) fn is_na_token(s: &str) -> bool {
    NA_TOKENS.contains(&s)
}

/// Header text, or `Unnamed: {index}` when the cell is blank.
pub(crate) fn header_or_unnamed(index: usize, name: &str) -> String {
    if name.trim().is_empty() {
        format!("Unnamed: {}", index)
    } else {
        name.to_string()
    }
}

/// Make header names unique: repeated `a` becomes `a.1`, `a.2`, ...
pub(crate) fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for name in headers {
        let count = seen.entry(name.clone()).or_insert(0);
        if *count == 0 {
            out.push(name);
        } else {
            out.push(format!("{}.{}", name, count));
        }
        *count += 1;
    }

    out
}
