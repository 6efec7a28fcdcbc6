//! Guess a table's format from its file name.

use std::path::Path;

/// Table format guessed from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Excel,
    Unknown,
}

/// Dot-separated tokens of the file name (`visits.csv.gz` -> `visits`, `csv`, `gz`).
fn name_tokens(path: &Path) -> Vec<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().split('.').map(str::to_string).collect())
        .unwrap_or_default()
}

/// True if the path is probably a csv.
pub fn is_csv(path: &Path) -> bool {
    name_tokens(path).iter().any(|t| t == "csv")
}

/// True if the path is probably an Excel workbook.
pub fn is_excel(path: &Path) -> bool {
    name_tokens(path).iter().any(|t| t == "xls" || t == "xlsx")
}

/// Classify `path` from its name alone. A `csv` token wins over an Excel token.
pub fn sniff(path: &Path) -> Format {
    if is_csv(path) {
        Format::Csv
    } else if is_excel(path) {
        Format::Excel
    } else {
        Format::Unknown
    }
}
