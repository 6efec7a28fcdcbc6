//! Excel report writing.
//!
//! A joined result is written the way a two-level column header with a
//! keyed row index usually looks in a spreadsheet:
//!
//! ```text
//!        A        B        C          D
//! 1               Source │ left     │ right    │ indicator
//! 2               Column │ name     │ score    │ FOUND_IN
//! 3      id              │          │          │
//! 4      1               │ A        │ 10       │ both
//! 5      2               │ B        │          │ left_only
//! ```
//!
//! With more than one join column the `Source`/`Column` captions sit above
//! the last index column. Runs of the same source are merged in row 1.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

use crate::error::{ReportError, ReportResult};
use crate::loader::file_name;
use crate::models::{Table, Value};
use crate::transform::join::JoinedTable;

/// Default sheet name for reports.
pub const DEFAULT_SHEET: &str = "Results";

const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

struct Formats {
    header: Format,
    index: Format,
    date: Format,
    index_date: Format,
}

impl Formats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center);
        let index = Format::new().set_bold();
        Self {
            header,
            date: Format::new().set_num_format(DATE_FORMAT),
            index_date: index.clone().set_num_format(DATE_FORMAT),
            index,
        }
    }
}

fn col_num(i: usize) -> Result<u16, XlsxError> {
    u16::try_from(i).map_err(|_| XlsxError::RowColumnLimitError)
}

fn row_num(i: usize) -> Result<u32, XlsxError> {
    u32::try_from(i).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Write one cell. Missing and non-finite values leave the cell blank.
fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: Option<&Format>,
    date_format: &Format,
) -> Result<(), XlsxError> {
    match (value, format) {
        (Value::Null, _) => {}
        (Value::Float(f), _) if !f.is_finite() => {}
        (Value::Date(d), _) => {
            sheet.write_datetime_with_format(row, col, d, date_format)?;
        }
        (Value::Bool(b), Some(fmt)) => {
            sheet.write_boolean_with_format(row, col, *b, fmt)?;
        }
        (Value::Bool(b), None) => {
            sheet.write_boolean(row, col, *b)?;
        }
        (Value::Int(i), Some(fmt)) => {
            sheet.write_number_with_format(row, col, *i as f64, fmt)?;
        }
        (Value::Int(i), None) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        (Value::Float(f), Some(fmt)) => {
            sheet.write_number_with_format(row, col, *f, fmt)?;
        }
        (Value::Float(f), None) => {
            sheet.write_number(row, col, *f)?;
        }
        (Value::Text(s), Some(fmt)) => {
            sheet.write_string_with_format(row, col, s, fmt)?;
        }
        (Value::Text(s), None) => {
            sheet.write_string(row, col, s)?;
        }
    }
    Ok(())
}

fn write_label(sheet: &mut Worksheet, row: u32, first: u16, last: u16, text: &str, fmt: &Format) -> Result<(), XlsxError> {
    if first == last {
        sheet.write_string_with_format(row, first, text, fmt)?;
    } else {
        sheet.merge_range(row, first, row, last, text, fmt)?;
    }
    Ok(())
}

fn fill_joined(sheet: &mut Worksheet, result: &JoinedTable, formats: &Formats) -> Result<(), XlsxError> {
    let n_index = result.index_names.len().max(1);
    let caption_col = col_num(n_index - 1)?;

    // Row 0: source level, row 1: column names
    sheet.write_string_with_format(0, caption_col, "Source", &formats.header)?;
    sheet.write_string_with_format(1, caption_col, "Column", &formats.header)?;

    let mut start = 0;
    while start < result.labels.len() {
        let source = result.labels[start].source;
        let mut end = start;
        while end + 1 < result.labels.len() && result.labels[end + 1].source == source {
            end += 1;
        }
        write_label(
            sheet,
            0,
            col_num(n_index + start)?,
            col_num(n_index + end)?,
            source.as_str(),
            &formats.header,
        )?;
        start = end + 1;
    }

    for (i, label) in result.labels.iter().enumerate() {
        sheet.write_string_with_format(1, col_num(n_index + i)?, &label.name, &formats.header)?;
    }

    // Row 2: index names
    for (i, name) in result.index_names.iter().enumerate() {
        sheet.write_string_with_format(2, col_num(i)?, name, &formats.header)?;
    }

    for (r, (key, values)) in result.index.iter().zip(&result.rows).enumerate() {
        let row = row_num(r + 3)?;
        for (c, value) in key.iter().enumerate() {
            write_value(sheet, row, col_num(c)?, value, Some(&formats.index), &formats.index_date)?;
        }
        for (c, value) in values.iter().enumerate() {
            write_value(sheet, row, col_num(n_index + c)?, value, None, &formats.date)?;
        }
    }

    Ok(())
}

fn fill_table(sheet: &mut Worksheet, table: &Table, formats: &Formats) -> Result<(), XlsxError> {
    for (c, column) in table.columns().iter().enumerate() {
        let col = col_num(c)?;
        sheet.write_string_with_format(0, col, &column.name, &formats.header)?;
        for (r, value) in column.values.iter().enumerate() {
            write_value(sheet, row_num(r + 1)?, col, value, None, &formats.date)?;
        }
    }
    Ok(())
}

fn save_with<F>(path: &Path, sheet_name: &str, fill: F) -> ReportResult<()>
where
    F: FnOnce(&mut Worksheet, &Formats) -> Result<(), XlsxError>,
{
    let wrap = |source: XlsxError| ReportError::Xlsx { file: file_name(path), source };

    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name).map_err(wrap)?;
    fill(sheet, &formats).map_err(wrap)?;
    workbook.save(path).map_err(wrap)?;
    Ok(())
}

/// Write a joined result to a single sheet, keeping the row index.
pub fn write_joined(result: &JoinedTable, path: &Path, sheet_name: &str) -> ReportResult<()> {
    save_with(path, sheet_name, |sheet, formats| fill_joined(sheet, result, formats))
}

/// Write a plain table with a one-row header.
pub fn write_table(table: &Table, path: &Path, sheet_name: &str) -> ReportResult<()> {
    save_with(path, sheet_name, |sheet, formats| fill_table(sheet, table, formats))
}
