//! Excel loading via calamine.

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use std::fs;
use std::path::Path;

use super::{
    dedupe_headers, ensure_not_empty, file_name, header_or_unnamed, is_na_token, LoadOptions,
    SheetSelector,
};
use crate::error::{LoadError, LoadResult};
use crate::logs::Logger;
use crate::models::{Column, Table, Value};

/// Load an Excel worksheet as a table.
///
/// The first row holds the column names; every following row is data.
pub fn load_xls(path: &Path, options: &LoadOptions, log: &dyn Logger) -> LoadResult<Table> {
    let file = file_name(path);

    let size = fs::metadata(path)
        .map_err(|source| LoadError::Io { file: file.clone(), source })?
        .len();
    if size == 0 {
        log.error(&format!("File appears to be empty: {}.", file));
        return Err(LoadError::EmptyData { file });
    }

    let excel_error = |message: String| {
        log.error(&format!("Could not read workbook {}: {}", file, message));
        LoadError::Excel { file: file.clone(), message }
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| excel_error(e.to_string()))?;

    let range = match &options.sheet {
        SheetSelector::Index(i) => workbook
            .worksheet_range_at(*i)
            .ok_or_else(|| excel_error(format!("no worksheet at index {}", i)))?
            .map_err(|e| excel_error(e.to_string()))?,
        SheetSelector::Name(name) => workbook
            .worksheet_range(name)
            .map_err(|e| excel_error(format!("worksheet '{}': {}", name, e)))?,
    };

    let table = match table_from_range(&range) {
        Some(table) => table,
        None => {
            log.error(&format!("File appears to be empty: {}.", file));
            return Err(LoadError::EmptyData { file });
        }
    };

    ensure_not_empty(table, &file, log)
}

/// Build a table from a worksheet range, or `None` if the sheet has no cells.
pub fn table_from_range(range: &Range<Data>) -> Option<Table> {
    let mut rows = range.rows();
    let header_row = rows.next()?;

    let headers = dedupe_headers(
        header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| header_name(i, cell))
            .collect(),
    );

    let mut columns: Vec<Column> = headers
        .into_iter()
        .map(|name| Column::new(name, Vec::new()))
        .collect();

    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        for (i, col) in columns.iter_mut().enumerate() {
            col.values.push(row.get(i).map_or(Value::Null, cell_value));
        }
    }

    for col in &mut columns {
        narrow_integral_floats(&mut col.values);
    }

    Some(Table::new(columns))
}

fn header_name(index: usize, cell: &Data) -> String {
    match cell {
        Data::Empty => header_or_unnamed(index, ""),
        Data::String(s) => header_or_unnamed(index, s),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if is_na_token(s) => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell.as_datetime().map_or(Value::Null, Value::Date),
        other => other.as_string().map_or(Value::Null, Value::Text),
    }
}

/// Workbooks store every number as a float; columns of whole numbers become integers.
fn narrow_integral_floats(values: &mut [Value]) {
    let all_integral = values.iter().all(|v| match v {
        Value::Null | Value::Int(_) => true,
        Value::Float(f) => f.fract() == 0.0 && f.abs() < 9.0e15,
        _ => false,
    });
    let any_float = values.iter().any(|v| matches!(v, Value::Float(_)));

    if all_integral && any_float {
        for v in values.iter_mut() {
            if let Value::Float(f) = v {
                *v = Value::Int(*f as i64);
            }
        }
    }
}
