//! Column recoders.
//!
//! Each recoder maps one [`Value`] to another so it can be applied cell by
//! cell over a column.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::RecodeError;
use crate::models::{Table, Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%Y%m%d",
];

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

/// Parse a date or datetime string, or `None` if no known layout fits.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return midnight(d);
        }
    }
    None
}

/// Return `value` recast as a datetime, or missing when it can't be.
pub fn recode_date(value: &Value) -> Value {
    let parsed = match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_date(s),
        // integers like 20170301
        Value::Int(i) if (10_000_101..=99_991_231).contains(i) => parse_date(&i.to_string()),
        _ => None,
    };
    parsed.map_or(Value::Null, Value::Date)
}

/// Recode the named columns of `table` in place.
///
/// Returns how many non-missing values could not be read as dates.
pub fn recode_dates(table: &mut Table, columns: &[String], file: &str) -> Result<usize, RecodeError> {
    if let Some(missing) = columns.iter().find(|c| table.column(c).is_none()) {
        return Err(RecodeError::MissingColumn {
            column: missing.clone(),
            file: file.to_string(),
        });
    }

    let mut lost = 0;
    for name in columns {
        if let Some(col) = table.column_mut(name) {
            for value in col.values.iter_mut() {
                let recoded = recode_date(value);
                if recoded.is_null() && !value.is_null() {
                    lost += 1;
                }
                *value = recoded;
            }
        }
    }
    Ok(lost)
}
