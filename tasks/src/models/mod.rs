//! In-memory tabular data.
//!
//! - [`Value`] - A single scalar cell (or the missing marker)
//! - [`Column`] - A named sequence of values
//! - [`Table`] - Ordered columns of equal length with a stable row order
//! - [`KeyPart`] - Hashable form of a value, used to align join keys

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// Values
// =============================================================================

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing marker.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value kind, used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "missing",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "str",
            Value::Date(_) => "datetime",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Hashable key used when matching rows across tables.
    ///
    /// Integral floats collapse onto integers so `1` and `1.0` match, and NaN
    /// is treated as missing.
    pub fn key(&self) -> KeyPart {
        match self {
            Value::Null => KeyPart::Null,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) if f.is_nan() => KeyPart::Null,
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    KeyPart::Int(*f as i64)
                } else {
                    KeyPart::Float(f.to_bits())
                }
            }
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Date(d) => KeyPart::Date(*d),
        }
    }

    /// Order two non-missing values, or `None` when their kinds can't be compared.
    pub fn try_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            // booleans order as 0 and 1 against numbers
            (Value::Bool(a), b) if b.is_numeric() => Value::Int(i64::from(*a)).try_cmp(b),
            (a, Value::Bool(b)) if a.is_numeric() => a.try_cmp(&Value::Int(i64::from(*b))),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64().and_then(|x| b.as_f64().and_then(|y| x.partial_cmp(&y)))
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// JSON form used by `inspect`.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Hashable projection of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Date(NaiveDateTime),
}

// =============================================================================
// Columns & Tables
// =============================================================================

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self { name: name.into(), values }
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// An ordered collection of equally long, named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    /// Build a table from columns; shorter columns are padded with `Null`.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let height = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for col in &mut columns {
            col.values.resize(height, Value::Null);
        }
        Self { columns, height }
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Value at (`row`, `col`), `Null` when out of range.
    pub fn value(&self, row: usize, col: usize) -> &Value {
        self.columns
            .get(col)
            .and_then(|c| c.values.get(row))
            .unwrap_or(&Value::Null)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<JsonValue> {
        (0..self.height)
            .map(|row| {
                let mut obj = Map::new();
                for col in &self.columns {
                    obj.insert(col.name.clone(), col.values[row].to_json());
                }
                JsonValue::Object(obj)
            })
            .collect()
    }
}
