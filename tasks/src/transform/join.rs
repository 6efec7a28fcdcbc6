//! Left join of two tables with a match indicator.
//!
//! # Result layout
//!
//! ```text
//!  index (join keys) │ left columns │ right columns │ indicator
//! ───────────────────┼──────────────┼───────────────┼──────────
//!  id                │ name         │ score         │ FOUND_IN
//!  1                 │ A            │ 10            │ both
//!  2                 │ B            │ (missing)     │ left_only
//! ```
//!
//! Every left row is kept, in left order. A left row matching several right
//! rows appears once per match.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::error::{JoinError, JoinResult, SortError};
use crate::models::{KeyPart, Table, Value};

/// Default name of the indicator column.
pub const DEFAULT_INDICATOR: &str = "FOUND_IN";

// =============================================================================
// Labels
// =============================================================================

/// Where a result row's key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    LeftOnly,
    /// Never produced by a left join.
    RightOnly,
    Both,
}

impl Indicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::LeftOnly => "left_only",
            Indicator::RightOnly => "right_only",
            Indicator::Both => "both",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper level of the two-level column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Left,
    Right,
    Indicator,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Left => "left",
            Source::Right => "right",
            Source::Indicator => "indicator",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A result column: (source, original column name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLabel {
    pub source: Source,
    pub name: String,
}

impl ColumnLabel {
    fn new(source: Source, name: impl Into<String>) -> Self {
        Self { source, name: name.into() }
    }
}

/// Row counts per indicator value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorCounts {
    pub both: usize,
    pub left_only: usize,
    pub right_only: usize,
}

impl fmt::Display for IndicatorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "both={}, left_only={}, right_only={}",
            self.both, self.left_only, self.right_only
        )
    }
}

// =============================================================================
// Joined Table
// =============================================================================

/// Result of [`merge_left`]: rows indexed by the join keys, columns labelled
/// by source.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    /// Join key column names, in join order.
    pub index_names: Vec<String>,
    /// Key values per row.
    pub index: Vec<Vec<Value>>,
    /// Column labels, aligned with each entry of `rows`.
    pub labels: Vec<ColumnLabel>,
    /// Non-key values per row (indicator last when enabled).
    pub rows: Vec<Vec<Value>>,
    /// Match provenance per row.
    pub indicators: Vec<Indicator>,
    /// Whether the index has been sorted.
    pub sorted: bool,
}

impl JoinedTable {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn counts(&self) -> IndicatorCounts {
        let mut counts = IndicatorCounts::default();
        for ind in &self.indicators {
            match ind {
                Indicator::Both => counts.both += 1,
                Indicator::LeftOnly => counts.left_only += 1,
                Indicator::RightOnly => counts.right_only += 1,
            }
        }
        counts
    }

    /// Column names tagged with `source`.
    pub fn names_from(&self, source: Source) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| l.source == source)
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Value of column (`source`, `name`) in `row`.
    pub fn get(&self, row: usize, source: Source, name: &str) -> Option<&Value> {
        let col = self
            .labels
            .iter()
            .position(|l| l.source == source && l.name == name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Stable sort of the rows by index.
    ///
    /// Missing keys go last. Booleans order as 0 and 1 among numbers. Fails
    /// without reordering anything when an index column mixes kinds that
    /// can't be ordered (text and numbers, dates and text).
    pub fn sort_index(&mut self) -> Result<(), SortError> {
        for (pos, name) in self.index_names.iter().enumerate() {
            let mut seen: Option<&Value> = None;
            for key in &self.index {
                let value = &key[pos];
                if value.is_null() {
                    continue;
                }
                match seen {
                    None => seen = Some(value),
                    Some(first) => {
                        if first.try_cmp(value).is_none() {
                            return Err(SortError::Incomparable {
                                column: name.clone(),
                                left: first.kind(),
                                right: value.kind(),
                            });
                        }
                    }
                }
            }
        }

        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by(|&a, &b| compare_keys(&self.index[a], &self.index[b]));

        self.index = order.iter().map(|&i| self.index[i].clone()).collect();
        self.rows = order.iter().map(|&i| self.rows[i].clone()).collect();
        self.indicators = order.iter().map(|&i| self.indicators[i]).collect();
        self.sorted = true;
        Ok(())
    }
}

fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.try_cmp(y).unwrap_or(Ordering::Equal),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// =============================================================================
// Join
// =============================================================================

/// Check that every join column exists in `table`.
pub fn check_keys(table: &Table, file: &str, join_on: &[String]) -> JoinResult<Vec<usize>> {
    if join_on.is_empty() {
        return Err(JoinError::NoKeys);
    }
    join_on
        .iter()
        .map(|column| {
            table.column_index(column).ok_or_else(|| JoinError::MissingColumn {
                column: column.clone(),
                file: file.to_string(),
            })
        })
        .collect()
}

fn row_key(table: &Table, row: usize, key_cols: &[usize]) -> Vec<KeyPart> {
    key_cols.iter().map(|&c| table.value(row, c).key()).collect()
}

/// Left join `left` and `right` on `join_on`.
///
/// With `indicator` set, a column of that name tagged [`Source::Indicator`]
/// records each row's provenance. The result is not sorted.
pub fn merge_left(
    left: &Table,
    right: &Table,
    join_on: &[String],
    indicator: Option<&str>,
) -> JoinResult<JoinedTable> {
    let left_keys = check_keys(left, "left table", join_on)?;
    let right_keys = check_keys(right, "right table", join_on)?;

    let left_cols: Vec<usize> = (0..left.width()).filter(|c| !left_keys.contains(c)).collect();
    let right_cols: Vec<usize> = (0..right.width()).filter(|c| !right_keys.contains(c)).collect();

    let mut labels: Vec<ColumnLabel> = left_cols
        .iter()
        .map(|&c| ColumnLabel::new(Source::Left, left.columns()[c].name.clone()))
        .chain(
            right_cols
                .iter()
                .map(|&c| ColumnLabel::new(Source::Right, right.columns()[c].name.clone())),
        )
        .collect();
    if let Some(name) = indicator {
        labels.push(ColumnLabel::new(Source::Indicator, name));
    }

    let mut lookup: HashMap<Vec<KeyPart>, Vec<usize>> = HashMap::new();
    for row in 0..right.height() {
        lookup.entry(row_key(right, row, &right_keys)).or_default().push(row);
    }

    let mut result = JoinedTable {
        index_names: join_on.to_vec(),
        index: Vec::with_capacity(left.height()),
        labels,
        rows: Vec::with_capacity(left.height()),
        indicators: Vec::with_capacity(left.height()),
        sorted: false,
    };

    for row in 0..left.height() {
        let key_values: Vec<Value> = left_keys.iter().map(|&c| left.value(row, c).clone()).collect();
        let left_values = left_cols.iter().map(|&c| left.value(row, c).clone());

        let matches = lookup
            .get(&row_key(left, row, &left_keys))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if matches.is_empty() {
            let mut values: Vec<Value> = left_values.collect();
            values.extend(std::iter::repeat(Value::Null).take(right_cols.len()));
            push_row(&mut result, key_values, values, Indicator::LeftOnly, indicator.is_some());
            continue;
        }

        for &r in matches {
            let mut values: Vec<Value> = left_values.clone().collect();
            values.extend(right_cols.iter().map(|&c| right.value(r, c).clone()));
            push_row(&mut result, key_values.clone(), values, Indicator::Both, indicator.is_some());
        }
    }

    Ok(result)
}

fn push_row(
    result: &mut JoinedTable,
    key: Vec<Value>,
    mut values: Vec<Value>,
    indicator: Indicator,
    with_indicator: bool,
) {
    if with_indicator {
        values.push(Value::Text(indicator.as_str().to_string()));
    }
    result.index.push(key);
    result.rows.push(values);
    result.indicators.push(indicator);
}
