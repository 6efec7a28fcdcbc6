//! High-level tasks combining loading, transformation and report writing.
//!
//! # Example
//!
//! ```rust,ignore
//! use data_tasks::transform::pipeline::{left_join, JoinOptions};
//! use data_tasks::logs::ConsoleLogger;
//! use std::path::Path;
//!
//! let summary = left_join(
//!     Path::new("subjects.xlsx"),
//!     Path::new("visits.csv.gz"),
//!     &["subject_id".to_string()],
//!     Path::new("joined.xlsx"),
//!     &JoinOptions::default(),
//!     &ConsoleLogger::default(),
//! )?;
//! println!("{} rows, {}", summary.rows, summary.counts);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::join::{check_keys, merge_left, IndicatorCounts, DEFAULT_INDICATOR};
use super::recode::recode_dates;
use crate::error::{PipelineResult, TaskError};
use crate::loader::{file_name, load_table, LoadOptions, SheetSelector};
use crate::logs::{LogEntry, Logger};
use crate::report::{write_joined, write_table, DEFAULT_SHEET};

/// Options for [`left_join`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinOptions {
    /// Add the match indicator column
    pub indicator: bool,

    /// Name of the indicator column
    pub indicator_name: String,

    /// Sheet name of the written report
    pub sheet_name: String,

    /// CSV delimiter for both inputs (auto-detect if not specified)
    pub delimiter: Option<char>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            indicator: true,
            indicator_name: DEFAULT_INDICATOR.to_string(),
            sheet_name: DEFAULT_SHEET.to_string(),
            delimiter: None,
        }
    }
}

/// Outcome of a [`left_join`] run
#[derive(Debug, Clone, Serialize)]
pub struct JoinSummary {
    /// Rows written
    pub rows: usize,
    /// Rows per indicator value
    pub counts: IndicatorCounts,
    /// Whether the index could be sorted
    pub sorted: bool,
    /// Report location
    pub output: PathBuf,
}

/// Left join two table files on `join_on` and write the annotated report to `out`.
///
/// Inputs are loaded from the first sheet when they are workbooks. Loading
/// and key errors abort the run; an index that can't be sorted only
/// produces a warning and an unsorted report.
pub fn left_join(
    left_path: &Path,
    right_path: &Path,
    join_on: &[String],
    out: &Path,
    options: &JoinOptions,
    log: &dyn Logger,
) -> PipelineResult<JoinSummary> {
    let load_options = LoadOptions {
        sheet: SheetSelector::Index(0),
        delimiter: options.delimiter,
        encoding: None,
    };

    // Load files
    log.info(&format!("Loading left table: {}", left_path.display()));
    let left = load_table(left_path, &load_options, log)?;
    log.log(
        LogEntry::success(format!("Read {} rows x {} columns", left.height(), left.width()))
            .with_indent(1),
    );

    log.info(&format!("Loading right table: {}", right_path.display()));
    let right = load_table(right_path, &load_options, log)?;
    log.log(
        LogEntry::success(format!("Read {} rows x {} columns", right.height(), right.width()))
            .with_indent(1),
    );

    check_keys(&left, &file_name(left_path), join_on)?;
    check_keys(&right, &file_name(right_path), join_on)?;

    // Do the join
    log.info(&format!("Joining on: {}", join_on.join(", ")));
    let indicator = options.indicator.then_some(options.indicator_name.as_str());
    let mut result = merge_left(&left, &right, join_on, indicator)?;

    let counts = result.counts();
    log.info(&format!("Results Digest: {}", counts));

    if let Err(e) = result.sort_index() {
        log.warning(&format!("The index could not be sorted: {}", e));
    }

    // Write the results
    write_joined(&result, out, &options.sheet_name)?;
    log.success(&format!("Output written to: {}", out.display()));

    Ok(JoinSummary {
        rows: result.height(),
        counts,
        sorted: result.sorted,
        output: out.to_path_buf(),
    })
}

/// Outcome of a [`recode_dates_file`] run
#[derive(Debug, Clone, Serialize)]
pub struct RecodeSummary {
    pub rows: usize,
    /// Non-missing values that could not be read as dates
    pub unparsed: usize,
    pub output: PathBuf,
}

/// Recode date columns of a table file and write the result as a workbook.
pub fn recode_dates_file(
    input: &Path,
    columns: &[String],
    out: &Path,
    options: &LoadOptions,
    log: &dyn Logger,
) -> PipelineResult<RecodeSummary> {
    if columns.is_empty() {
        return Err(TaskError::NoResult("no columns given to recode".into()).into());
    }

    log.info(&format!("Loading table: {}", input.display()));
    let mut table = load_table(input, options, log)?;

    let unparsed = recode_dates(&mut table, columns, &file_name(input))?;
    if unparsed > 0 {
        log.warning(&format!("{} values could not be read as dates and are now missing", unparsed));
    } else {
        log.success(&format!("Recoded {} column(s)", columns.len()));
    }

    write_table(&table, out, DEFAULT_SHEET)?;
    log.success(&format!("Output written to: {}", out.display()));

    Ok(RecodeSummary {
        rows: table.height(),
        unparsed,
        output: out.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Reason;
    use crate::logs::{LogLevel, MemoryLogger};
    use calamine::{open_workbook_auto, Data, Reader};
    use rust_xlsxwriter::Workbook;
    use std::fs;
    use tempfile::tempdir;

    fn on(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    fn report_rows(path: &Path) -> Vec<Vec<Data>> {
        let mut workbook = open_workbook_auto(path).unwrap();
        let range = workbook.worksheet_range("Results").unwrap();
        range.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_default_options() {
        let opts = JoinOptions::default();
        assert!(opts.indicator);
        assert_eq!(opts.indicator_name, "FOUND_IN");
        assert_eq!(opts.sheet_name, "Results");
    }

    #[test]
    fn test_left_join_csv_files() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        let out = dir.path().join("out.xlsx");
        fs::write(&left, "id,name\n2,B\n1,A\n3,C\n").unwrap();
        fs::write(&right, "id,score\n1,10\n3,30\n").unwrap();

        let log = MemoryLogger::new();
        let summary = left_join(&left, &right, &on(&["id"]), &out, &JoinOptions::default(), &log).unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.counts, IndicatorCounts { both: 2, left_only: 1, right_only: 0 });
        assert!(summary.sorted);
        assert!(log
            .messages(LogLevel::Info)
            .contains(&"Results Digest: both=2, left_only=1, right_only=0".to_string()));
        let nested: Vec<String> = log
            .entries()
            .into_iter()
            .filter(|e| e.indent == 1)
            .map(|e| e.message)
            .collect();
        assert_eq!(nested, vec!["Read 3 rows x 2 columns", "Read 2 rows x 2 columns"]);

        let rows = report_rows(&out);
        // header rows then data sorted by id
        assert_eq!(rows[3][0], Data::Float(1.0));
        assert_eq!(rows[4][0], Data::Float(2.0));
        assert_eq!(rows[4][2], Data::Empty);
        assert_eq!(rows[4][3], Data::String("left_only".into()));
        assert_eq!(rows[5][2], Data::Float(30.0));
    }

    #[test]
    fn test_left_join_excel_and_gzip_inputs() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("subjects.xlsx");
        let right = dir.path().join("scores.csv.gz");
        let out = dir.path().join("out.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        sheet.write_string(0, 1, "name").unwrap();
        sheet.write_number(1, 0, 1).unwrap();
        sheet.write_string(1, 1, "A").unwrap();
        sheet.write_number(2, 0, 2).unwrap();
        sheet.write_string(2, 1, "B").unwrap();
        workbook.save(&left).unwrap();

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, b"id,score\n1,10\n").unwrap();
        fs::write(&right, encoder.finish().unwrap()).unwrap();

        let summary =
            left_join(&left, &right, &on(&["id"]), &out, &JoinOptions::default(), &MemoryLogger::new()).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.counts.both, 1);
        assert_eq!(summary.counts.left_only, 1);
    }

    #[test]
    fn test_mixed_key_kinds_warn_and_keep_order() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.xlsx");
        let right = dir.path().join("right.csv");
        let out = dir.path().join("out.xlsx");

        // A workbook column can hold numbers and text side by side.
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        sheet.write_string(0, 1, "name").unwrap();
        sheet.write_string(1, 0, "b").unwrap();
        sheet.write_string(1, 1, "B").unwrap();
        sheet.write_number(2, 0, 1).unwrap();
        sheet.write_string(2, 1, "A").unwrap();
        workbook.save(&left).unwrap();
        fs::write(&right, "id,score\n1,10\n").unwrap();

        let log = MemoryLogger::new();
        let summary = left_join(&left, &right, &on(&["id"]), &out, &JoinOptions::default(), &log).unwrap();

        assert!(!summary.sorted);
        assert!(out.exists());
        let warnings = log.messages(LogLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("The index could not be sorted"));

        let rows = report_rows(&out);
        assert_eq!(rows[3][0], Data::String("b".into()));
        assert_eq!(rows[4][0], Data::Float(1.0));
        assert_eq!(rows[4][3], Data::String("both".into()));
    }

    #[test]
    fn test_missing_join_column_names_file() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        fs::write(&left, "id,name\n1,A\n").unwrap();
        fs::write(&right, "subject,score\n1,10\n").unwrap();

        let err = left_join(
            &left,
            &right,
            &on(&["id"]),
            &dir.path().join("out.xlsx"),
            &JoinOptions::default(),
            &MemoryLogger::new(),
        )
        .unwrap_err();

        assert_eq!(err.reason(), Reason::MissingColumn);
        assert!(err.to_string().contains("right.csv"));
    }

    #[test]
    fn test_empty_input_aborts() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        let out = dir.path().join("out.xlsx");
        fs::write(&left, "id,name\n").unwrap();
        fs::write(&right, "id,score\n1,10\n").unwrap();

        let err = left_join(&left, &right, &on(&["id"]), &out, &JoinOptions::default(), &MemoryLogger::new())
            .unwrap_err();

        assert_eq!(err.reason(), Reason::EmptyFile);
        assert!(!out.exists());
    }

    #[test]
    fn test_without_indicator_column() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        let out = dir.path().join("out.xlsx");
        fs::write(&left, "id,name\n1,A\n").unwrap();
        fs::write(&right, "id,score\n1,10\n").unwrap();

        let options = JoinOptions { indicator: false, ..Default::default() };
        left_join(&left, &right, &on(&["id"]), &out, &options, &MemoryLogger::new()).unwrap();

        let rows = report_rows(&out);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1][2], Data::String("score".into()));
    }

    #[test]
    fn test_recode_dates_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("consents.csv");
        let out = dir.path().join("consents.xlsx");
        fs::write(&input, "id,signed\n1,2017-03-01\n2,later\n").unwrap();

        let log = MemoryLogger::new();
        let summary =
            recode_dates_file(&input, &on(&["signed"]), &out, &LoadOptions::default(), &log).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.unparsed, 1);
        assert_eq!(log.messages(LogLevel::Warning).len(), 1);
        assert!(out.exists());
    }

    #[test]
    fn test_recode_without_columns() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("consents.csv");
        fs::write(&input, "id,signed\n1,2017-03-01\n").unwrap();

        let err = recode_dates_file(
            &input,
            &[],
            &dir.path().join("out.xlsx"),
            &LoadOptions::default(),
            &MemoryLogger::new(),
        )
        .unwrap_err();
        assert_eq!(err.reason(), Reason::Other);
    }
}
