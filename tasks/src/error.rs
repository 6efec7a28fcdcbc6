//! Error types for the data tasks.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ValidationError`] - Sanity checks on successfully parsed tables
//! - [`LoadError`] - Table loading errors (CSV / Excel)
//! - [`JoinError`] - Join key problems
//! - [`SortError`] - Index sorting problems (recovered by the pipeline)
//! - [`RecodeError`] - Column recoding problems
//! - [`ReportError`] - Excel report writing errors
//! - [`TaskError`] - General-purpose errors for unfinished or empty code paths
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Every error that concerns a file carries the file name, and every error
//! exposes a [`Reason`] so callers can branch without matching on messages.

use thiserror::Error;

// =============================================================================
// Reason Codes
// =============================================================================

/// Coarse reason code attached to every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// The file has no header or no data rows.
    EmptyFile,
    /// The file could not be interpreted as the expected format.
    ParseError,
    /// A required column is absent.
    MissingColumn,
    /// The file name does not tell us how to read it.
    UnknownFormat,
    /// Reading or writing the file failed.
    Io,
    /// Anything else.
    Other,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Raised when a validation/sanity check comes back with an unexpected value.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The table was parsed but holds no data rows.
    #[error("File appears to be empty: {file}.")]
    EmptyTable { file: String },
}

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while loading a CSV or Excel table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// No columns to parse (zero-byte or blank file).
    #[error("No columns to parse from file: {file}")]
    EmptyData { file: String },

    /// Invalid CSV structure.
    #[error("Invalid CSV in {file}: {message}")]
    Parse { file: String, message: String },

    /// Workbook could not be opened or decoded.
    #[error("Invalid Excel workbook {file}: {message}")]
    Excel { file: String, message: String },

    /// Unsupported text encoding.
    #[error("Failed to decode {file}: {message}")]
    Encoding { file: String, message: String },

    /// File name has neither a csv nor an xls/xlsx token.
    #[error("Unknown table format (expected csv, xls or xlsx): {file}")]
    UnknownFormat { file: String },

    /// Parsed fine but failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl LoadError {
    /// Reason code for this failure.
    pub fn reason(&self) -> Reason {
        match self {
            LoadError::Io { .. } => Reason::Io,
            LoadError::EmptyData { .. } | LoadError::Validation(_) => Reason::EmptyFile,
            LoadError::Parse { .. } | LoadError::Excel { .. } | LoadError::Encoding { .. } => {
                Reason::ParseError
            }
            LoadError::UnknownFormat { .. } => Reason::UnknownFormat,
        }
    }
}

// =============================================================================
// Join Errors
// =============================================================================

/// Errors in the join key set.
#[derive(Debug, Error)]
pub enum JoinError {
    /// No join columns given.
    #[error("At least one join column is required")]
    NoKeys,

    /// A join column is absent from one of the tables.
    #[error("Join column '{column}' not found in {file}")]
    MissingColumn { column: String, file: String },
}

impl JoinError {
    pub fn reason(&self) -> Reason {
        match self {
            JoinError::NoKeys => Reason::Other,
            JoinError::MissingColumn { .. } => Reason::MissingColumn,
        }
    }
}

// =============================================================================
// Sort Errors
// =============================================================================

/// The row index could not be ordered.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("'<' not supported between {left} and {right} values in index column '{column}'")]
    Incomparable {
        column: String,
        left: &'static str,
        right: &'static str,
    },
}

// =============================================================================
// Recode Errors
// =============================================================================

/// Errors while recoding columns.
#[derive(Debug, Error)]
pub enum RecodeError {
    /// A column to recode is absent.
    #[error("Column '{column}' not found in {file}")]
    MissingColumn { column: String, file: String },
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors while writing an Excel report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Workbook writer failed.
    #[error("Failed to write {file}: {source}")]
    Xlsx {
        file: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

// =============================================================================
// General Task Errors
// =============================================================================

/// General-purpose errors for code paths that are not (yet) meaningful.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A section of code left for another time was asked to execute.
    #[error("Not implemented yet: {0}")]
    NotImplementedYet(String),

    /// An iteration had nothing to return, but normally would.
    #[error("No result: {0}")]
    NoResult(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors returned by the pipelines in [`crate::transform`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Recode(#[from] RecodeError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

impl PipelineError {
    pub fn reason(&self) -> Reason {
        match self {
            PipelineError::Load(e) => e.reason(),
            PipelineError::Join(e) => e.reason(),
            PipelineError::Recode(_) => Reason::MissingColumn,
            PipelineError::Report(_) => Reason::Io,
            PipelineError::Task(_) => Reason::Other,
        }
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::Load(LoadError::Validation(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for join operations.
pub type JoinResult<T> = Result<T, JoinError>;

/// Result type for report writing.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
