//! # data-tasks - everyday table chores for clinical coordinators
//!
//! Load CSV (plain or gzip-compressed) and Excel tables, left join them on a
//! set of key columns, annotate where each row was found, and write the
//! result as an Excel report with a two-level column header.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Loader    │────▶│  Left join  │────▶│ Excel report│
//! │ (.gz ok)    │     │ (sniffing)  │     │ (FOUND_IN)  │     │  "Results"  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use data_tasks::{left_join, ConsoleLogger, JoinOptions};
//! use std::path::Path;
//!
//! let summary = left_join(
//!     Path::new("subjects.xlsx"),
//!     Path::new("visits.csv"),
//!     &["subject_id".to_string()],
//!     Path::new("joined.xlsx"),
//!     &JoinOptions::default(),
//!     &ConsoleLogger::default(),
//! )?;
//! println!("{}", summary.counts);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types with reason codes
//! - [`logs`] - Injected log sinks
//! - [`models`] - Values, columns and tables
//! - [`loader`] - Format sniffing, CSV and Excel loading
//! - [`transform`] - Join, recoders and pipelines
//! - [`report`] - Excel output

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Loading
pub mod loader;

// Transformation
pub mod transform;

// Output
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    JoinError, LoadError, PipelineError, Reason, RecodeError, ReportError, SortError, TaskError,
    ValidationError,
};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logs::{ConsoleLogger, LogEntry, LogLevel, Logger, MemoryLogger};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Column, KeyPart, Table, Value};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use loader::{
    is_csv, is_excel, load_csv, load_table, load_xls, sniff, Format, LoadOptions, SheetSelector,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    left_join, merge_left, recode_date, recode_dates, recode_dates_file, ColumnLabel, Indicator,
    IndicatorCounts, JoinOptions, JoinSummary, JoinedTable, RecodeSummary, Source,
    DEFAULT_INDICATOR,
};

// =============================================================================
// Re-exports - Report
// =============================================================================

pub use report::{write_joined, write_table, DEFAULT_SHEET};
