//! Table transformations.
//!
//! - Join: left join with match indicator and keyed index
//! - Recode: cell-level recoders (dates)
//! - Pipeline: file-to-report tasks built from the above

pub mod join;
pub mod pipeline;
pub mod recode;

pub use join::{
    merge_left, ColumnLabel, Indicator, IndicatorCounts, JoinedTable, Source, DEFAULT_INDICATOR,
};
pub use pipeline::{left_join, recode_dates_file, JoinOptions, JoinSummary, RecodeSummary};
pub use recode::{parse_date, recode_date, recode_dates};
