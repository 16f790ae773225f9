//! Collection and reporting over domain search results.
//!
//! [`collect::collect_posts`] walks a list of domains through the search
//! API and flattens every match into a [`table::Table`] row. The two
//! report flows in [`report`] share that collection step:
//!
//! - [`report::popularity_report`] writes the raw rows plus a summary
//!   that left-joins per-domain counts onto a reference table. Domains
//!   with no matches keep a null (empty) volume.
//! - [`report::tracking_report`] appends one timestamp-named count
//!   column to the reference table itself and rewrites it in place,
//!   zero-filling domains with no matches.
//!
//! The two flows deliberately disagree about empty counts. The summary
//! distinguishes "never matched" from "matched zero times today", while
//! the tracking table is a dense time series where every cell must be
//! numeric.

use std::path::PathBuf;
use thiserror::Error;

pub mod collect;
pub mod report;
pub mod table;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: line {line}: {message}")]
    Csv {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{path} has no {column:?} column")]
    MissingColumn { path: PathBuf, column: String },
}

pub use collect::{collect_posts, RAW_COLUMNS};
pub use report::{popularity_report, tracking_report};
pub use table::Table;
