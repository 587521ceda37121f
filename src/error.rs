// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::dataset::Category;

/// Failures the pipeline reports with enough structure for callers to match on.
///
/// Everything else (I/O, CSV syntax) travels as plain `anyhow` context chains.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("pattern `{pattern}` must have exactly one capture group, found {groups}")]
    InvalidPattern { pattern: String, groups: usize },

    #[error("invalid regular expression `{pattern}`: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no test id in `{file}` (pattern `{pattern}`)")]
    TestIdNotFound { file: String, pattern: String },

    #[error("pattern `{pattern}` matches `{file}` {matches} times, cannot pick a test id")]
    AmbiguousTestId {
        file: String,
        pattern: String,
        matches: usize,
    },

    #[error("captured `{value}` from `{file}` is not an integer test id")]
    InvalidTestId { file: String, value: String },

    #[error("test id {id} is claimed by both {} and {}", first.display(), second.display())]
    DuplicateTestId {
        id: u32,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("column `{column}` missing from {table}")]
    MissingColumn { column: String, table: String },

    #[error("category {category} has no rows in any test ({stage})")]
    EmptyCategory {
        category: Category,
        stage: &'static str,
    },

    #[error("nothing to merge for {0}")]
    EmptyMerge(String),

    #[error("non-numeric value `{value}` in column `{column}` of {table}")]
    NonNumeric {
        value: String,
        column: String,
        table: String,
    },

    #[error("`{file}` does not start with a known category prefix")]
    UnknownCategory { file: String },

    #[error("`{file}` yields test id {id}, but it holds test {expected}")]
    TestIdMismatch { file: String, id: u32, expected: u32 },

    #[error("`{0}` was not produced by field normalization")]
    UnexpectedFile(String),

    #[error("`{0}` is missing from Processed/Separated")]
    MissingFile(String),

    #[error("glob `{0}` matches no files")]
    NoInputFiles(String),

    #[error("output directory {} exists and is not empty", .0.display())]
    OutputNotEmpty(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),
}
