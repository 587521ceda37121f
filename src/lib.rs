//! Turns per-test xInfoDump CSV exports into a split, renamed and
//! time-normalized dataset.

pub mod config;
pub mod dataset;
pub mod error;
pub mod process;
pub mod report;
pub mod table;

pub use error::DatasetError;
