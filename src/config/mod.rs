// src/config/mod.rs
pub mod prompt;

use anyhow::{Context, Result};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{dataset::TestIdPattern, error::DatasetError, process::ingest::assign_test_ids};

pub use prompt::{Decision, LineSource, Prompter, Scripted, Terminal};

pub const DEFAULT_GLOB: &str = "DataSource/DumpedData*.csv";
pub const DEFAULT_ID_PATTERN: &str = "DumpedData_Test([0-9]+).csv";
pub const DEFAULT_REPROCESS_PATTERN: &str = "Test([0-9]+).csv";
pub const DEFAULT_SCENARIO: &str = "scratch/scenario-zero.cc";

/// Everything the operator decides before a run, as typed in or loaded from
/// YAML. Nothing here is checked until [`RunConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Glob selecting the input dumps.
    pub glob: String,
    /// Regex with one capture group pulling the test id out of an input name.
    pub id_pattern: String,
    /// Regex recovering the test id from `Processed/Separated` file names.
    pub reprocess_pattern: String,
    /// Output directory; must be absent or empty. Empty string means unset.
    pub out_dir: String,
    /// ns-3 scenario the tests were produced with, recorded in the README.
    pub scenario: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            glob: DEFAULT_GLOB.to_string(),
            id_pattern: DEFAULT_ID_PATTERN.to_string(),
            reprocess_pattern: DEFAULT_REPROCESS_PATTERN.to_string(),
            out_dir: String::new(),
            scenario: DEFAULT_SCENARIO.to_string(),
        }
    }
}

/// A checked [`RunConfig`], ready for [`crate::process::run`].
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub inputs: Vec<PathBuf>,
    pub id_pattern: TestIdPattern,
    pub reprocess_pattern: TestIdPattern,
    pub out_dir: PathBuf,
    pub scenario: String,
}

impl RunConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// True once there is enough to run without asking anything.
    pub fn is_complete(&self) -> bool {
        !self.glob.trim().is_empty() && !self.out_dir.trim().is_empty()
    }

    /// Check every field. The id pattern is tried on every matched input, so
    /// a capture that is not an integer, or two inputs sharing an id, is
    /// caught here rather than halfway through a run.
    pub fn validate(&self) -> Result<RunPlan, DatasetError> {
        let inputs = resolve_inputs(&self.glob)?;
        let id_pattern = check_id_pattern(&inputs, &self.id_pattern)?;
        Ok(RunPlan {
            inputs,
            id_pattern,
            reprocess_pattern: TestIdPattern::new(&self.reprocess_pattern)?,
            out_dir: check_out_dir(&self.out_dir)?,
            scenario: self.scenario.clone(),
        })
    }
}

/// Files matched by `pattern`; at least one is required.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>, DatasetError> {
    let mut paths: Vec<PathBuf> = glob(pattern)
        .map_err(|e| DatasetError::Config(format!("bad glob `{}`: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    if paths.is_empty() {
        return Err(DatasetError::NoInputFiles(pattern.to_string()));
    }
    paths.sort();
    Ok(paths)
}

/// Compile `pattern` and extract a distinct integer test id from every input.
pub fn check_id_pattern(inputs: &[PathBuf], pattern: &str) -> Result<TestIdPattern, DatasetError> {
    let id_pattern = TestIdPattern::new(pattern)?;
    assign_test_ids(inputs, &id_pattern)?;
    Ok(id_pattern)
}

/// The output directory may not exist yet, but if it does it must be empty.
pub fn check_out_dir(dir: &str) -> Result<PathBuf, DatasetError> {
    let trimmed = dir.trim();
    if trimmed.is_empty() {
        return Err(DatasetError::Config("an output directory is required".into()));
    }
    let path = PathBuf::from(trimmed);
    if !path.exists() {
        return Ok(path);
    }
    if !path.is_dir() {
        return Err(DatasetError::Config(format!(
            "{} exists and is not a directory",
            path.display()
        )));
    }
    let mut entries = fs::read_dir(&path)
        .map_err(|e| DatasetError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    if entries.next().is_some() {
        return Err(DatasetError::OutputNotEmpty(path));
    }
    Ok(path)
}
