use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::Category;

/// Directory name holding per-test tables inside each stage.
const SEPARATED: &str = "Separated";

/// One of the four pipeline stages, each owning a top-level directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Raw,
    Split,
    Processed,
    TimeProcessed,
}

impl Stage {
    pub fn dir_name(self) -> &'static str {
        match self {
            Stage::Raw => "Raw",
            Stage::Split => "Split",
            Stage::Processed => "Processed",
            Stage::TimeProcessed => "Time-Processed",
        }
    }
}

/// Paths of everything the pipeline writes under the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final directory of a committed stage.
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    pub fn separated_dir(&self, stage: Stage) -> PathBuf {
        self.stage_dir(stage).join(SEPARATED)
    }

    pub fn readme(&self) -> PathBuf {
        self.root.join("README.md")
    }

    /// Start writing `stage` into a hidden staging directory.
    pub fn begin(&self, stage: Stage) -> Result<StageWriter> {
        let final_dir = self.stage_dir(stage);
        let staging = self.root.join(format!(".{}.partial", stage.dir_name()));
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .with_context(|| format!("clearing stale {}", staging.display()))?;
        }
        fs::create_dir_all(staging.join(SEPARATED))
            .with_context(|| format!("creating {}", staging.display()))?;
        debug!(stage = stage.dir_name(), dir = %staging.display(), "stage started");
        Ok(StageWriter {
            stage,
            staging,
            final_dir,
        })
    }
}

/// Output of one stage in progress. Nothing appears under the stage's real
/// name until [`StageWriter::commit`].
#[derive(Debug)]
pub struct StageWriter {
    stage: Stage,
    staging: PathBuf,
    final_dir: PathBuf,
}

impl StageWriter {
    /// `Raw/Separated/DumpedData_Test<id>.csv`
    pub fn raw_test(&self, test_id: u32) -> PathBuf {
        self.staging
            .join(SEPARATED)
            .join(format!("DumpedData_Test{}.csv", test_id))
    }

    /// `Raw/DumpedData_Merged.csv`
    pub fn raw_merged(&self) -> PathBuf {
        self.staging.join("DumpedData_Merged.csv")
    }

    /// `<Stage>/Separated/<Category>Data_Test<id>.csv`
    pub fn category_test(&self, category: Category, test_id: u32) -> PathBuf {
        self.separated(&category.test_file_name(test_id))
    }

    /// `<Stage>/Separated/<file_name>`
    pub fn separated(&self, file_name: &str) -> PathBuf {
        self.staging.join(SEPARATED).join(file_name)
    }

    /// `<Stage>/<Category>Data_Merged.csv`
    pub fn category_merged(&self, category: Category) -> PathBuf {
        self.staging
            .join(format!("{}_Merged.csv", category.file_prefix()))
    }

    /// Move the finished stage to its final name.
    pub fn commit(self) -> Result<PathBuf> {
        fs::rename(&self.staging, &self.final_dir).with_context(|| {
            format!(
                "committing {} to {}",
                self.staging.display(),
                self.final_dir.display()
            )
        })?;
        debug!(stage = self.stage.dir_name(), dir = %self.final_dir.display(), "stage committed");
        Ok(self.final_dir)
    }
}
