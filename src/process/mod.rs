// src/process/mod.rs
pub mod ingest;
pub mod normalize;
pub mod split;
pub mod time;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{fs, path::PathBuf, time::Instant};
use tracing::info;

use crate::{config::RunPlan, dataset::OutputLayout, report};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub out_dir: PathBuf,
    pub tests: usize,
    pub raw_rows: usize,
    pub category_tables: usize,
}

/// Run all four stages and write the README.
///
/// Stages run strictly in order; each one is committed before the next reads
/// it. A failure leaves earlier stages in place and the failed stage under
/// its `.partial` name.
pub fn run(plan: &RunPlan, now: DateTime<Utc>) -> Result<RunSummary> {
    let start = Instant::now();
    fs::create_dir_all(&plan.out_dir)
        .with_context(|| format!("creating output directory {}", plan.out_dir.display()))?;
    let layout = OutputLayout::new(&plan.out_dir);

    let dumps = ingest::ingest(&plan.inputs, &plan.id_pattern, &layout)?;
    let split_tables = split::split(&dumps, &layout)?;
    let processed = normalize::normalize(split_tables, &layout)?;

    let expected = time::expected_files(&processed);
    time::time_normalize(&layout, &plan.reprocess_pattern, &expected)?;

    report::write_readme(&layout, &plan.scenario, dumps.len(), now)?;

    let summary = RunSummary {
        out_dir: plan.out_dir.clone(),
        tests: dumps.len(),
        raw_rows: dumps.iter().map(|d| d.rows).sum(),
        category_tables: processed.len(),
    };
    info!(elapsed = ?start.elapsed(), ?summary, "pipeline finished");
    Ok(summary)
}
