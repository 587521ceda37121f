// src/report.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{fs, path::Path};
use tracing::info;

use crate::dataset::OutputLayout;

/// Render the dataset README.
pub fn render_readme(out_dir: &Path, scenario: &str, tests: usize, now: DateTime<Utc>) -> String {
    let pretty_time = now.format("%A, %-d %B %Y, at %H:%M (%Z)");
    let iso_time = now.to_rfc3339();
    format!(
        "# xInfoDump dataset {}\n\
         Exported on {}\n\n\
         ## Technical data\n\
         Test scenario: `{}`\n\
         Exportation time: `{}`\n\
         Number of tests: {}\n\n\
         > Automatically generated by the data processing tool",
        out_dir.display(),
        pretty_time,
        scenario,
        iso_time,
        tests
    )
}

/// Write `README.md` at the root of the output directory.
pub fn write_readme(
    layout: &OutputLayout,
    scenario: &str,
    tests: usize,
    now: DateTime<Utc>,
) -> Result<()> {
    let path = layout.readme();
    fs::write(&path, render_readme(layout.root(), scenario, tests, now))
        .with_context(|| format!("writing {}", path.display()))?;
    info!(file = %path.display(), "wrote summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn readme_names_dir_scenario_and_count() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let text = render_readme(Path::new("out/run1"), "scratch/scenario-one.cc", 2, now);
        assert_eq!(
            text,
            "# xInfoDump dataset out/run1\n\
             Exported on Tuesday, 5 March 2024, at 14:07 (UTC)\n\n\
             ## Technical data\n\
             Test scenario: `scratch/scenario-one.cc`\n\
             Exportation time: `2024-03-05T14:07:09+00:00`\n\
             Number of tests: 2\n\n\
             > Automatically generated by the data processing tool"
        );
    }
}
