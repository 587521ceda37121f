use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

use crate::{
    dataset::{
        OutputLayout, Stage, TestIdPattern, ORIGINAL_INDEX_COLUMN, TEST_ID_COLUMN,
    },
    error::DatasetError,
    table::{read_csv, utils::UNNAMED_PREFIX, write_csv, Table},
};

/// One ingested input file.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpFile {
    pub test_id: u32,
    /// Where the operator's file came from.
    pub source: PathBuf,
    /// Byte-identical copy under `Raw/Separated`.
    pub archived: PathBuf,
    pub rows: usize,
}

/// Load a raw dump, naming its positional column `Original index`.
///
/// The positional column is the first one with a blank header, wherever it
/// sits. A dump written without one gets a column synthesized from row
/// order, so later stages can rely on it.
pub fn load_dump(path: &Path) -> Result<Table> {
    let mut table = read_csv(path)?;
    if table.column_index(ORIGINAL_INDEX_COLUMN).is_some() {
        return Ok(table);
    }
    let positional = table
        .headers
        .iter()
        .find(|h| h.starts_with(UNNAMED_PREFIX))
        .cloned();
    match positional {
        Some(name) => {
            table.rename_column(&name, ORIGINAL_INDEX_COLUMN);
        }
        None => {
            debug!(file = %path.display(), "no positional column, synthesizing one");
            table.insert_row_positions(ORIGINAL_INDEX_COLUMN);
        }
    }
    Ok(table)
}

/// Pair every input with its test id, sorted by id. Fails if an id cannot be
/// extracted or two files share one.
pub fn assign_test_ids(
    inputs: &[PathBuf],
    pattern: &TestIdPattern,
) -> Result<Vec<(u32, PathBuf)>, DatasetError> {
    let mut by_id: BTreeMap<u32, PathBuf> = BTreeMap::new();
    let mut sorted = inputs.to_vec();
    sorted.sort();
    for path in sorted {
        let id = pattern.extract(&path)?;
        if let Some(first) = by_id.get(&id) {
            return Err(DatasetError::DuplicateTestId {
                id,
                first: first.clone(),
                second: path,
            });
        }
        by_id.insert(id, path);
    }
    Ok(by_id.into_iter().collect())
}

/// Stage 1: archive every input under its test id and merge all rows.
#[instrument(level = "info", skip_all, fields(files = inputs.len()))]
pub fn ingest(
    inputs: &[PathBuf],
    pattern: &TestIdPattern,
    layout: &OutputLayout,
) -> Result<Vec<DumpFile>> {
    let assigned = assign_test_ids(inputs, pattern)?;
    let writer = layout.begin(Stage::Raw)?;
    let final_separated = layout.separated_dir(Stage::Raw);

    let mut dumps = Vec::with_capacity(assigned.len());
    let mut tagged = Vec::with_capacity(assigned.len());
    for (test_id, source) in assigned {
        let copy = writer.raw_test(test_id);
        fs::copy(&source, &copy).with_context(|| {
            format!("archiving {} to {}", source.display(), copy.display())
        })?;

        let mut table = load_dump(&source)?;
        let rows = table.len();
        table.push_constant(TEST_ID_COLUMN, &test_id.to_string());
        tagged.push(table);

        info!(test_id, rows, source = %source.display(), "ingested");
        let file_name = copy
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        dumps.push(DumpFile {
            test_id,
            source,
            archived: final_separated.join(file_name),
            rows,
        });
    }

    let merged = Table::concat("Raw/DumpedData_Merged.csv", tagged)?;
    write_csv(&merged, writer.raw_merged())?;
    info!(rows = merged.len(), "wrote merged raw table");

    writer.commit()?;
    Ok(dumps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn merges_and_tags_every_row() -> Result<()> {
        let src = TempDir::new()?;
        let out = TempDir::new()?;
        let a = write(src.path(), "DumpedData_Test2.csv", ",timestamp,v\n0,5,a\n1,6,b\n");
        let b = write(src.path(), "DumpedData_Test1.csv", ",timestamp,v\n0,9,c\n");
        let pattern = TestIdPattern::new(r"DumpedData_Test([0-9]+)\.csv")?;
        let layout = OutputLayout::new(out.path());

        let dumps = ingest(&[a.clone(), b], &pattern, &layout)?;
        assert_eq!(dumps.iter().map(|d| d.test_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(fs::read(&dumps[1].archived)?, fs::read(&a)?);

        let merged = read_csv(out.path().join("Raw/DumpedData_Merged.csv"))?;
        assert_eq!(
            merged.headers,
            vec!["Unnamed: 0", "Original index", "timestamp", "v", "Test ID"]
        );
        assert_eq!(merged.len(), dumps.iter().map(|d| d.rows).sum::<usize>());
        let ids: Vec<&str> = merged.column("Test ID")?.collect();
        assert_eq!(ids, vec!["1", "2", "2"]);
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected_before_writing() -> Result<()> {
        let src = TempDir::new()?;
        let out = TempDir::new()?;
        let a = write(src.path(), "DumpedData_Test01.csv", ",x\n0,1\n");
        let b = write(src.path(), "DumpedData_Test1.csv", ",x\n0,1\n");
        let pattern = TestIdPattern::new(r"Test([0-9]+)")?;

        let err = ingest(&[a, b], &pattern, &OutputLayout::new(out.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::DuplicateTestId { id: 1, .. })
        ));
        assert_eq!(fs::read_dir(out.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn synthesizes_missing_positional_column() -> Result<()> {
        let src = TempDir::new()?;
        let p = write(src.path(), "d.csv", "timestamp\n7\n8\n");
        let t = load_dump(&p)?;
        assert_eq!(t.headers, vec!["Original index", "timestamp"]);
        assert_eq!(t.rows, vec![vec!["0", "7"], vec!["1", "8"]]);
        Ok(())
    }

    #[test]
    fn positional_column_need_not_come_first() -> Result<()> {
        let src = TempDir::new()?;
        let p = write(src.path(), "d.csv", "timestamp,,v
7,0,a
8,1,b
");
        let t = load_dump(&p)?;
        assert_eq!(t.headers, vec!["timestamp", "Original index", "v"]);
        assert_eq!(t.rows[1], vec!["8", "1", "b"]);
        Ok(())
    }
}
