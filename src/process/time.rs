use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};
use tracing::{debug, info, instrument, warn};

use super::split::CategoryTable;
use crate::{
    dataset::{
        Category, OutputLayout, Stage, TestIdPattern, POSITIONAL_COLUMN, TEST_ID_COLUMN,
        TIMESTAMP_COLUMN,
    },
    error::DatasetError,
    table::{
        read_csv,
        utils::{is_null, parse_number},
        write_csv, Table,
    },
};

/// Shift `column` so its smallest value becomes zero.
///
/// Integer columns stay integers; anything with a fractional value is
/// shifted in floating point. Null cells are left alone.
pub fn shift_to_zero(table: &mut Table, column: &str) -> Result<(), DatasetError> {
    let idx = table.require_column(column)?;

    let mut all_int = true;
    let mut values = Vec::with_capacity(table.len());
    for row in &table.rows {
        let cell = row[idx].trim();
        if is_null(cell) {
            values.push(None);
            continue;
        }
        if cell.parse::<i64>().is_err() {
            all_int = false;
        }
        match parse_number(cell) {
            Some(v) => values.push(Some(v)),
            None => {
                return Err(DatasetError::NonNumeric {
                    value: cell.to_string(),
                    column: column.to_string(),
                    table: table.name.clone(),
                })
            }
        }
    }

    if values.iter().all(Option::is_none) {
        warn!(table = %table.name, column, "no values to shift");
        return Ok(());
    }

    if all_int {
        let ints: Vec<Option<i64>> = table
            .rows
            .iter()
            .map(|r| r[idx].trim().parse::<i64>().ok())
            .collect();
        let min = ints.iter().flatten().min().copied().unwrap_or(0);
        for (row, v) in table.rows.iter_mut().zip(ints) {
            if let Some(v) = v {
                row[idx] = (i128::from(v) - i128::from(min)).to_string();
            }
        }
    } else {
        let min = values
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        for (row, v) in table.rows.iter_mut().zip(values) {
            if let Some(v) = v {
                row[idx] = (v - min).to_string();
            }
        }
    }
    Ok(())
}

/// Processed per-test tables on disk, in path order.
fn discover(layout: &OutputLayout) -> Result<Vec<PathBuf>> {
    let dir = layout.separated_dir(Stage::Processed);
    let pattern = format!("{}/*.csv", Pattern::escape(&dir.to_string_lossy()));
    let mut paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();
    Ok(paths)
}

/// File name → test id of every per-test table field normalization wrote.
pub fn expected_files(tables: &[CategoryTable]) -> BTreeMap<String, u32> {
    tables
        .iter()
        .map(|t| (t.category.test_file_name(t.test_id), t.test_id))
        .collect()
}

/// Stage 4: rebase each processed table's timestamps at zero and merge per
/// category, ordered by test id then timestamp.
///
/// Tables are rediscovered from `Processed/Separated`. The id `reprocess`
/// recovers from each file name must be the id in `expected`, and every
/// expected file must be found.
#[instrument(level = "info", skip_all)]
pub fn time_normalize(
    layout: &OutputLayout,
    reprocess: &TestIdPattern,
    expected: &BTreeMap<String, u32>,
) -> Result<usize> {
    let files = discover(layout)?;
    let writer = layout.begin(Stage::TimeProcessed)?;
    let mut by_category: BTreeMap<Category, Vec<Table>> = BTreeMap::new();
    let mut seen = BTreeSet::new();

    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = Category::from_file_name(&file_name).ok_or_else(|| {
            DatasetError::UnknownCategory {
                file: file_name.clone(),
            }
        })?;
        let want = *expected
            .get(&file_name)
            .ok_or_else(|| DatasetError::UnexpectedFile(file_name.clone()))?;
        let test_id = reprocess.extract(path)?;
        if test_id != want {
            return Err(DatasetError::TestIdMismatch {
                file: file_name,
                id: test_id,
                expected: want,
            }
            .into());
        }
        seen.insert(file_name.clone());

        let mut table = read_csv(path)?;
        table.drop_columns(&[POSITIONAL_COLUMN])?;
        shift_to_zero(&mut table, TIMESTAMP_COLUMN)?;
        write_csv(&table, writer.separated(&file_name))?;
        debug!(%category, test_id, rows = table.len(), "time-shifted");

        table.push_constant(TEST_ID_COLUMN, &test_id.to_string());
        by_category.entry(category).or_default().push(table);
    }

    if let Some(missing) = expected.keys().find(|k| !seen.contains(*k)) {
        return Err(DatasetError::MissingFile(missing.clone()).into());
    }

    for category in Category::ALL {
        let tables = by_category
            .remove(&category)
            .ok_or(DatasetError::EmptyCategory {
                category,
                stage: "time normalization",
            })?;
        let mut merged = Table::concat(
            format!("Time-Processed/{}_Merged.csv", category.file_prefix()),
            tables,
        )?;
        merged.sort_by_numeric(&[TEST_ID_COLUMN, TIMESTAMP_COLUMN])?;
        write_csv(&merged, writer.category_merged(category))?;
        info!(%category, rows = merged.len(), "time-normalized category");
    }

    writer.commit()?;
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ts_table(cells: &[&str]) -> Table {
        Table {
            name: "t".into(),
            headers: vec!["Timestamp".into(), "v".into()],
            rows: cells
                .iter()
                .map(|c| vec![c.to_string(), "x".to_string()])
                .collect(),
        }
    }

    fn timestamps(t: &Table) -> Vec<&str> {
        t.column("Timestamp").unwrap().collect()
    }

    #[test]
    fn integer_timestamps_shift_exactly() {
        let mut t = ts_table(&["1700000000500", "1700000000000", "", "1700000000250"]);
        shift_to_zero(&mut t, "Timestamp").unwrap();
        assert_eq!(timestamps(&t), vec!["500", "0", "", "250"]);
    }

    #[test]
    fn fractional_timestamps_shift_in_float() {
        let mut t = ts_table(&["2.5", "1", "4"]);
        shift_to_zero(&mut t, "Timestamp").unwrap();
        assert_eq!(timestamps(&t), vec!["1.5", "0", "3"]);
    }

    #[test]
    fn text_timestamp_is_rejected() {
        let mut t = ts_table(&["1", "later"]);
        assert!(matches!(
            shift_to_zero(&mut t, "Timestamp"),
            Err(DatasetError::NonNumeric { .. })
        ));
    }

    fn expect(files: &[(Category, u32)]) -> BTreeMap<String, u32> {
        files
            .iter()
            .map(|&(c, id)| (c.test_file_name(id), id))
            .collect()
    }

    fn processed(dir: &std::path::Path, name: &str, body: &str) {
        let sep = dir.join("Processed/Separated");
        fs::create_dir_all(&sep).unwrap();
        fs::write(sep.join(name), body).unwrap();
    }

    #[test]
    fn merged_tables_sort_by_test_then_time() -> Result<()> {
        let out = TempDir::new()?;
        for c in Category::ALL {
            let p = c.file_prefix();
            processed(out.path(), &format!("{}_Test10.csv", p), ",Timestamp,v\n0,100,a\n1,130,b\n");
            processed(out.path(), &format!("{}_Test2.csv", p), ",Timestamp,v\n0,55,c\n1,50,d\n");
        }
        let layout = OutputLayout::new(out.path());
        let reprocess = TestIdPattern::new(r"Test([0-9]+)\.csv")?;
        let expected = expect(
            &Category::ALL
                .into_iter()
                .flat_map(|c| [(c, 2), (c, 10)])
                .collect::<Vec<_>>(),
        );

        assert_eq!(time_normalize(&layout, &reprocess, &expected)?, 6);

        let merged = read_csv(out.path().join("Time-Processed/CU-UPData_Merged.csv"))?;
        let rows: Vec<(&str, &str)> = merged
            .rows
            .iter()
            .map(|r| (r[3].as_str(), r[1].as_str()))
            .collect();
        assert_eq!(rows, vec![("2", "0"), ("2", "5"), ("10", "0"), ("10", "30")]);

        let sep = read_csv(out.path().join("Time-Processed/Separated/DUData_Test2.csv"))?;
        assert_eq!(sep.headers, vec!["Unnamed: 0", "Timestamp", "v"]);
        assert_eq!(timestamps(&sep), vec!["5", "0"]);
        Ok(())
    }

    #[test]
    fn missing_category_fails_finalization() -> Result<()> {
        let out = TempDir::new()?;
        processed(out.path(), "DUData_Test1.csv", ",Timestamp\n0,1\n");
        processed(out.path(), "CU-UPData_Test1.csv", ",Timestamp\n0,1\n");
        let err = time_normalize(
            &OutputLayout::new(out.path()),
            &TestIdPattern::new(r"Test([0-9]+)\.csv")?,
            &expect(&[(Category::Du, 1), (Category::CuUp, 1)]),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::EmptyCategory {
                category: Category::CuCp,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn secondary_pattern_must_agree_with_file_owner() -> Result<()> {
        let out = TempDir::new()?;
        for c in Category::ALL {
            processed(out.path(), &c.test_file_name(1), ",Timestamp\n0,1\n");
            processed(out.path(), &c.test_file_name(12), ",Timestamp\n0,1\n");
        }
        let expected = expect(
            &Category::ALL
                .into_iter()
                .flat_map(|c| [(c, 1), (c, 12)])
                .collect::<Vec<_>>(),
        );
        // single-digit capture turns test 12 into test 1, which is also a real id
        let err = time_normalize(
            &OutputLayout::new(out.path()),
            &TestIdPattern::new(r"Test([0-9])")?,
            &expected,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::TestIdMismatch {
                id: 1,
                expected: 12,
                ..
            })
        ));
        assert!(!out.path().join("Time-Processed").exists());
        Ok(())
    }

    #[test]
    fn stray_and_missing_files_are_reported() -> Result<()> {
        let out = TempDir::new()?;
        processed(out.path(), "DUData_Test1.csv", ",Timestamp\n0,1\n");
        let reprocess = TestIdPattern::new(r"Test([0-9]+)\.csv")?;

        let err = time_normalize(&OutputLayout::new(out.path()), &reprocess, &expect(&[]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::UnexpectedFile(_))
        ));

        let err = time_normalize(
            &OutputLayout::new(out.path()),
            &reprocess,
            &expect(&[(Category::Du, 1), (Category::Du, 2)]),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::MissingFile(f)) if f == "DUData_Test2.csv"
        ));
        Ok(())
    }
}
