use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use super::ingest::{load_dump, DumpFile};
use crate::{
    dataset::{
        layout::StageWriter, Category, OutputLayout, Stage, DISCRIMINATOR_COLUMN, EXTRA_DROP,
        TEST_ID_COLUMN,
    },
    error::DatasetError,
    table::{write_csv, Table},
};

/// One test's rows for one category, as handed from stage to stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    pub category: Category,
    pub test_id: u32,
    pub table: Table,
}

/// Stage 2: split every dump into its per-category tables.
///
/// Returns the per-test tables of all categories, grouped by category in
/// [`Category::ALL`] order and by test id within a category.
#[instrument(level = "info", skip_all, fields(tests = dumps.len()))]
pub fn split(dumps: &[DumpFile], layout: &OutputLayout) -> Result<Vec<CategoryTable>> {
    let writer = layout.begin(Stage::Split)?;
    let mut out = Vec::new();
    for category in Category::ALL {
        out.extend(split_category(category, dumps, &writer)?);
    }
    writer.commit()?;
    Ok(out)
}

fn split_category(
    category: Category,
    dumps: &[DumpFile],
    writer: &StageWriter,
) -> Result<Vec<CategoryTable>> {
    let mut per_test = Vec::with_capacity(dumps.len());
    let mut tagged = Vec::with_capacity(dumps.len());

    for dump in dumps {
        let raw = load_dump(&dump.archived)?;
        let mut table = raw.select_eq(DISCRIMINATOR_COLUMN, category.discriminator())?;
        table.drop_columns(EXTRA_DROP)?;
        if table.is_empty() {
            warn!(%category, test_id = dump.test_id, "no rows for category in this test");
            continue;
        }

        let dropped = table.drop_null_columns();
        if !dropped.is_empty() {
            debug!(%category, test_id = dump.test_id, ?dropped, "dropped empty columns");
        }

        let path = writer.category_test(category, dump.test_id);
        table.name = format!("Split/{}_Test{}.csv", category.file_prefix(), dump.test_id);
        write_csv(&table, &path)?;

        let mut copy = table.clone();
        copy.push_constant(TEST_ID_COLUMN, &dump.test_id.to_string());
        tagged.push(copy);

        per_test.push(CategoryTable {
            category,
            test_id: dump.test_id,
            table,
        });
    }

    if tagged.is_empty() {
        return Err(DatasetError::EmptyCategory {
            category,
            stage: "split",
        }
        .into());
    }

    let merged = Table::concat(format!("Split/{}_Merged.csv", category.file_prefix()), tagged)?;
    write_csv(&merged, writer.category_merged(category))?;
    info!(%category, tests = per_test.len(), rows = merged.len(), "split category");
    Ok(per_test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::TestIdPattern, process::ingest::ingest, table::read_csv};
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;

    const HEADER: &str = ",timestamp,pm-Containers.type,pm-Containers.nRCGI.pLMN-Identity,pm-Containers.dl-PRBUsage,pm-Containers.pDCPBytesDL\n";

    fn setup(bodies: &[(&str, &str)]) -> Result<(TempDir, TempDir, Vec<DumpFile>)> {
        let src = TempDir::new()?;
        let out = TempDir::new()?;
        let mut inputs: Vec<PathBuf> = Vec::new();
        for (name, body) in bodies {
            let p = src.path().join(name);
            fs::write(&p, format!("{}{}", HEADER, body))?;
            inputs.push(p);
        }
        let pattern = TestIdPattern::new(r"Test([0-9]+)\.csv")?;
        let dumps = ingest(&inputs, &pattern, &OutputLayout::new(out.path()))?;
        Ok((src, out, dumps))
    }

    #[test]
    fn each_category_keeps_its_own_columns() -> Result<()> {
        let (_src, out, dumps) = setup(&[(
            "Test1.csv",
            "0,10,oDU,001,55,\n1,11,oCU-UP,001,,900\n2,12,oCU-CP,001,,\n3,13,oDU,001,56,\n",
        )])?;
        let tables = split(&dumps, &OutputLayout::new(out.path()))?;

        let du = &tables[0];
        assert_eq!(du.category, Category::Du);
        assert_eq!(
            du.table.headers,
            vec!["Original index", "timestamp", "pm-Containers.dl-PRBUsage"]
        );
        assert_eq!(du.table.rows[1], vec!["3", "13", "56"]);

        let cu_up = &tables[1];
        assert_eq!(
            cu_up.table.headers,
            vec!["Original index", "timestamp", "pm-Containers.pDCPBytesDL"]
        );

        let cu_cp = read_csv(out.path().join("Split/Separated/CU-CPData_Test1.csv"))?;
        assert_eq!(cu_cp.headers, vec!["Unnamed: 0", "Original index", "timestamp"]);
        Ok(())
    }

    #[test]
    fn merged_split_is_union_of_per_test_tables() -> Result<()> {
        let (_src, out, dumps) = setup(&[
            ("Test1.csv", "0,10,oDU,001,55,\n1,11,oCU-UP,001,,900\n2,12,oCU-CP,001,,\n"),
            ("Test2.csv", "0,20,oDU,001,,\n1,21,oCU-UP,001,,901\n2,22,oCU-CP,001,,\n3,23,oDU,001,,\n"),
        ])?;
        split(&dumps, &OutputLayout::new(out.path()))?;

        let merged = read_csv(out.path().join("Split/DUData_Merged.csv"))?;
        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged.headers,
            vec!["Unnamed: 0", "Original index", "timestamp", "pm-Containers.dl-PRBUsage", "Test ID"]
        );
        // test 2 had no PRB usage at all, so its per-test table lacks the column
        let t2 = read_csv(out.path().join("Split/Separated/DUData_Test2.csv"))?;
        assert!(t2.column_index("pm-Containers.dl-PRBUsage").is_none());
        let ids: Vec<&str> = merged.column("Test ID")?.collect();
        assert_eq!(ids, vec!["1", "2", "2"]);
        Ok(())
    }

    #[test]
    fn category_absent_from_one_test_is_skipped() -> Result<()> {
        let (_src, out, dumps) = setup(&[
            ("Test1.csv", "0,10,oDU,001,1,\n1,11,oCU-UP,001,,2\n2,12,oCU-CP,001,,\n"),
            ("Test2.csv", "0,20,oDU,001,1,\n1,21,oCU-UP,001,,2\n"),
        ])?;
        let tables = split(&dumps, &OutputLayout::new(out.path()))?;
        assert_eq!(tables.len(), 5);
        assert!(!out.path().join("Split/Separated/CU-CPData_Test2.csv").exists());
        Ok(())
    }

    #[test]
    fn category_absent_everywhere_is_fatal() -> Result<()> {
        let (_src, out, dumps) = setup(&[("Test1.csv", "0,10,oDU,001,1,\n1,11,oCU-UP,001,,2\n")])?;
        let err = split(&dumps, &OutputLayout::new(out.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::EmptyCategory {
                category: Category::CuCp,
                ..
            })
        ));
        assert!(!out.path().join("Split").exists());
        Ok(())
    }
}
