use anyhow::Result;
use tracing::{info, instrument};

use super::split::CategoryTable;
use crate::{
    dataset::{
        display_name, Category, OutputLayout, Stage, ORIGINAL_INDEX_COLUMN, TEST_ID_COLUMN,
        TIMESTAMP_COLUMN,
    },
    error::DatasetError,
    table::{write_csv, Table},
};

/// Drop the original index, apply display names and order rows by time.
///
/// Fails if the renamed table has no `Timestamp` column, since every later
/// step keys on it.
pub fn normalize_table(table: &mut Table) -> Result<(), DatasetError> {
    table.drop_columns(&[ORIGINAL_INDEX_COLUMN])?;
    table.rename_with(display_name);
    table.sort_by_numeric(&[TIMESTAMP_COLUMN])
}

/// Stage 3: rename and time-sort every split table.
#[instrument(level = "info", skip_all, fields(tables = tables.len()))]
pub fn normalize(tables: Vec<CategoryTable>, layout: &OutputLayout) -> Result<Vec<CategoryTable>> {
    let writer = layout.begin(Stage::Processed)?;
    let mut out = Vec::with_capacity(tables.len());

    for category in Category::ALL {
        let mut tagged = Vec::new();
        for mut ct in tables.iter().filter(|t| t.category == category).cloned() {
            ct.table.name = format!("Processed/{}_Test{}.csv", category.file_prefix(), ct.test_id);
            normalize_table(&mut ct.table)?;
            write_csv(&ct.table, writer.category_test(category, ct.test_id))?;

            let mut copy = ct.table.clone();
            copy.push_constant(TEST_ID_COLUMN, &ct.test_id.to_string());
            tagged.push(copy);
            out.push(ct);
        }

        if tagged.is_empty() {
            return Err(DatasetError::EmptyCategory {
                category,
                stage: "field normalization",
            }
            .into());
        }
        // concatenated in processing order, not re-sorted across tests
        let merged = Table::concat(
            format!("Processed/{}_Merged.csv", category.file_prefix()),
            tagged,
        )?;
        write_csv(&merged, writer.category_merged(category))?;
        info!(%category, rows = merged.len(), "normalized category");
    }

    writer.commit()?;
    Ok(out)
}
