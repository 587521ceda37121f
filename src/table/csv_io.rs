use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{fs::File, io::BufReader, path::Path};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{utils::unnamed_header, Table};

/// Load a headed CSV file. Blank headers become `Unnamed: <position>`.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                unnamed_header(i)
            } else {
                h.to_string()
            }
        })
        .collect();

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut table = Table::new(name, headers);

    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        table.rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(
        file = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded table"
    );
    Ok(table)
}

/// Write `table` with a leading blank-headed row-number column.
///
/// The file is written to a temporary sibling and renamed into place once
/// complete, so readers never observe a half-written CSV.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;

    {
        let mut wtr = WriterBuilder::new().from_writer(&mut tmp);
        let mut header = Vec::with_capacity(table.headers.len() + 1);
        header.push("");
        header.extend(table.headers.iter().map(String::as_str));
        wtr.write_record(&header)
            .with_context(|| format!("writing header of {}", path.display()))?;

        for (i, row) in table.rows.iter().enumerate() {
            let pos = i.to_string();
            let record = std::iter::once(pos.as_str()).chain(row.iter().map(String::as_str));
            wtr.write_record(record)
                .with_context(|| format!("writing row {} of {}", i, path.display()))?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {}", path.display()))?;
    }

    tmp.persist(path)
        .with_context(|| format!("moving finished CSV into {}", path.display()))?;
    debug!(file = %path.display(), rows = table.rows.len(), "wrote table");
    Ok(())
}
