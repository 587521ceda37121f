// src/table/mod.rs
pub mod csv_io;
pub mod utils;

use anyhow::Result;
use std::cmp::Ordering;

use crate::error::DatasetError;
use utils::{is_null, parse_number};

pub use csv_io::{read_csv, write_csv};

/// An in-memory CSV table: named columns over rows of verbatim text cells.
///
/// Row numbering is implicit: rows are written with positions `0..n`, so any
/// operation that reorders or filters rows "resets the index" for free.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Label used in error messages (usually the source file name).
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Like [`Table::column_index`], but a missing column is an error.
    pub fn require_column(&self, column: &str) -> Result<usize, DatasetError> {
        self.column_index(column)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: column.to_string(),
                table: self.name.clone(),
            })
    }

    /// Iterate over the cells of one column.
    pub fn column(&self, column: &str) -> Result<impl Iterator<Item = &str> + '_, DatasetError> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(move |r| r[idx].as_str()))
    }

    /// Drop the named columns; every one of them must exist.
    pub fn drop_columns(&mut self, columns: &[&str]) -> Result<(), DatasetError> {
        let mut doomed = Vec::with_capacity(columns.len());
        for c in columns {
            doomed.push(self.require_column(c)?);
        }
        self.retain_columns(|i| !doomed.contains(&i));
        Ok(())
    }

    /// Drop every column whose cells are all null, returning their names.
    ///
    /// On an empty table every column qualifies.
    pub fn drop_null_columns(&mut self) -> Vec<String> {
        let empty: Vec<usize> = (0..self.headers.len())
            .filter(|&i| self.rows.iter().all(|r| is_null(&r[i])))
            .collect();
        let dropped = empty.iter().map(|&i| self.headers[i].clone()).collect();
        self.retain_columns(|i| !empty.contains(&i));
        dropped
    }

    fn retain_columns(&mut self, keep: impl Fn(usize) -> bool) {
        let keep: Vec<bool> = (0..self.headers.len()).map(&keep).collect();
        let mut it = keep.iter();
        self.headers.retain(|_| *it.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut it = keep.iter();
            row.retain(|_| *it.next().unwrap_or(&true));
        }
    }

    /// Rename one column if present. Returns whether it was found.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(i) => {
                self.headers[i] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Rename every header for which `map` returns a new name.
    pub fn rename_with<'a>(&mut self, map: impl Fn(&str) -> Option<&'a str>) {
        for h in &mut self.headers {
            if let Some(to) = map(h) {
                *h = to.to_string();
            }
        }
    }

    /// Rows whose `column` cell equals `value`, as a new table.
    pub fn select_eq(&self, column: &str, value: &str) -> Result<Table, DatasetError> {
        let idx = self.require_column(column)?;
        Ok(Table {
            name: self.name.clone(),
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r[idx].trim() == value)
                .cloned()
                .collect(),
        })
    }

    /// Append a column holding the same value in every row.
    pub fn push_constant(&mut self, column: &str, value: &str) {
        self.headers.push(column.to_string());
        for row in &mut self.rows {
            row.push(value.to_string());
        }
    }

    /// Insert a column at position 0 holding each row's position.
    pub fn insert_row_positions(&mut self, column: &str) {
        self.headers.insert(0, column.to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.insert(0, i.to_string());
        }
    }

    /// Stable ascending sort on numeric keys, nulls last.
    pub fn sort_by_numeric(&mut self, keys: &[&str]) -> Result<(), DatasetError> {
        let mut idxs = Vec::with_capacity(keys.len());
        for k in keys {
            idxs.push(self.require_column(k)?);
        }

        let mut keyed = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..) {
            let mut key = Vec::with_capacity(idxs.len());
            for (&i, column) in idxs.iter().zip(keys) {
                let cell = &row[i];
                match parse_number(cell) {
                    Some(v) => key.push(Some(v)),
                    None if is_null(cell) => key.push(None),
                    None => {
                        return Err(DatasetError::NonNumeric {
                            value: cell.clone(),
                            column: column.to_string(),
                            table: self.name.clone(),
                        })
                    }
                }
            }
            keyed.push((key, row));
        }

        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        self.rows = keyed.into_iter().map(|(_, r)| r).collect();
        Ok(())
    }

    /// Row-wise union of `tables`, in order.
    ///
    /// The result carries every column seen, in first-seen order; cells a
    /// source table lacks are left empty.
    pub fn concat(name: impl Into<String>, tables: Vec<Table>) -> Result<Table, DatasetError> {
        let name = name.into();
        if tables.is_empty() {
            return Err(DatasetError::EmptyMerge(name));
        }

        let mut headers: Vec<String> = Vec::new();
        for t in &tables {
            for h in &t.headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }

        let mut out = Table::new(name, headers);
        for t in tables {
            let positions: Vec<usize> = t
                .headers
                .iter()
                .map(|h| out.headers.iter().position(|o| o == h).unwrap_or(0))
                .collect();
            for row in t.rows {
                let mut merged = vec![String::new(); out.headers.len()];
                for (cell, &p) in row.into_iter().zip(&positions) {
                    merged[p] = cell;
                }
                out.rows.push(merged);
            }
        }
        Ok(out)
    }
}

fn compare_keys(a: &[Option<f64>], b: &[Option<f64>]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x, y) {
            (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
