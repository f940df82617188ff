//! CSV-driven table population.
//!
//! Template tables come with awkward layouts: blank spacer rows between data
//! rows, header rows that do not line up 1:1 with data rows, and per-variant
//! conventions for where a column's value lands. The populator walks rows
//! and dataset records in lockstep, skipping blank rows without consuming a
//! record, and appends formatted rows when the dataset outlives the table.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::document::Table;
use crate::error::Result;
use crate::rows;

/// An ordered, named-column dataset read from CSV.
///
/// The header row defines the column names (trimmed, order-preserving).
/// Data rows may be ragged; missing fields read as empty.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Vec<String>>,
}

impl Dataset {
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            // Headers handled manually so ragged data rows stay tolerated.
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = csv_reader.records();
        let columns = match rows.next() {
            Some(header) => header?
                .iter()
                .map(|f| f.trim().to_string())
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };

        let mut records = Vec::new();
        for record in rows {
            let record = record?;
            records.push(record.iter().map(|f| f.trim().to_string()).collect());
        }
        debug!(
            "read dataset: {} columns, {} records",
            columns.len(),
            records.len()
        );
        Ok(Self { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Field of record `record` for the column at `col`; ragged rows and
    /// unknown indices read as empty.
    pub fn value(&self, record: usize, col: usize) -> &str {
        self.records
            .get(record)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Where a dynamically matched column's value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicTarget {
    /// The cell after the one matching the column name (label/value layout).
    NextCell,
    /// The matching cell itself (data rows carry placeholder text equal to
    /// the column names and are overwritten in place).
    InPlace,
}

/// Rule mapping a dataset column onto a target cell.
#[derive(Debug, Clone)]
pub enum ColumnBinding {
    /// Match column names against the row's trimmed cell text.
    Dynamic { target: DynamicTarget },
    /// Fixed column name → cell index, independent of cell content.
    Static(HashMap<String, usize>),
}

/// On-disk shape of a static binding file (JSON: `{"Name": 0, "Age": 1}`).
#[derive(Debug, Deserialize)]
pub struct StaticBindingFile(pub HashMap<String, usize>);

/// Populate `table` from `dataset` starting at `start_row`.
///
/// Blank rows are skipped without consuming a record. Columns with no
/// matching cell (and cells with no matching column) are left alone. When
/// records remain after the last row, formatted rows are appended so no
/// record is dropped.
pub fn populate(
    table: &mut Table,
    dataset: &Dataset,
    binding: &ColumnBinding,
    start_row: usize,
) -> Result<()> {
    let mut row_idx = start_row;
    for rec in 0..dataset.len() {
        while row_idx < table.row_count()
            && table.row(row_idx).map(|r| r.is_blank()).unwrap_or(false)
        {
            row_idx += 1;
        }

        if row_idx >= table.row_count() {
            let values = growth_values(dataset, rec, binding);
            rows::add_row(table, &values)?;
            row_idx = table.row_count();
            continue;
        }

        write_record(table, row_idx, dataset, rec, binding);
        row_idx += 1;
    }
    Ok(())
}

fn write_record(
    table: &mut Table,
    row_idx: usize,
    dataset: &Dataset,
    rec: usize,
    binding: &ColumnBinding,
) {
    match binding {
        ColumnBinding::Dynamic { target } => {
            let texts: Vec<String> = table
                .row(row_idx)
                .map(|row| row.cells().map(|c| c.text().trim().to_string()).collect())
                .unwrap_or_default();
            let Some(row) = table.row_mut(row_idx) else {
                return;
            };
            for (ci, column) in dataset.columns().iter().enumerate() {
                let Some(pos) = texts.iter().position(|t| t == column) else {
                    continue;
                };
                let cell_idx = match target {
                    DynamicTarget::InPlace => pos,
                    DynamicTarget::NextCell => pos + 1,
                };
                match row.cell_mut(cell_idx) {
                    Some(cell) => cell.set_text_keep_format(dataset.value(rec, ci)),
                    None => warn!(
                        "column {column:?} matched the last cell of row {row_idx}, no target cell"
                    ),
                }
            }
        }
        ColumnBinding::Static(map) => {
            let Some(row) = table.row_mut(row_idx) else {
                return;
            };
            for (ci, column) in dataset.columns().iter().enumerate() {
                let Some(&cell_idx) = map.get(column) else {
                    continue;
                };
                if let Some(cell) = row.cell_mut(cell_idx) {
                    cell.set_text_keep_format(dataset.value(rec, ci));
                }
            }
        }
    }
}

/// Layout of an appended row's values: dataset column order for dynamic
/// bindings, bound indices for static ones.
fn growth_values(dataset: &Dataset, rec: usize, binding: &ColumnBinding) -> Vec<String> {
    match binding {
        ColumnBinding::Dynamic { .. } => (0..dataset.columns().len())
            .map(|ci| dataset.value(rec, ci).to_string())
            .collect(),
        ColumnBinding::Static(map) => {
            let width = map.values().map(|i| i + 1).max().unwrap_or(0);
            let mut values = vec![String::new(); width];
            for (ci, column) in dataset.columns().iter().enumerate() {
                if let Some(&cell_idx) = map.get(column) {
                    values[cell_idx] = dataset.value(rec, ci).to_string();
                }
            }
            values
        }
    }
}
