//! Row insertion and deletion with template formatting.

use tracing::{info, warn};

use crate::document::{Row, Table};
use crate::error::{Error, Result};

/// Append a row, using the table's last row as the formatting template.
///
/// The new row copies the template's cell count and per-cell formatting
/// (`w:tcPr`, first paragraph `w:pPr`, first run `w:rPr`) index-aligned.
/// Values beyond the template's cell count are dropped; missing values leave
/// the remaining cells empty but still formatted.
pub fn add_row(table: &mut Table, values: &[String]) -> Result<()> {
    let last = table.row_count().checked_sub(1);
    let new_row = match last.and_then(|i| table.row(i)) {
        Some(template) => {
            let mut row = template.clone();
            for i in 0..row.cell_count() {
                let text = values.get(i).map(String::as_str).unwrap_or("");
                if let Some(cell) = row.cell_mut(i) {
                    cell.set_text_keep_format(text);
                }
            }
            row
        }
        // Empty table: no template to copy, build unformatted cells.
        None => Row::bare(values),
    };
    let cells = new_row.cell_count();
    table.push_row(new_row);
    info!("appended row with {cells} cells");
    Ok(())
}

/// Remove the row at `index`. Out-of-range indices leave the table unchanged
/// and report [`Error::IndexOutOfRange`] so the caller can retry.
pub fn delete_row(table: &mut Table, index: usize) -> Result<()> {
    let len = table.row_count();
    if index >= len {
        warn!("delete_row: index {index} out of range (len {len})");
        return Err(Error::IndexOutOfRange { index, len });
    }
    table.remove_row(index);
    info!("deleted row {index}");
    Ok(())
}
