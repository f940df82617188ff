//! Key/value field filling over a form table.

use std::collections::HashMap;

use tracing::debug;

use crate::document::Table;

/// Label → value pairs for a form table. Supplied per invocation.
pub type FieldMap = HashMap<String, String>;

/// Write each mapped value into the cell immediately following its label.
///
/// Matching is exact on trimmed cell text. A row may hold several label/value
/// pairs side by side; a label in the last cell is silently skipped. Cell
/// texts are captured before any write, so a value that happens to equal
/// another label never cascades — running the fill twice is a no-op.
/// Returns the number of values written.
pub fn fill_fields(table: &mut Table, fields: &FieldMap) -> usize {
    let mut written = 0usize;
    for r in 0..table.row_count() {
        let Some(row) = table.row(r) else { break };
        let count = row.cell_count();
        if count < 2 {
            continue;
        }
        let texts: Vec<String> = row.cells().map(|c| c.text().trim().to_string()).collect();

        let Some(row) = table.row_mut(r) else { break };
        for (i, label) in texts.iter().enumerate() {
            let Some(value) = fields.get(label.as_str()) else {
                continue;
            };
            if let Some(target) = row.cell_mut(i + 1) {
                target.set_text_keep_format(value);
                debug!("filled field {:?} at row {r}, cell {}", label, i + 1);
                written += 1;
            }
        }
    }
    written
}
