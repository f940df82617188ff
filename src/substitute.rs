//! Raw text substitution over `w:t` nodes.
//!
//! Some template text is split across runs or lives outside any table, where
//! the structured model cannot address it atomically. This pass works
//! directly on the body XML: every `w:t` leaf whose text contains a
//! replacement key gets every occurrence of every matching key replaced, in
//! the insertion order of the replacement list. Results are order-dependent
//! when replacement values contain other keys; callers order the list
//! accordingly.

use tracing::debug;

use crate::document::{escape_text, Document};
use crate::error::Result;

/// Apply `replacements` (ordered `old → new` pairs) to every text node in
/// the body. Pending table mutations are flushed first and the tables
/// reparsed afterwards, so both views stay consistent. Returns the number of
/// text nodes rewritten. The XML declaration is never touched.
pub fn substitute(doc: &mut Document, replacements: &[(String, String)]) -> Result<usize> {
    doc.flush()?;

    let mut edits: Vec<(std::ops::Range<usize>, String)> = Vec::new();
    {
        let parsed = roxmltree::Document::parse(&doc.body)?;
        for node in parsed.descendants() {
            if node.tag_name().name() != "t" {
                continue;
            }
            let Some(text_node) = node.first_child() else {
                continue;
            };
            if !text_node.is_text() {
                continue;
            }
            let old = text_node.text().unwrap_or("");
            if !replacements
                .iter()
                .any(|(k, _)| !k.is_empty() && old.contains(k.as_str()))
            {
                continue;
            }
            let mut new = old.to_string();
            for (key, value) in replacements {
                if !key.is_empty() {
                    new = new.replace(key.as_str(), value);
                }
            }
            if new != old {
                edits.push((text_node.range(), escape_text(&new)));
            }
        }
    }

    let count = edits.len();
    for (range, raw) in edits.into_iter().rev() {
        doc.body.replace_range(range, &raw);
    }
    doc.reparse()?;
    debug!("substituted text in {count} nodes");
    Ok(count)
}
