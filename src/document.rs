//! Owned table/row/cell model over `word/document.xml`.
//!
//! Tables are parsed out of the body with roxmltree and held as owned trees.
//! Everything the model does not interpret — table/row/cell property blocks,
//! bookmarks, nested tables, drawings — is kept as a verbatim byte slice of
//! the original XML, so rendering a table back is lossless for content we
//! did not touch. Mutated tables are spliced back into the body string by
//! byte range, and the body is reparsed so indices stay valid across
//! mutations.

use std::ops::Range;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::package::{Package, DOCUMENT_PART};

pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// A loaded DOCX document: the ZIP container plus the parsed body.
#[derive(Debug)]
pub struct Document {
    pub(crate) package: Package,
    pub(crate) body: String,
    pub(crate) tables: Vec<Table>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) children: Vec<TableChild>,
    /// Column widths in twips from `w:tblGrid`, empty when absent.
    pub(crate) grid_cols: Vec<u32>,
    /// Byte range of this table in the body at last parse.
    pub(crate) range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub(crate) children: Vec<RowChild>,
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub(crate) children: Vec<CellChild>,
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    pub(crate) children: Vec<ParaChild>,
}

#[derive(Debug, Clone)]
pub struct Run {
    pub(crate) children: Vec<RunChild>,
}

#[derive(Debug, Clone)]
pub(crate) enum TableChild {
    Row(Row),
    Raw(String),
}

#[derive(Debug, Clone)]
pub(crate) enum RowChild {
    Cell(Cell),
    Raw(String),
}

#[derive(Debug, Clone)]
pub(crate) enum CellChild {
    Paragraph(Paragraph),
    Raw(String),
}

#[derive(Debug, Clone)]
pub(crate) enum ParaChild {
    Run(Run),
    Raw(String),
}

#[derive(Debug, Clone)]
pub(crate) enum RunChild {
    /// Unescaped text of a `w:t` element.
    Text(String),
    Raw(String),
}

impl Document {
    /// Load a document from disk. Fails with [`crate::Error::Load`] when the
    /// container is not a DOCX archive.
    pub fn load(path: &Path) -> Result<Self> {
        let package = Package::load(path)?;
        // Presence of the part is checked by Package::load.
        let body = package.part_str(DOCUMENT_PART).unwrap_or_default();
        let mut doc = Self {
            package,
            body,
            tables: Vec::new(),
        };
        doc.reparse()?;
        debug!("parsed {} top-level tables", doc.tables.len());
        Ok(doc)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, index: usize) -> Option<&Table> {
        self.tables.get(index)
    }

    pub fn table_mut(&mut self, index: usize) -> Option<&mut Table> {
        self.tables.get_mut(index)
    }

    /// Render every table back into the body string and reparse.
    ///
    /// Indices held by callers are stale after this; re-read them from the
    /// document.
    pub fn flush(&mut self) -> Result<()> {
        let mut body = std::mem::take(&mut self.body);
        for table in self.tables.iter().rev() {
            body.replace_range(table.range.clone(), &table.render());
        }
        self.body = body;
        self.reparse()
    }

    /// The current body XML, with all table mutations applied.
    pub fn body_xml(&mut self) -> Result<&str> {
        self.flush()?;
        Ok(&self.body)
    }

    /// Flush mutations and rewrite the archive at `path`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.flush()?;
        self.package
            .set_part(DOCUMENT_PART, self.body.clone().into_bytes());
        self.package.save(path)
    }

    pub(crate) fn reparse(&mut self) -> Result<()> {
        let parsed = roxmltree::Document::parse(&self.body)?;
        let mut tables = Vec::new();
        for node in parsed.descendants() {
            if node.tag_name().name() != "tbl" {
                continue;
            }
            // Nested tables stay raw inside their owning cell.
            if node
                .ancestors()
                .skip(1)
                .any(|a| a.tag_name().name() == "tbl")
            {
                continue;
            }
            tables.push(parse_table(node, &self.body));
        }
        self.tables = tables;
        Ok(())
    }
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| matches!(c, TableChild::Row(_)))
            .count()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.children
            .iter()
            .filter_map(|c| match c {
                TableChild::Row(r) => Some(r),
                TableChild::Raw(_) => None,
            })
            .nth(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.children
            .iter_mut()
            .filter_map(|c| match c {
                TableChild::Row(r) => Some(r),
                TableChild::Raw(_) => None,
            })
            .nth(index)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.children.iter().filter_map(|c| match c {
            TableChild::Row(r) => Some(r),
            TableChild::Raw(_) => None,
        })
    }

    /// Max cell count across rows; rows may have fewer cells due to merges.
    pub fn column_count(&self) -> usize {
        self.rows().map(Row::cell_count).max().unwrap_or(0)
    }

    /// Column width in twips from `w:tblGrid`, when declared.
    pub fn grid_col_twips(&self, col: usize) -> Option<u32> {
        self.grid_cols.get(col).copied().filter(|w| *w > 0)
    }

    /// Append a row after the last existing row.
    pub(crate) fn push_row(&mut self, row: Row) {
        // The final child is always the raw close-tag slice.
        let at = self.children.len().saturating_sub(1);
        self.children.insert(at, TableChild::Row(row));
    }

    pub(crate) fn remove_row(&mut self, index: usize) -> bool {
        let mut seen = 0usize;
        for (i, child) in self.children.iter().enumerate() {
            if let TableChild::Row(_) = child {
                if seen == index {
                    self.children.remove(i);
                    return true;
                }
                seen += 1;
            }
        }
        false
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                TableChild::Raw(raw) => out.push_str(raw),
                TableChild::Row(row) => row.render(&mut out),
            }
        }
        out
    }
}

impl Row {
    pub fn cell_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| matches!(c, RowChild::Cell(_)))
            .count()
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells().nth(index)
    }

    pub fn cell_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.children
            .iter_mut()
            .filter_map(|c| match c {
                RowChild::Cell(cell) => Some(cell),
                RowChild::Raw(_) => None,
            })
            .nth(index)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.children.iter().filter_map(|c| match c {
            RowChild::Cell(cell) => Some(cell),
            RowChild::Raw(_) => None,
        })
    }

    /// A plain unformatted row with one cell per value. Used only when a
    /// table has no row to act as a formatting template.
    pub(crate) fn bare(values: &[String]) -> Self {
        let mut children = vec![RowChild::Raw("<w:tr>".to_string())];
        for value in values {
            let mut cell = Cell {
                children: vec![
                    CellChild::Raw("<w:tc>".to_string()),
                    CellChild::Raw("</w:tc>".to_string()),
                ],
            };
            cell.set_text(value);
            children.push(RowChild::Cell(cell));
        }
        children.push(RowChild::Raw("</w:tr>".to_string()));
        Row { children }
    }

    /// A row is blank iff every cell's trimmed text is empty.
    pub fn is_blank(&self) -> bool {
        self.cells().all(|c| c.text().trim().is_empty())
    }

    /// Pin this row to an exact height in twips, replacing any existing
    /// `w:trHeight` and disabling auto-fit.
    pub(crate) fn set_exact_height(&mut self, twips: u64) {
        let height = format!("<w:trHeight w:val=\"{twips}\" w:hRule=\"exact\"/>");
        let Some(RowChild::Raw(lead)) = self.children.first_mut() else {
            return;
        };
        if let Some(pr_start) = lead.find("<w:trPr") {
            // Drop an existing trHeight first; it is always self-closing.
            if let Some(h_start) = lead.find("<w:trHeight") {
                if let Some(h_len) = lead[h_start..].find("/>") {
                    lead.replace_range(h_start..h_start + h_len + 2, "");
                }
            }
            let after = &lead[pr_start..];
            if let Some(gt) = after.find('>') {
                if after[..gt].ends_with('/') {
                    // <w:trPr/> — expand it.
                    let abs = pr_start + gt + 1;
                    lead.replace_range(pr_start..abs, &format!("<w:trPr>{height}</w:trPr>"));
                } else {
                    lead.insert_str(pr_start + gt + 1, &height);
                }
            }
        } else if let Some(gt) = lead.find('>') {
            lead.insert_str(gt + 1, &format!("<w:trPr>{height}</w:trPr>"));
        }
    }

    pub(crate) fn render(&self, out: &mut String) {
        for child in &self.children {
            match child {
                RowChild::Raw(raw) => out.push_str(raw),
                RowChild::Cell(cell) => cell.render(out),
            }
        }
    }
}

impl Cell {
    /// Displayed text: run text concatenated, paragraphs joined by newlines.
    /// Matching is always done on the trimmed result.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        for child in &self.children {
            if let CellChild::Paragraph(p) = child {
                parts.push(p.text());
            }
        }
        parts.join("\n")
    }

    /// Replace all content with a single run of `text`, discarding paragraph
    /// and run styling (cell-level properties are kept).
    pub fn set_text(&mut self, text: &str) {
        self.replace_content(make_paragraph(None, None, text));
    }

    /// Replace all content with a single run of `text`, carrying over the
    /// first paragraph's `w:pPr` and the first run's `w:rPr`.
    pub fn set_text_keep_format(&mut self, text: &str) {
        let p_pr = self.first_paragraph_ppr();
        let r_pr = self.first_run_rpr();
        self.replace_content(make_paragraph(p_pr, r_pr, text));
    }

    /// Replace all content with a verbatim paragraph-level XML block.
    pub(crate) fn set_raw_content(&mut self, xml: String) {
        let lead = self.lead_raw();
        let close = self.close_raw();
        self.children = vec![
            CellChild::Raw(lead),
            CellChild::Raw(xml),
            CellChild::Raw(close),
        ];
    }

    fn replace_content(&mut self, paragraph: Paragraph) {
        let lead = self.lead_raw();
        let close = self.close_raw();
        self.children = vec![
            CellChild::Raw(lead),
            CellChild::Paragraph(paragraph),
            CellChild::Raw(close),
        ];
    }

    /// Opening tag plus `w:tcPr`, everything before the first paragraph.
    fn lead_raw(&self) -> String {
        match self.children.first() {
            Some(CellChild::Raw(raw)) => raw.clone(),
            _ => "<w:tc>".to_string(),
        }
    }

    fn close_raw(&self) -> String {
        match self.children.last() {
            Some(CellChild::Raw(raw)) if self.children.len() > 1 => raw.clone(),
            _ => "</w:tc>".to_string(),
        }
    }

    fn first_paragraph(&self) -> Option<&Paragraph> {
        self.children.iter().find_map(|c| match c {
            CellChild::Paragraph(p) => Some(p),
            CellChild::Raw(_) => None,
        })
    }

    fn first_paragraph_ppr(&self) -> Option<String> {
        let para = self.first_paragraph()?;
        match para.children.first() {
            Some(ParaChild::Raw(raw)) => extract_element(raw, "pPr"),
            _ => None,
        }
    }

    fn first_run_rpr(&self) -> Option<String> {
        let para = self.first_paragraph()?;
        let run = para.children.iter().find_map(|c| match c {
            ParaChild::Run(r) => Some(r),
            ParaChild::Raw(_) => None,
        })?;
        match run.children.first() {
            Some(RunChild::Raw(raw)) => extract_element(raw, "rPr"),
            _ => None,
        }
    }

    pub(crate) fn render(&self, out: &mut String) {
        for child in &self.children {
            match child {
                CellChild::Raw(raw) => out.push_str(raw),
                CellChild::Paragraph(p) => p.render(out),
            }
        }
    }
}

impl Paragraph {
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let ParaChild::Run(run) = child {
                out.push_str(&run.text());
            }
        }
        out
    }

    fn render(&self, out: &mut String) {
        for child in &self.children {
            match child {
                ParaChild::Raw(raw) => out.push_str(raw),
                ParaChild::Run(run) => run.render(out),
            }
        }
    }
}

impl Run {
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let RunChild::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    fn render(&self, out: &mut String) {
        for child in &self.children {
            match child {
                RunChild::Raw(raw) => out.push_str(raw),
                RunChild::Text(t) => {
                    out.push_str("<w:t xml:space=\"preserve\">");
                    out.push_str(&escape_text(t));
                    out.push_str("</w:t>");
                }
            }
        }
    }
}

// ── Parsing ──────────────────────────────────────────────────────

fn parse_table(node: roxmltree::Node, xml: &str) -> Table {
    let range = node.range();
    let mut children = Vec::new();
    let mut cursor = range.start;
    for child in node.children() {
        if child.tag_name().name() == "tr" && child.first_child().is_some() {
            push_raw_gap(&mut children, xml, cursor, child.range().start, TableChild::Raw);
            children.push(TableChild::Row(parse_row(child, xml)));
            cursor = child.range().end;
        }
    }
    push_raw_gap(&mut children, xml, cursor, range.end, TableChild::Raw);

    let mut grid_cols = Vec::new();
    for child in node.children() {
        if child.tag_name().name() != "tblGrid" {
            continue;
        }
        for gc in child.children() {
            if gc.tag_name().name() == "gridCol" {
                let w = wattr(gc, "w")
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0);
                grid_cols.push(w);
            }
        }
    }

    Table {
        children,
        grid_cols,
        range,
    }
}

fn parse_row(node: roxmltree::Node, xml: &str) -> Row {
    let range = node.range();
    let mut children = Vec::new();
    let mut cursor = range.start;
    for child in node.children() {
        if child.tag_name().name() == "tc" && child.first_child().is_some() {
            push_raw_gap(&mut children, xml, cursor, child.range().start, RowChild::Raw);
            children.push(RowChild::Cell(parse_cell(child, xml)));
            cursor = child.range().end;
        }
    }
    push_raw_gap(&mut children, xml, cursor, range.end, RowChild::Raw);
    Row { children }
}

fn parse_cell(node: roxmltree::Node, xml: &str) -> Cell {
    let range = node.range();
    let mut children = Vec::new();
    let mut cursor = range.start;
    for child in node.children() {
        // Empty paragraphs (`<w:p/>`) are recognized too: blank cells carry
        // them and set_text must not leave them behind.
        if child.tag_name().name() == "p" {
            push_raw_gap(&mut children, xml, cursor, child.range().start, CellChild::Raw);
            children.push(CellChild::Paragraph(parse_paragraph(child, xml)));
            cursor = child.range().end;
        }
    }
    push_raw_gap(&mut children, xml, cursor, range.end, CellChild::Raw);
    Cell { children }
}

fn parse_paragraph(node: roxmltree::Node, xml: &str) -> Paragraph {
    let range = node.range();
    let mut children = Vec::new();
    let mut cursor = range.start;
    for child in node.children() {
        if child.tag_name().name() == "r" && child.first_child().is_some() {
            push_raw_gap(&mut children, xml, cursor, child.range().start, ParaChild::Raw);
            children.push(ParaChild::Run(parse_run(child, xml)));
            cursor = child.range().end;
        }
    }
    push_raw_gap(&mut children, xml, cursor, range.end, ParaChild::Raw);
    Paragraph { children }
}

fn parse_run(node: roxmltree::Node, xml: &str) -> Run {
    let range = node.range();
    let mut children = Vec::new();
    let mut cursor = range.start;
    for child in node.children() {
        if child.tag_name().name() == "t" && child.first_child().is_some() {
            push_raw_gap(&mut children, xml, cursor, child.range().start, RunChild::Raw);
            children.push(RunChild::Text(child.text().unwrap_or("").to_string()));
            cursor = child.range().end;
        }
    }
    push_raw_gap(&mut children, xml, cursor, range.end, RunChild::Raw);
    Run { children }
}

fn push_raw_gap<C>(children: &mut Vec<C>, xml: &str, from: usize, to: usize, wrap: fn(String) -> C) {
    if to > from {
        children.push(wrap(xml[from..to].to_string()));
    }
}

/// Namespace-qualified attribute lookup with a plain-name fallback.
pub(crate) fn wattr<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((W_NS, name)).or_else(|| node.attribute(name))
}

fn make_paragraph(p_pr: Option<String>, r_pr: Option<String>, text: &str) -> Paragraph {
    let mut lead = String::from("<w:p>");
    if let Some(p) = p_pr {
        lead.push_str(&p);
    }
    let mut run_lead = String::from("<w:r>");
    if let Some(r) = r_pr {
        run_lead.push_str(&r);
    }
    Paragraph {
        children: vec![
            ParaChild::Raw(lead),
            ParaChild::Run(Run {
                children: vec![
                    RunChild::Raw(run_lead),
                    RunChild::Text(text.to_string()),
                    RunChild::Raw("</w:r>".to_string()),
                ],
            }),
            ParaChild::Raw("</w:p>".to_string()),
        ],
    }
}

/// Extract a whole `<w:{local} …>…</w:{local}>` (or self-closing) element
/// from a raw XML slice.
pub(crate) fn extract_element(raw: &str, local: &str) -> Option<String> {
    let open = format!("<w:{local}");
    let start = raw.find(&open)?;
    let after = &raw[start..];
    let gt = after.find('>')?;
    if after[..gt].ends_with('/') {
        return Some(after[..gt + 1].to_string());
    }
    let close = format!("</w:{local}>");
    let end = after.find(&close)? + close.len();
    Some(after[..end].to_string())
}

pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
