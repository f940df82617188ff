//! Image embedding into table cells.
//!
//! The image becomes the cell's sole content: a media part is added to the
//! archive, a relationship is registered, and an inline `w:drawing` scaled
//! to the cell width (aspect ratio preserved) replaces the cell content.
//! The owning row's height is pinned to exactly fit the scaled image.

use std::path::Path;

use image::GenericImageView;
use tracing::{info, warn};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::package::{CONTENT_TYPES_PART, RELS_PART};

/// EMU per twip (914400 EMU per inch / 1440 twips per inch).
const EMU_PER_TWIP: u64 = 635;
/// Fallback cell width when the table declares no usable grid: 1 inch.
const DEFAULT_WIDTH_TWIPS: u64 = 1440;

const RELS_SKELETON: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
</Relationships>";

impl Document {
    /// Embed the image at `image_path` into cell (`row`, `col`) of table
    /// `table`. Decode and path errors surface as [`Error::Image`] and leave
    /// the cell untouched.
    pub fn add_image(&mut self, table: usize, row: usize, col: usize, image_path: &Path) -> Result<()> {
        let bytes = std::fs::read(image_path)
            .map_err(|e| Error::Image(format!("cannot read {image_path:?}: {e}")))?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| Error::Image(format!("cannot decode {image_path:?}: {e}")))?;
        let (px_w, px_h) = decoded.dimensions();
        if px_w == 0 || px_h == 0 {
            return Err(Error::Image(format!("{image_path:?} has zero dimensions")));
        }
        let (ext, content_type) = content_type_for(image_path)?;

        let tbl = self
            .tables
            .get(table)
            .ok_or_else(|| Error::Image(format!("no table at index {table}")))?;
        if tbl.row(row).and_then(|r| r.cell(col)).is_none() {
            return Err(Error::Image(format!(
                "no cell at table {table}, row {row}, col {col}"
            )));
        }

        // Scale to the column width; fall back to 1 inch when the grid does
        // not declare a usable width.
        let width_twips = match tbl.grid_col_twips(col) {
            Some(w) => u64::from(w),
            None => {
                warn!("no grid width for column {col}, falling back to 1\"");
                DEFAULT_WIDTH_TWIPS
            }
        };
        let cx = width_twips * EMU_PER_TWIP;
        let cy = cx * u64::from(px_h) / u64::from(px_w);

        let (rid, media_name, n) = self.register_media(&bytes, ext, content_type);
        let doc_pr_id = 1000 + n as u64;

        let drawing = render_inline_image(&rid, doc_pr_id, cx, cy, &media_name);
        // Cell existence was verified before the package was touched.
        if let Some(target_row) = self.tables.get_mut(table).and_then(|t| t.row_mut(row)) {
            if let Some(cell) = target_row.cell_mut(col) {
                cell.set_raw_content(drawing);
            }
            target_row.set_exact_height(cy / EMU_PER_TWIP);
        }

        info!(
            "embedded {image_path:?} into table {table} cell ({row},{col}) at {cx}x{cy} EMU"
        );
        Ok(())
    }

    /// Store the image part, register its relationship and content type, and
    /// return the relationship id, part name and media ordinal.
    fn register_media(&mut self, bytes: &[u8], ext: &str, content_type: &str) -> (String, String, usize) {
        let n = self.package.media_part_count() + 1;
        let media_name = format!("word/media/fill_image{n}.{ext}");
        self.package.set_part(&media_name, bytes.to_vec());

        // Relationship id: one past the highest existing rId number.
        let rels = self
            .package
            .part_str(RELS_PART)
            .unwrap_or_else(|| RELS_SKELETON.to_string());
        let next = next_relationship_number(&rels);
        let rid = format!("rId{next}");
        let rel = format!(
            "<Relationship Id=\"{rid}\" \
             Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" \
             Target=\"media/fill_image{n}.{ext}\"/>"
        );
        let rels = match rels.rfind("</Relationships>") {
            Some(at) => {
                let mut s = rels.clone();
                s.insert_str(at, &rel);
                s
            }
            None => rels,
        };
        self.package.set_part(RELS_PART, rels.into_bytes());

        // Content type default for the extension.
        if let Some(types) = self.package.part_str(CONTENT_TYPES_PART) {
            let marker = format!("Extension=\"{ext}\"");
            if !types.contains(&marker) {
                if let Some(at) = types.rfind("</Types>") {
                    let mut s = types.clone();
                    s.insert_str(
                        at,
                        &format!("<Default Extension=\"{ext}\" ContentType=\"{content_type}\"/>"),
                    );
                    self.package.set_part(CONTENT_TYPES_PART, s.into_bytes());
                }
            }
        }

        (rid, media_name, n)
    }
}

fn content_type_for(path: &Path) -> Result<(&'static str, &'static str)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok(("png", "image/png")),
        "jpg" | "jpeg" => Ok(("jpeg", "image/jpeg")),
        "gif" => Ok(("gif", "image/gif")),
        "bmp" => Ok(("bmp", "image/bmp")),
        other => Err(Error::Image(format!("unsupported image extension {other:?}"))),
    }
}

fn next_relationship_number(rels_xml: &str) -> usize {
    let mut max = 0usize;
    let mut rest = rels_xml;
    while let Some(at) = rest.find("Id=\"rId") {
        let tail = &rest[at + 7..];
        let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<usize>() {
            max = max.max(n);
        }
        rest = tail;
    }
    max + 1
}

fn render_inline_image(rid: &str, doc_pr_id: u64, cx: u64, cy: u64, name: &str) -> String {
    format!(
        "<w:p><w:r><w:drawing>\
         <wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\" \
           xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:docPr id=\"{doc_pr_id}\" name=\"{name}\"/>\
         <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
         <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:nvPicPr><pic:cNvPr id=\"{doc_pr_id}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill>\
         <a:blip r:embed=\"{rid}\" \
           xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"/>\
         <a:stretch><a:fillRect/></a:stretch>\
         </pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline>\
         </w:drawing></w:r></w:p>"
    )
}
