//! PDF export through an external converter.
//!
//! The converter is a black-box collaborator: it takes a document path and
//! either produces a rendered PDF or fails. Failures never remove the
//! already-produced DOCX.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{Error, Result};

/// Convert `docx` to PDF in `out_dir` using LibreOffice. The binary defaults
/// to `soffice` and can be overridden with `SOFFICE_PATH`.
pub fn convert_to_pdf(docx: &Path, out_dir: &Path) -> Result<PathBuf> {
    let soffice = std::env::var("SOFFICE_PATH").unwrap_or_else(|_| "soffice".to_string());
    let output = Command::new(&soffice)
        .args(["--headless", "--convert-to", "pdf", "--outdir"])
        .arg(out_dir)
        .arg(docx)
        .output()
        .map_err(|e| Error::Conversion(format!("cannot launch {soffice}: {e}")))?;

    if !output.status.success() {
        return Err(Error::Conversion(format!(
            "{soffice} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stem = docx.file_stem().unwrap_or_default();
    let pdf = out_dir.join(stem).with_extension("pdf");
    if !pdf.exists() {
        return Err(Error::Conversion(format!(
            "{soffice} reported success but produced no {pdf:?}"
        )));
    }
    info!("PDF written to {:?}", pdf);
    Ok(pdf)
}
