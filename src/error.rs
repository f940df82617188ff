//! Error types for document loading and mutation.

use std::path::PathBuf;

/// Crate-level errors.
///
/// Only `Load` is fatal to a run. Index, image and conversion failures are
/// reported by callers and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load document {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("row index {index} out of range (table has {len} rows)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("image error: {0}")]
    Image(String),

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid document XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
