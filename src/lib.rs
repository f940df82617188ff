//! Fill fixed-format DOCX templates from external data.
//!
//! The crate mutates an existing document in place: a template is loaded
//! from its ZIP container, its tables are exposed as an owned
//! table/row/cell model, field fillers and the CSV populator rewrite cell
//! text, rows can be appended or deleted with template formatting carried
//! over, and a raw `w:t` substitution pass handles text the structured
//! model cannot address. The mutated body is spliced back into
//! `word/document.xml` and the archive is rewritten.

pub mod convert;
pub mod document;
pub mod error;
pub mod fields;
pub mod media;
pub mod package;
pub mod populate;
pub mod rows;
pub mod substitute;

pub use document::{Cell, Document, Row, Table};
pub use error::{Error, Result};
pub use populate::{ColumnBinding, Dataset, DynamicTarget};
