//! DOCX ZIP container handling.
//!
//! A `.docx` file is an OPC ZIP archive. We read every entry into memory up
//! front, hand out `word/document.xml` (and the relationships part) for
//! mutation, and rewrite the whole archive on save with untouched entries
//! copied verbatim.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const RELS_PART: &str = "word/_rels/document.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// In-memory copy of a DOCX archive.
#[derive(Debug)]
pub struct Package {
    entries: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Read all archive entries. Fails with [`Error::Load`] when the file is
    /// not a ZIP archive or carries no `word/document.xml`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| Error::Load {
            path: path.to_path_buf(),
            reason: format!("not a DOCX archive: {e}"),
        })?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            entries.push((entry.name().to_string(), buf));
        }

        let pkg = Self { entries };
        if pkg.part(DOCUMENT_PART).is_none() {
            return Err(Error::Load {
                path: path.to_path_buf(),
                reason: format!("archive has no {DOCUMENT_PART} part"),
            });
        }
        debug!("loaded {} archive entries from {:?}", pkg.entries.len(), path);
        Ok(pkg)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn part_str(&self, name: &str) -> Option<String> {
        self.part(name)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }

    /// Replace a part's bytes, appending the entry if it does not exist yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == name) {
            slot.1 = data;
        } else {
            self.entries.push((name.to_string(), data));
        }
    }

    /// Number of entries under `word/media/`.
    pub fn media_part_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(n, _)| n.starts_with("word/media/"))
            .count()
    }

    /// Rewrite the archive at `path`. Any existing file there is removed
    /// first so reruns are idempotent.
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.exists() {
            debug!("removing existing output file {:?}", path);
            std::fs::remove_file(path)?;
        }
        let file = File::create(path)?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            writer.start_file(name.clone(), options)?;
            writer.write_all(data)?;
        }
        writer.finish()?;
        info!("wrote {} archive entries to {:?}", self.entries.len(), path);
        Ok(())
    }
}
