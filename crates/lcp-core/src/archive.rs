use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{LcpError, Result};

/// One file of the flat source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Reads the top level of `dir`, sorted by file name.
///
/// Subdirectories are not part of a flat source tree and are skipped.
pub fn read_source_dir(dir: &Path) -> Result<Vec<SourceFile>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| LcpError::ContentRead {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| LcpError::ContentRead {
                path: entry.path().to_path_buf(),
                reason: "file name is not valid UTF-8".to_string(),
            })?
            .to_string();
        if !entry.file_type().is_file() {
            warn!(entry = %name, "skipping non-file entry in source directory");
            continue;
        }
        let bytes = fs::read(entry.path()).map_err(|e| LcpError::ContentRead {
            path: entry.path().to_path_buf(),
            reason: e.to_string(),
        })?;
        out.push(SourceFile { name, bytes });
    }
    Ok(out)
}

/// Ordered, named entries of a content pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<SourceFile>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.push(SourceFile::new(name, bytes));
    }

    pub fn entries(&self) -> &[SourceFile] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.bytes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the entries as a deflated zip. Timestamps are fixed so equal
    /// archives serialize to equal bytes.
    pub fn write_zip<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);
        for entry in &self.entries {
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.bytes)?;
        }
        Ok(zip.finish()?)
    }

    /// Writes the archive to `dest` via a sibling `.partial` file, so `dest`
    /// only ever holds a complete archive.
    pub fn write_to_path(&self, dest: &Path) -> Result<PathBuf> {
        let mut partial = dest.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let file = fs::File::create(&partial)?;
        let result = self.write_zip(file).and_then(|mut f| Ok(f.flush()?));
        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, dest)?;
        Ok(dest.to_path_buf())
    }
}
