//! Unpacking the JSON entries of a content pack back into a source tree.
//!
//! Only `*.json` entries come back out; assets and directory entries stay
//! in the archive. Fragments inserted at build time are not removed.

use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{LcpError, Result};

/// Pretty-prints a record the way extracted files are written: two-space
/// indentation and a trailing newline.
pub fn format_record(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// Writes every JSON entry of `reader` under `target_dir`, overwriting
/// existing files. Returns the relative names written, in archive order.
pub fn extract<R: Read + Seek>(reader: R, target_dir: &Path) -> Result<Vec<String>> {
    let mut zip = zip::ZipArchive::new(reader)?;
    let mut written = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.ends_with(".json") {
            debug!(entry = %name, "not extracting");
            continue;
        }
        let rel: PathBuf = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| LcpError::UnsafeEntry(name.clone()))?;
        let mut raw = String::new();
        entry
            .read_to_string(&mut raw)
            .map_err(|e| LcpError::in_file(&name, e.into()))?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| LcpError::in_file(&name, e.into()))?;
        let dest = target_dir.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, format_record(&value)?)?;
        debug!(entry = %name, "extracted");
        written.push(name);
    }
    Ok(written)
}

/// Opens the archive at `archive_path` and extracts it into `target_dir`.
pub fn extract_file(archive_path: &Path, target_dir: &Path) -> Result<Vec<String>> {
    let content_read = |reason: String| LcpError::ContentRead {
        path: archive_path.to_path_buf(),
        reason,
    };
    let meta = fs::metadata(archive_path)
        .map_err(|e| content_read(format!("can't stat archive: {}", e)))?;
    if !meta.is_file() {
        return Err(content_read("not a file".to_string()));
    }
    info!(archive = %archive_path.display(), "loading LCP into source directory");
    let file = fs::File::open(archive_path).map_err(|e| content_read(e.to_string()))?;
    let written = match extract(file, target_dir) {
        Err(LcpError::Zip(e)) => return Err(content_read(e.to_string())),
        other => other?,
    };
    info!(count = written.len(), "decompressed LCP");
    Ok(written)
}
