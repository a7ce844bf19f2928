use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::{BuildEnv, lcp_filename};
use crate::error::{LcpError, Result};

/// The (name, version) identity of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentVersion {
    pub name: String,
    pub version: String,
}

impl ContentVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn archive_filename(&self) -> String {
        lcp_filename(&self.name, &self.version)
    }
}

impl fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Applies the CI build counter to a declared version.
///
/// Under CI with a counter, the patch segment is replaced outright:
/// `1.2.3` with counter `42` becomes `1.2.42`. Otherwise the declared
/// version passes through untouched.
pub fn resolve(declared: ContentVersion, env: &BuildEnv) -> Result<ContentVersion> {
    let Some(counter) = env.active_counter() else {
        return Ok(declared);
    };
    if counter.parse::<u64>().is_err() {
        return Err(LcpError::InvalidBuildCounter(counter.to_string()));
    }
    let mut parts = declared.version.split('.');
    let (Some(major), Some(minor)) = (parts.next(), parts.next()) else {
        return Err(LcpError::InvalidVersion(declared.version.clone()));
    };
    if major.is_empty() || minor.is_empty() {
        return Err(LcpError::InvalidVersion(declared.version.clone()));
    }
    let version = format!("{}.{}.{}", major, minor, counter);
    Ok(ContentVersion {
        name: declared.name,
        version,
    })
}

/// Reads `name` and `version` from a package.json-style metadata file.
pub fn read_metadata(path: &Path) -> Result<ContentVersion> {
    let raw = fs::read_to_string(path).map_err(|e| LcpError::ContentRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let meta: serde_json::Value = serde_json::from_str(&raw)?;
    let field = |field: &'static str| {
        meta.get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| LcpError::MissingMetadata {
                path: path.to_path_buf(),
                field,
            })
    };
    Ok(ContentVersion::new(field("name")?, field("version")?))
}

/// Reads the metadata file and resolves the build identity.
pub fn resolve_from_metadata(path: &Path, env: &BuildEnv) -> Result<ContentVersion> {
    let declared = read_metadata(path)?;
    resolve(declared, env)
}
