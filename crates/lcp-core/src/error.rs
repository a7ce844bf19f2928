use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = LcpError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum LcpError {
    // Structural: the source tree or template map is malformed.
    #[error("no source files found")]
    EmptySource,

    #[error("missing required file: {0}")]
    MissingManifest(&'static str),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("filename/destination mismatch between descriptor and file: {file} and {destination}")]
    DestinationMismatch { file: String, destination: String },

    // Addressing.
    #[error("invalid property path {0:?}: must start with '/'")]
    InvalidPath(String),

    #[error("failed to resolve property path {path} at segment {segment:?} (depth {depth})")]
    PathResolution {
        path: String,
        segment: String,
        depth: usize,
    },

    #[error("value at {0} is not a string")]
    NotAString(String),

    #[error("replace of {target:?} at {path} in {file} made no changes")]
    UnresolvedTemplate {
        file: String,
        path: String,
        target: String,
    },

    // Version identity.
    #[error("invalid version {0:?}: expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("invalid build counter {0:?}: expected a non-negative integer")]
    InvalidBuildCounter(String),

    #[error("project metadata {path} is missing field {field:?}")]
    MissingMetadata { path: PathBuf, field: &'static str },

    // Reading inputs.
    #[error("can't read {path}: {reason}")]
    ContentRead { path: PathBuf, reason: String },

    #[error("archive entry {0:?} escapes the target directory")]
    UnsafeEntry(String),

    // Schema validation.
    #[error("failed to load schema definitions from {path}: {reason}")]
    SchemaLoad { path: PathBuf, reason: String },

    #[error("no schema definition for {0}")]
    MissingSchema(String),

    #[error("failed validation checks: {0} file(s) invalid")]
    ValidationFailed(usize),

    #[error("{file}: {source}")]
    InFile {
        file: String,
        #[source]
        source: Box<LcpError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl LcpError {
    /// Attributes an error to the file being processed.
    pub fn in_file(file: impl Into<String>, source: LcpError) -> Self {
        LcpError::InFile {
            file: file.into(),
            source: Box::new(source),
        }
    }
}
