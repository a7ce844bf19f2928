//! Checking source records against their JSON Schemas.
//!
//! The content file `X.json` is validated by the schema file
//! `X.schema.json`. The manifest and `tables.json` have no schema and are
//! skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::archive::SourceFile;
use crate::config::MANIFEST_FILENAME;
use crate::error::{LcpError, Result};

pub const SKIP_LIST: [&str; 2] = [MANIFEST_FILENAME, "tables.json"];

/// One schema violation inside a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub instance_path: String,
    pub message: String,
}

pub trait SchemaValidator {
    /// `None` when no schema is registered for `file`.
    fn validate(&self, file: &str, record: &Value) -> Option<Vec<Violation>>;
}

/// Validators compiled with the `jsonschema` crate, keyed by content file
/// name.
pub struct JsonSchemaValidator {
    validators: BTreeMap<String, jsonschema::Validator>,
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    /// Registers `schema` for the content file derived from `schema_file`.
    pub fn add_schema(&mut self, schema_file: &str, schema: &Value) -> Result<()> {
        let validator = jsonschema::validator_for(schema).map_err(|e| LcpError::SchemaLoad {
            path: schema_file.into(),
            reason: e.to_string(),
        })?;
        self.validators
            .insert(content_name_for_schema(schema_file), validator);
        Ok(())
    }

    /// Compiles every `*.json` in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let schema_load = |reason: String| LcpError::SchemaLoad {
            path: dir.to_path_buf(),
            reason,
        };
        if !dir.is_dir() {
            return Err(schema_load("not a directory".to_string()));
        }
        let mut names = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| schema_load(e.to_string()))?;
            let name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| schema_load("schema file name is not valid UTF-8".to_string()))?;
            if entry.file_type().is_file() && name.ends_with(".json") {
                names.push(name.to_string());
            }
        }

        let mut out = Self::new();
        for name in names {
            info!(schema = %name, "loading schema definition");
            let raw = fs::read_to_string(dir.join(&name)).map_err(|e| schema_load(e.to_string()))?;
            let schema: Value = serde_json::from_str(&raw)
                .map_err(|e| schema_load(format!("{}: {}", name, e)))?;
            out.add_schema(&name, &schema)?;
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, file: &str, record: &Value) -> Option<Vec<Violation>> {
        let validator = self.validators.get(file)?;
        Some(
            validator
                .iter_errors(record)
                .map(|e| Violation {
                    instance_path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect(),
        )
    }
}

/// `cards.schema.json` validates `cards.json`.
pub fn content_name_for_schema(schema_file: &str) -> String {
    schema_file.replacen(".schema", "", 1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub valid: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<(String, Vec<Violation>)>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validates the JSON files among `sources`.
///
/// A file without a schema aborts immediately. Violations are collected for
/// every file and returned in the report.
pub fn verify_sources<V: SchemaValidator>(
    sources: &[SourceFile],
    validator: &V,
) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    for file in sources.iter().filter(|f| f.name.ends_with(".json")) {
        if SKIP_LIST.contains(&file.name.as_str()) {
            info!(file = %file.name, "marked as ignore, skipping");
            report.skipped.push(file.name.clone());
            continue;
        }
        let record: Value = serde_json::from_slice(&file.bytes)
            .map_err(|e| LcpError::in_file(&file.name, e.into()))?;
        match validator.validate(&file.name, &record) {
            None => return Err(LcpError::MissingSchema(file.name.clone())),
            Some(violations) if violations.is_empty() => {
                info!(file = %file.name, "valid");
                report.valid.push(file.name.clone());
            }
            Some(violations) => report.failures.push((file.name.clone(), violations)),
        }
    }
    Ok(report)
}

/// Logs every failure and converts a failing report into an error.
pub fn into_result(report: VerifyReport) -> Result<VerifyReport> {
    if report.is_ok() {
        return Ok(report);
    }
    for (file, violations) in &report.failures {
        error!(file = %file, errors = violations.len(), "failed validation");
        for v in violations {
            error!(file = %file, at = %v.instance_path, "{}", v.message);
        }
    }
    Err(LcpError::ValidationFailed(report.failures.len()))
}

/// Loads schemas from `schema_dir` and verifies the project's source tree.
pub fn verify_dir(source_dir: &Path, schema_dir: &Path) -> Result<VerifyReport> {
    info!("verifying content against schema definitions");
    let validator = JsonSchemaValidator::load_dir(schema_dir)?;
    let sources = crate::archive::read_source_dir(source_dir)?;
    into_result(verify_sources(&sources, &validator)?)
}
