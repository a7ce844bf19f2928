//! Fragment insertion into content records.
//!
//! A template map is a JSON array of [`TemplateDescriptor`]s. Each one names
//! a markup fragment under the template directory, the content file it
//! targets, and an operation to run against one string node of that file.
//! Descriptors for the same file run in list order, each on the output of
//! the previous one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::MissPolicy;
use crate::error::{LcpError, Result};
use crate::pointer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOperation {
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub path: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub source: String,
    pub destination: String,
    pub operation: TemplateOperation,
}

impl TemplateDescriptor {
    pub fn replace(
        source: impl Into<String>,
        destination: impl Into<String>,
        path: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            operation: TemplateOperation {
                kind: OperationType::Replace,
                path: path.into(),
                target: target.into(),
            },
        }
    }
}

pub fn load_template_map(path: &Path) -> Result<Vec<TemplateDescriptor>> {
    let raw = fs::read_to_string(path).map_err(|e| LcpError::ContentRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Descriptors whose destination is `filename`, in map order.
pub fn descriptors_for<'a>(
    descriptors: &'a [TemplateDescriptor],
    filename: &str,
) -> Vec<&'a TemplateDescriptor> {
    descriptors
        .iter()
        .filter(|d| d.destination == filename)
        .collect()
}

/// Where fragment markup comes from.
pub trait FragmentSource {
    fn load(&self, source: &str) -> Result<String>;
}

/// Fragments stored as files under a template directory.
#[derive(Debug, Clone)]
pub struct FragmentDir {
    root: PathBuf,
}

impl FragmentDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FragmentSource for FragmentDir {
    fn load(&self, source: &str) -> Result<String> {
        let path = self.root.join(source);
        fs::read_to_string(&path).map_err(|e| LcpError::ContentRead {
            path,
            reason: e.to_string(),
        })
    }
}

impl FragmentSource for HashMap<String, String> {
    fn load(&self, source: &str) -> Result<String> {
        self.get(source).cloned().ok_or_else(|| LcpError::ContentRead {
            path: PathBuf::from(source),
            reason: "fragment not found".to_string(),
        })
    }
}

const PRESERVED_ELEMENTS: [&str; 2] = ["pre", "textarea"];

/// Collapses insignificant whitespace in a markup fragment.
///
/// Whitespace runs become one space. Runs that contain a line break and sit
/// between two tags are dropped. The result is trimmed. Text inside `<pre>`
/// and `<textarea>` is left as is.
pub fn collapse_whitespace(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while !rest.is_empty() {
        match find_preserved(rest) {
            Some((start, end)) => {
                collapse_into(&rest[..start], Some('<'), &mut out);
                out.push_str(&rest[start..end]);
                rest = &rest[end..];
            }
            None => {
                collapse_into(rest, None, &mut out);
                rest = "";
            }
        }
    }
    out.trim().to_string()
}

// Byte range of the first preserved element, opening tag through closing tag.
fn find_preserved(s: &str) -> Option<(usize, usize)> {
    let lower = s.to_ascii_lowercase();
    PRESERVED_ELEMENTS
        .iter()
        .filter_map(|tag| {
            let open = format!("<{}", tag);
            let close = format!("</{}>", tag);
            let mut from = 0;
            while let Some(pos) = lower[from..].find(&open) {
                let start = from + pos;
                let after = lower[start + open.len()..].chars().next();
                if matches!(after, Some('>') | Some('/')) || after.is_some_and(char::is_whitespace) {
                    let end = lower[start..]
                        .find(&close)
                        .map(|p| start + p + close.len())
                        .unwrap_or(s.len());
                    return Some((start, end));
                }
                from = start + open.len();
            }
            None
        })
        .min_by_key(|(start, _)| *start)
}

// `following` is the first character after `s` in the full fragment.
fn collapse_into(s: &str, following: Option<char>, out: &mut String) {
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if !c.is_whitespace() {
            out.push(c);
            continue;
        }
        let mut line_break = c == '\n' || c == '\r';
        while let Some(&next) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            line_break |= next == '\n' || next == '\r';
            chars.next();
        }
        let next = chars.peek().copied().or(following);
        let between_tags = out.ends_with('>') && next == Some('<');
        if !(line_break && between_tags) {
            out.push(' ');
        }
    }
}

/// A replace that found nothing to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMiss {
    pub source: String,
    pub path: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub bytes: Vec<u8>,
    pub misses: Vec<TemplateMiss>,
}

pub struct TemplateInjector<F> {
    fragments: F,
    policy: MissPolicy,
}

impl<F: FragmentSource> TemplateInjector<F> {
    pub fn new(fragments: F, policy: MissPolicy) -> Self {
        Self { fragments, policy }
    }

    /// Runs `descriptors` against the record `raw` named `filename`.
    ///
    /// Every descriptor must target `filename`. The record is re-serialized
    /// compactly after each step that changes it; when no step changes
    /// anything the input comes back byte for byte.
    pub fn apply(
        &self,
        filename: &str,
        raw: &[u8],
        descriptors: &[&TemplateDescriptor],
    ) -> Result<Injection> {
        let mut content = raw.to_vec();
        let mut misses = Vec::new();
        for descriptor in descriptors {
            if descriptor.destination != filename {
                return Err(LcpError::DestinationMismatch {
                    file: filename.to_string(),
                    destination: descriptor.destination.clone(),
                });
            }
            let fragment = collapse_whitespace(&self.fragments.load(&descriptor.source)?);
            let mut record: Value = serde_json::from_slice(&content)?;
            let op = &descriptor.operation;
            match op.kind {
                OperationType::Replace => {
                    let node = pointer::get_mut(&mut record, &op.path)?;
                    let original = node
                        .as_str()
                        .ok_or_else(|| LcpError::NotAString(op.path.clone()))?;
                    let modified = original.replacen(&op.target, &fragment, 1);
                    if modified == original {
                        self.report_miss(filename, descriptor)?;
                        misses.push(TemplateMiss {
                            source: descriptor.source.clone(),
                            path: op.path.clone(),
                            target: op.target.clone(),
                        });
                        // Nothing changed; keep the previous bytes.
                        continue;
                    }
                    debug!(file = filename, path = %op.path, source = %descriptor.source, "inserted fragment");
                    *node = Value::String(modified);
                }
            }
            content = serde_json::to_vec(&record)?;
        }
        Ok(Injection {
            bytes: content,
            misses,
        })
    }

    fn report_miss(&self, filename: &str, descriptor: &TemplateDescriptor) -> Result<()> {
        let op = &descriptor.operation;
        match self.policy {
            MissPolicy::Warn => {
                warn!(
                    file = filename,
                    "replaced {} at {}, but no changes were made", op.target, op.path
                );
                Ok(())
            }
            MissPolicy::Fail => Err(LcpError::UnresolvedTemplate {
                file: filename.to_string(),
                path: op.path.clone(),
                target: op.target.clone(),
            }),
        }
    }
}
