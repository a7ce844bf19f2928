// Slash-delimited property paths over serde_json::Value.
// - `/a/b/0` walks left to right from the root.
// - A segment of digits (optionally signed) is always an array index, never
//   an object key, however large, so digit-only object keys cannot be
//   addressed.
// - No implicit creation: every intermediate node must already exist.
use serde_json::Value;

use crate::error::{LcpError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub raw: &'a str,
    /// Optional sign followed by ASCII digits.
    pub numeric: bool,
    /// The array position, when `numeric` and it fits in `usize`.
    pub index: Option<usize>,
}

impl<'a> Segment<'a> {
    fn parse(raw: &'a str) -> Self {
        let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
        let numeric = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        Self {
            raw,
            numeric,
            index: if numeric { raw.parse::<usize>().ok() } else { None },
        }
    }
}

pub fn parse_path(path: &str) -> Result<Vec<Segment<'_>>> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| LcpError::InvalidPath(path.to_string()))?;
    Ok(rest.split('/').map(Segment::parse).collect())
}

fn child<'v>(node: &'v Value, seg: &Segment<'_>) -> Option<&'v Value> {
    match (node, seg.numeric) {
        (Value::Array(arr), true) => seg.index.and_then(|i| arr.get(i)),
        (Value::Object(map), false) => map.get(seg.raw),
        _ => None,
    }
}

fn child_mut<'v>(node: &'v mut Value, seg: &Segment<'_>) -> Option<&'v mut Value> {
    match (node, seg.numeric) {
        (Value::Array(arr), true) => seg.index.and_then(|i| arr.get_mut(i)),
        (Value::Object(map), false) => map.get_mut(seg.raw),
        _ => None,
    }
}

fn unresolved(path: &str, seg: &Segment<'_>, depth: usize) -> LcpError {
    LcpError::PathResolution {
        path: path.to_string(),
        segment: seg.raw.to_string(),
        depth,
    }
}

pub fn get<'v>(data: &'v Value, path: &str) -> Result<&'v Value> {
    let mut ptr = data;
    for (i, seg) in parse_path(path)?.iter().enumerate() {
        ptr = child(ptr, seg).ok_or_else(|| unresolved(path, seg, i + 1))?;
    }
    Ok(ptr)
}

pub fn get_mut<'v>(data: &'v mut Value, path: &str) -> Result<&'v mut Value> {
    let mut ptr = data;
    for (i, seg) in parse_path(path)?.iter().enumerate() {
        ptr = child_mut(ptr, seg).ok_or_else(|| unresolved(path, seg, i + 1))?;
    }
    Ok(ptr)
}

/// Writes `value` at `path`.
///
/// The leaf may be a new key of an existing object; array leaves must be in
/// range. Any missing intermediate node fails with `PathResolution`.
pub fn set(data: &mut Value, path: &str, value: Value) -> Result<()> {
    let segs = parse_path(path)?;
    let Some((leaf, parents)) = segs.split_last() else {
        return Err(LcpError::InvalidPath(path.to_string()));
    };
    let mut ptr = data;
    for (i, seg) in parents.iter().enumerate() {
        ptr = child_mut(ptr, seg).ok_or_else(|| unresolved(path, seg, i + 1))?;
    }
    match (ptr, leaf.numeric) {
        (Value::Array(arr), true) => {
            let slot = leaf
                .index
                .and_then(|i| arr.get_mut(i))
                .ok_or_else(|| unresolved(path, leaf, segs.len()))?;
            *slot = value;
        }
        (Value::Object(map), false) => {
            map.insert(leaf.raw.to_string(), value);
        }
        _ => return Err(unresolved(path, leaf, segs.len())),
    }
    Ok(())
}
