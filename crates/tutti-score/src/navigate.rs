//! Path navigation over a document's content tree.
//!
//! The tree is an untyped `serde_json::Value`; the engine never interprets
//! its domain meaning. All mutating entry points enforce one rule: every
//! intermediate segment must already resolve to an existing container, and
//! only the final segment may name something new.

use crate::error::{Result, ScoreError};
use crate::path::{ContentPath, PathSegment};
use serde_json::Value;

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Get a reference to the value at a path. `None` if any segment is missing.
pub fn get<'a>(root: &'a Value, path: &ContentPath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Walk the intermediate segments, requiring each to resolve to an existing
/// container. Returns the parent the final segment addresses.
fn descend<'a>(
    root: &'a mut Value,
    intermediates: &[PathSegment],
    full_path: &ContentPath,
) -> Result<&'a mut Value> {
    let mut current = root;
    for segment in intermediates {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .get_mut(key)
                .ok_or_else(|| ScoreError::PathNotFound(full_path.to_string()))?,
            (PathSegment::Index(idx), Value::Array(items)) => items
                .get_mut(*idx)
                .ok_or_else(|| ScoreError::PathNotFound(full_path.to_string()))?,
            _ => return Err(ScoreError::PathNotFound(full_path.to_string())),
        };
    }
    Ok(current)
}

/// Set the value at a path, returning the previous value if the leaf existed.
///
/// The final segment may name a new object field, or an array slot at
/// `index == len` (append). Replacing an existing array slot is allowed.
pub fn set(root: &mut Value, path: &ContentPath, value: Value) -> Result<Option<Value>> {
    let (intermediates, last) = path
        .split_last()
        .ok_or_else(|| ScoreError::InvalidPath("cannot set the document root".to_string()))?;
    let parent = descend(root, intermediates, path)?;

    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => Ok(map.insert(key.clone(), value)),
        (PathSegment::Index(idx), Value::Array(items)) => {
            if *idx < items.len() {
                Ok(Some(std::mem::replace(&mut items[*idx], value)))
            } else if *idx == items.len() {
                items.push(value);
                Ok(None)
            } else {
                Err(ScoreError::IndexOutOfBounds {
                    index: *idx,
                    length: items.len(),
                })
            }
        }
        (PathSegment::Key(_), other) => Err(ScoreError::TypeMismatch {
            path: path.to_string(),
            expected: "object",
            found: kind_name(other),
        }),
        (PathSegment::Index(_), other) => Err(ScoreError::TypeMismatch {
            path: path.to_string(),
            expected: "array",
            found: kind_name(other),
        }),
    }
}

/// Insert a value into an existing array, shifting subsequent elements right.
///
/// The final segment must be an index with `index <= len`.
pub fn insert_at(root: &mut Value, path: &ContentPath, value: Value) -> Result<()> {
    let (intermediates, last) = path
        .split_last()
        .ok_or_else(|| ScoreError::InvalidPath("cannot insert at the document root".to_string()))?;
    let idx = match last {
        PathSegment::Index(idx) => *idx,
        PathSegment::Key(_) => {
            return Err(ScoreError::InvalidPath(format!(
                "insert path must end in an array index: {}",
                path
            )))
        }
    };
    let parent = descend(root, intermediates, path)?;

    match parent {
        Value::Array(items) => {
            if idx > items.len() {
                return Err(ScoreError::IndexOutOfBounds {
                    index: idx,
                    length: items.len(),
                });
            }
            items.insert(idx, value);
            Ok(())
        }
        other => Err(ScoreError::TypeMismatch {
            path: path.to_string(),
            expected: "array",
            found: kind_name(other),
        }),
    }
}

/// Remove and return the value at a path. Arrays shift left.
pub fn remove_at(root: &mut Value, path: &ContentPath) -> Result<Value> {
    let (intermediates, last) = path
        .split_last()
        .ok_or_else(|| ScoreError::InvalidPath("cannot remove the document root".to_string()))?;
    let parent = descend(root, intermediates, path)?;

    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => map
            .remove(key)
            .ok_or_else(|| ScoreError::PathNotFound(path.to_string())),
        (PathSegment::Index(idx), Value::Array(items)) => {
            if *idx < items.len() {
                Ok(items.remove(*idx))
            } else {
                Err(ScoreError::IndexOutOfBounds {
                    index: *idx,
                    length: items.len(),
                })
            }
        }
        (PathSegment::Key(_), other) => Err(ScoreError::TypeMismatch {
            path: path.to_string(),
            expected: "object",
            found: kind_name(other),
        }),
        (PathSegment::Index(_), other) => Err(ScoreError::TypeMismatch {
            path: path.to_string(),
            expected: "array",
            found: kind_name(other),
        }),
    }
}
