//! Path-addressed mutation operations.

use crate::path::ContentPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Unique identifier for an operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of mutation an operation performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Set the value at the path.
    Update,
    /// Insert into an array at the path's final index, shifting right.
    Insert,
    /// Remove the value at the path.
    Delete,
}

/// An operation as submitted by a participant, before it is applied.
///
/// The applier assigns the id and timestamp and captures the previous value;
/// callers only state intent against the version of the document they saw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInput {
    pub kind: OperationKind,
    pub path: ContentPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub author_id: String,
    pub base_version: u64,
}

impl OperationInput {
    /// An update (set) of the value at `path`.
    pub fn update(
        path: impl Into<ContentPath>,
        value: Value,
        author_id: impl Into<String>,
        base_version: u64,
    ) -> Self {
        Self {
            kind: OperationKind::Update,
            path: path.into(),
            value: Some(value),
            author_id: author_id.into(),
            base_version,
        }
    }

    /// An insertion into the array addressed by `path`'s final index.
    pub fn insert(
        path: impl Into<ContentPath>,
        value: Value,
        author_id: impl Into<String>,
        base_version: u64,
    ) -> Self {
        Self {
            kind: OperationKind::Insert,
            path: path.into(),
            value: Some(value),
            author_id: author_id.into(),
            base_version,
        }
    }

    /// A deletion of the value at `path`.
    pub fn delete(
        path: impl Into<ContentPath>,
        author_id: impl Into<String>,
        base_version: u64,
    ) -> Self {
        Self {
            kind: OperationKind::Delete,
            path: path.into(),
            value: None,
            author_id: author_id.into(),
            base_version,
        }
    }

    /// Finalize into an applied-operation record.
    pub fn finalize(self, applied_at: u64) -> Operation {
        Operation {
            id: OperationId::new(),
            kind: self.kind,
            path: self.path,
            value: self.value,
            previous_value: None,
            author_id: self.author_id,
            base_version: self.base_version,
            applied_at,
        }
    }
}

/// A finalized operation as it appears in a document's applied-operation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub path: ContentPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<Value>,
    pub author_id: String,
    pub base_version: u64,
    pub applied_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finalize_assigns_identity() {
        let input = OperationInput::update("tempo", json!(120), "u1", 1);
        let op = input.finalize(1_000);
        assert!(!op.id.0.is_empty());
        assert_eq!(op.applied_at, 1_000);
        assert_eq!(op.base_version, 1);
        assert_eq!(op.previous_value, None);
    }

    #[test]
    fn test_delete_has_no_value() {
        let input = OperationInput::delete("tracks.0", "u2", 3);
        assert_eq!(input.kind, OperationKind::Delete);
        assert_eq!(input.value, None);
    }

    #[test]
    fn test_wire_shape() {
        let op = OperationInput::update("tracks.0.name", json!("Lead"), "u1", 2).finalize(42);
        let wire = serde_json::to_value(&op).unwrap();
        assert_eq!(wire["kind"], "update");
        assert_eq!(wire["path"], "tracks.0.name");
        assert_eq!(wire["authorId"], "u1");
        assert_eq!(wire["baseVersion"], 2);
        assert_eq!(wire["appliedAt"], 42);
        assert!(wire.get("previousValue").is_none());
    }
}
