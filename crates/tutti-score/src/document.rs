//! Versioned composition documents.
//!
//! A `ScoreDocument` pairs an untyped content tree with a version counter
//! and an append-only log of the operations that produced it. The version
//! moves by exactly one per applied operation or conflict resolution, and
//! the log holds only operations that actually mutated the content.

use crate::operation::Operation;
use crate::path::ContentPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Unique identifier for a document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A versioned document with an applied-operation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDocument {
    /// Document ID.
    pub id: DocumentId,
    /// Domain label for the content (e.g. "composition"); opaque to the engine.
    pub document_type: String,
    /// The content tree. Navigated by path, never interpreted.
    pub content: Value,
    /// Current version, starting at 1.
    pub version: u64,
    /// Operations that mutated this document, in application order.
    pub applied_operations: Vec<Operation>,
}

impl ScoreDocument {
    /// Create a new document at version 1.
    pub fn new(document_type: impl Into<String>, content: Value) -> Self {
        Self {
            id: DocumentId::new(),
            document_type: document_type.into(),
            content,
            version: 1,
            applied_operations: Vec::new(),
        }
    }

    /// Create a document with a caller-chosen id.
    pub fn with_id(id: DocumentId, document_type: impl Into<String>, content: Value) -> Self {
        Self {
            id,
            document_type: document_type.into(),
            content,
            version: 1,
            applied_operations: Vec::new(),
        }
    }

    /// The most recent applied operation addressing exactly `path`.
    pub fn last_operation_on(&self, path: &ContentPath) -> Option<&Operation> {
        self.applied_operations.iter().rev().find(|op| op.path == *path)
    }

    /// Record a successfully applied operation: bump the version and append
    /// to the log in one step so the invariant cannot be split.
    pub fn record_operation(&mut self, operation: Operation) {
        self.version += 1;
        self.applied_operations.push(operation);
    }

    /// Record a conflict resolution. Resolutions mutate content without an
    /// operation record; only the version moves.
    pub fn record_resolution(&mut self) {
        self.version += 1;
    }
}
