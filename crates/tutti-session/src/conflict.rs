//! Conflict records and resolution strategies.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;
use tutti_score::{ContentPath, Operation};
use ulid::Ulid;

/// Unique identifier for a conflict.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictId(pub String);

impl ConflictId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConflictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an incoming operation clashed with document history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Divergent authors edited the same path.
    ConcurrentEdit,
    /// The operation is stale against an otherwise untouched path.
    VersionConflict,
}

/// A detected conflict, pending resolution.
///
/// Exists only between detection and resolution; resolving removes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: ConflictId,
    pub kind: ConflictKind,
    pub session_id: SessionId,
    pub path: ContentPath,
    /// Ids of the participants whose edits clashed.
    pub participants: BTreeSet<String>,
    /// The operations that clashed, the rejected candidate last.
    pub involved_operations: Vec<Operation>,
    pub detected_at: u64,
}

impl Conflict {
    pub fn new(
        kind: ConflictKind,
        session_id: SessionId,
        path: ContentPath,
        participants: BTreeSet<String>,
        involved_operations: Vec<Operation>,
        detected_at: u64,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            kind,
            session_id,
            path,
            participants,
            involved_operations,
            detected_at,
        }
    }
}

/// How to resolve a pending conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Shallow-assign the resolved data's top-level keys into the content.
    Merge,
    /// Replace the content wholesale.
    Overwrite,
    /// Same mechanics as merge; records the resolver's reasoning.
    Manual,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::Merge => "merge",
            ResolutionStrategy::Overwrite => "overwrite",
            ResolutionStrategy::Manual => "manual",
        }
    }

    /// Apply the strategy's mutation to the content tree.
    pub fn apply(&self, content: &mut Value, resolved_data: &Value) {
        match self {
            ResolutionStrategy::Merge | ResolutionStrategy::Manual => {
                if let (Value::Object(target), Value::Object(entries)) = (content, resolved_data) {
                    for (key, value) in entries {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
            ResolutionStrategy::Overwrite => {
                *content = resolved_data.clone();
            }
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(ResolutionStrategy::Merge),
            "overwrite" => Ok(ResolutionStrategy::Overwrite),
            "manual" => Ok(ResolutionStrategy::Manual),
            other => Err(other.to_string()),
        }
    }
}

/// A caller's resolution of a pending conflict, as it arrives on the wire.
///
/// The strategy stays a string here so an unrecognized value reaches the
/// resolver and fails there, loudly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub strategy: String,
    pub resolved_data: Value,
    pub resolved_by: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ConflictResolution {
    pub fn new(
        strategy: ResolutionStrategy,
        resolved_data: Value,
        resolved_by: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            strategy: strategy.as_str().to_string(),
            resolved_data,
            resolved_by: resolved_by.into(),
            timestamp,
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}
