//! Collaborative sessions.
//!
//! A session exclusively owns its document; the document is mutated only
//! through the engine's applier and resolver.

use crate::presence::Participant;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tutti_score::ScoreDocument;
use ulid::Ulid;

/// Unique identifier for a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A collaborative editing session.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub document: ScoreDocument,
    /// Participants keyed by id.
    pub participants: HashMap<String, Participant>,
    pub created_at: u64,
    /// Refreshed whenever the document is mutated.
    pub last_modified: u64,
}

impl Session {
    pub fn new(name: impl Into<String>, document: ScoreDocument, now: u64) -> Self {
        Self {
            id: SessionId::new(),
            name: name.into(),
            document,
            participants: HashMap::new(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self, now: u64) {
        self.last_modified = now;
    }

    /// Cloned-out read shape for UI/transport layers.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut participants: Vec<Participant> = self.participants.values().cloned().collect();
        participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));

        SessionSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            document: self.document.clone(),
            participants,
            created_at: self.created_at,
            last_modified: self.last_modified,
        }
    }
}

/// Read-only view of a session handed to UI/transport layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub name: String,
    pub document: ScoreDocument,
    pub participants: Vec<Participant>,
    pub created_at: u64,
    pub last_modified: u64,
}
