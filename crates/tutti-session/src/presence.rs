//! Participants and ephemeral presence state.
//!
//! Presence is best-effort: cursor updates never participate in the
//! version/conflict protocol and must never destabilize a session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A participant's role label. Not enforced by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Owner,
    #[default]
    Editor,
    Viewer,
}

/// A participant in a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Identity key within the session.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role label.
    pub role: ParticipantRole,
    /// First-join timestamp; survives rejoins.
    pub joined_at: u64,
    /// Refreshed on join and on cursor updates.
    pub last_active: u64,
    /// Opaque cursor position blob, owned by the UI layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
}

impl Participant {
    /// Create a participant on first join.
    pub fn new(request: JoinRequest, now: u64) -> Self {
        Self {
            id: request.id,
            name: request.name,
            role: request.role,
            joined_at: now,
            last_active: now,
            cursor: None,
        }
    }

    /// Rejoin: overwrite the mutable fields and refresh activity,
    /// keeping `joined_at` and any cursor.
    pub fn refresh(&mut self, request: JoinRequest, now: u64) {
        self.name = request.name;
        self.role = request.role;
        self.last_active = now;
    }

    /// Update the cursor blob and refresh activity.
    pub fn set_cursor(&mut self, cursor: Value, now: u64) {
        self.cursor = Some(cursor);
        self.last_active = now;
    }
}

/// The caller-supplied identity for joining a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: ParticipantRole,
}

impl JoinRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: ParticipantRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}

/// Current time in milliseconds since the epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
