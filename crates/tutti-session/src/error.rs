//! Error types for the session engine.

use std::fmt;

/// Fatal errors for calls that violate the engine's contract.
///
/// Conflicts and unresolvable paths are not errors; they surface as
/// structured outcomes of `apply_operation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session with the given id.
    SessionNotFound(String),
    /// No pending conflict with the given id.
    ConflictNotFound(String),
    /// Resolution strategy string is not one of merge/overwrite/manual.
    UnknownStrategy(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            SessionError::ConflictNotFound(id) => write!(f, "Conflict {} not found", id),
            SessionError::UnknownStrategy(s) => write!(f, "Unknown resolution strategy: {}", s),
        }
    }
}

impl std::error::Error for SessionError {}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SessionError>;
