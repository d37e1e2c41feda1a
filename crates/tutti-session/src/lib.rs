//! # tutti-session
//!
//! Session & conflict-resolution engine for collaborative composition
//! editing.
//!
//! The engine accepts path-addressed operations against versioned
//! documents, decides whether each is safe to apply or clashes with
//! another participant's recent edit, applies safe operations atomically,
//! and lets callers resolve detected conflicts with a strategy
//! (merge/overwrite/manual). It detects conflicts; it does not auto-merge.
//!
//! # Quick Start
//!
//! ```rust
//! use tutti_session::{CollabEngine, JoinRequest, ParticipantRole};
//! use tutti_score::{OperationInput, ScoreDocument};
//! use serde_json::json;
//!
//! let engine = CollabEngine::new();
//! let doc = ScoreDocument::new("composition", json!({ "name": "Sketch", "tempo": 96 }));
//! let session = engine.create_session("evening-jam", doc);
//!
//! engine
//!     .join_session(&session.id, JoinRequest::new("u1", "Ada", ParticipantRole::Owner))
//!     .unwrap();
//!
//! let outcome = engine
//!     .apply_operation(&session.id, OperationInput::update("tempo", json!(120), "u1", 1))
//!     .unwrap();
//! assert!(outcome.is_applied());
//! ```
//!
//! # Architecture
//!
//! - [`engine`] - session registry, operation applier, conflict resolver
//! - [`detect`] - conflict classification with the same-author grace window
//! - [`conflict`] - conflict records and resolution strategies
//! - [`session`] - sessions and their read snapshots
//! - [`presence`] - participants and ephemeral cursor state
//! - [`events`] - synchronous event bus with an async broadcast tap
//! - [`error`] - fatal contract errors

pub mod conflict;
pub mod detect;
pub mod engine;
pub mod error;
pub mod events;
pub mod presence;
pub mod session;

// Re-exports for convenience
pub use conflict::{Conflict, ConflictId, ConflictKind, ConflictResolution, ResolutionStrategy};
pub use detect::{ConflictDetector, Detection, DEFAULT_GRACE_WINDOW_MS};
pub use engine::{ApplyOutcome, CollabEngine, EngineConfig, EngineConfigBuilder};
pub use error::{Result, SessionError};
pub use events::{EngineEvent, EventBus, HandlerId};
pub use presence::{JoinRequest, Participant, ParticipantRole};
pub use session::{Session, SessionId, SessionSnapshot};

// Re-export commonly used types from tutti-score
pub use tutti_score::{
    ContentPath, DocumentId, Operation, OperationId, OperationInput, OperationKind, PathSegment,
    ScoreDocument,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::conflict::{ConflictKind, ConflictResolution, ResolutionStrategy};
    pub use crate::engine::{ApplyOutcome, CollabEngine, EngineConfig};
    pub use crate::error::SessionError;
    pub use crate::events::EngineEvent;
    pub use crate::presence::{JoinRequest, ParticipantRole};
    pub use crate::session::SessionId;
    pub use tutti_score::{ContentPath, OperationInput, ScoreDocument};
}
