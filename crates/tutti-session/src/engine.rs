//! The collaboration engine: session registry, operation applier,
//! conflict resolver, and presence updates.
//!
//! One engine instance owns every session and all pending conflicts.
//! Each session sits behind its own lock, so conflict detection, mutation,
//! version increment, and log append are observed atomically per session
//! while unrelated sessions proceed in parallel.

use crate::conflict::{Conflict, ConflictId, ConflictResolution, ResolutionStrategy};
use crate::detect::{ConflictDetector, Detection, DEFAULT_GRACE_WINDOW_MS};
use crate::error::SessionError;
use crate::events::{EngineEvent, EventBus};
use crate::presence::{now_millis, JoinRequest, Participant};
use crate::session::{Session, SessionId, SessionSnapshot};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use tutti_score::{navigate, Operation, OperationInput, OperationKind, ScoreDocument};

/// Configuration for the collaboration engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Grace window for same-author stale-version edits (milliseconds).
    pub grace_window_ms: u64,
    /// Capacity of the async event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_window_ms: DEFAULT_GRACE_WINDOW_MS,
            event_channel_capacity: 100,
        }
    }
}

/// Builder for engine configuration.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn grace_window_ms(mut self, ms: u64) -> Self {
        self.config.grace_window_ms = ms;
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The terminal outcome of an `apply_operation` call.
///
/// The three cases are mutually exclusive: a call conflicts, is rejected on
/// a path error, or applies. There is no partial application.
#[derive(Clone, Debug, PartialEq)]
pub enum ApplyOutcome {
    /// The operation mutated the document and was appended to its log.
    Applied { operation: Operation },
    /// The operation clashed with recent history; the document is untouched
    /// and the conflicts are pending resolution.
    Conflicted { conflicts: Vec<Conflict> },
    /// The path could not be resolved; the document is untouched.
    Rejected { warnings: Vec<String> },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

/// The session & conflict-resolution engine.
///
/// # Example
///
/// ```rust
/// use tutti_session::{CollabEngine, JoinRequest, ParticipantRole};
/// use tutti_score::{OperationInput, ScoreDocument};
/// use serde_json::json;
///
/// let engine = CollabEngine::new();
/// let doc = ScoreDocument::new("composition", json!({ "name": "Sketch" }));
/// let session = engine.create_session("jam", doc);
///
/// engine
///     .join_session(&session.id, JoinRequest::new("u1", "Ada", ParticipantRole::Owner))
///     .unwrap();
///
/// let outcome = engine
///     .apply_operation(&session.id, OperationInput::update("name", json!("Opus 1"), "u1", 1))
///     .unwrap();
/// assert!(outcome.is_applied());
/// ```
pub struct CollabEngine {
    detector: ConflictDetector,
    sessions: RwLock<HashMap<SessionId, Arc<RwLock<Session>>>>,
    pending_conflicts: RwLock<HashMap<ConflictId, Conflict>>,
    events: EventBus,
}

impl CollabEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            detector: ConflictDetector::new(config.grace_window_ms),
            sessions: RwLock::new(HashMap::new()),
            pending_conflicts: RwLock::new(HashMap::new()),
            events: EventBus::new(config.event_channel_capacity),
        }
    }

    /// The event bus: `on`/`off` for synchronous handlers, `subscribe` for
    /// the async broadcast tap.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // === Session Registry ===

    /// Create a session owning `document`.
    pub fn create_session(
        &self,
        name: impl Into<String>,
        document: ScoreDocument,
    ) -> SessionSnapshot {
        let session = Session::new(name, document, now_millis());
        let snapshot = session.snapshot();
        info!(session_id = %session.id, name = %session.name, "created session");

        self.sessions
            .write()
            .insert(session.id.clone(), Arc::new(RwLock::new(session)));

        self.events.emit(EngineEvent::SessionCreated {
            session: snapshot.clone(),
        });
        snapshot
    }

    /// Join (or rejoin) a session. Rejoining with a known participant id
    /// overwrites name/role and refreshes activity without resetting
    /// `joined_at`.
    pub fn join_session(
        &self,
        session_id: &SessionId,
        request: JoinRequest,
    ) -> Result<Participant, SessionError> {
        let handle = self.session_handle(session_id)?;
        let now = now_millis();

        let participant = {
            let mut session = handle.write();
            match session.participants.get_mut(&request.id) {
                Some(existing) => {
                    existing.refresh(request, now);
                    existing.clone()
                }
                None => {
                    let participant = Participant::new(request, now);
                    session
                        .participants
                        .insert(participant.id.clone(), participant.clone());
                    participant
                }
            }
        };

        debug!(session_id = %session_id, participant_id = %participant.id, "participant joined");
        self.events.emit(EngineEvent::ParticipantJoined {
            session_id: session_id.clone(),
            participant: participant.clone(),
        });
        Ok(participant)
    }

    /// Remove a participant. A missing participant is a no-op.
    pub fn leave_session(
        &self,
        session_id: &SessionId,
        participant_id: &str,
    ) -> Result<(), SessionError> {
        let handle = self.session_handle(session_id)?;
        let removed = handle.write().participants.remove(participant_id).is_some();

        if removed {
            self.events.emit(EngineEvent::ParticipantLeft {
                session_id: session_id.clone(),
                participant_id: participant_id.to_string(),
            });
        }
        Ok(())
    }

    /// Update a participant's cursor blob. Presence is ephemeral: a missing
    /// session or participant returns silently.
    pub fn update_cursor(&self, session_id: &SessionId, participant_id: &str, cursor: Value) {
        let Some(handle) = self.sessions.read().get(session_id).cloned() else {
            return;
        };
        let mut session = handle.write();
        if let Some(participant) = session.participants.get_mut(participant_id) {
            participant.set_cursor(cursor, now_millis());
        }
    }

    /// Snapshot a session, if it exists.
    pub fn get_session(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        let handle = self.sessions.read().get(session_id).cloned()?;
        let snapshot = handle.read().snapshot();
        Some(snapshot)
    }

    /// Snapshot every session, oldest first.
    pub fn active_sessions(&self) -> Vec<SessionSnapshot> {
        let handles: Vec<_> = self.sessions.read().values().cloned().collect();
        let mut snapshots: Vec<SessionSnapshot> =
            handles.iter().map(|handle| handle.read().snapshot()).collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }

    /// Pending conflicts for a session, in detection order.
    pub fn session_conflicts(&self, session_id: &SessionId) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self
            .pending_conflicts
            .read()
            .values()
            .filter(|conflict| conflict.session_id == *session_id)
            .cloned()
            .collect();
        conflicts.sort_by(|a, b| a.detected_at.cmp(&b.detected_at).then_with(|| a.id.cmp(&b.id)));
        conflicts
    }

    /// Drop a session and any conflicts still pending against it.
    /// Returns false if the session did not exist.
    pub fn close_session(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(session_id).is_some();
        if removed {
            self.pending_conflicts
                .write()
                .retain(|_, conflict| conflict.session_id != *session_id);
            info!(session_id = %session_id, "closed session");
        }
        removed
    }

    // === Operation Applier ===

    /// Submit an operation against a session's document.
    ///
    /// Exactly one of three terminal outcomes: conflicted (stored pending,
    /// document untouched), rejected (path error, document untouched), or
    /// applied (mutation + version bump + log append, atomically).
    pub fn apply_operation(
        &self,
        session_id: &SessionId,
        input: OperationInput,
    ) -> Result<ApplyOutcome, SessionError> {
        let handle = self.session_handle(session_id)?;
        let now = now_millis();
        let mut operation = input.finalize(now);

        let (outcome, event) = {
            let mut session = handle.write();

            match self.detector.assess(&session.document, &operation) {
                Detection::Conflict {
                    kind,
                    participants,
                    involved_operations,
                } => {
                    let conflict = Conflict::new(
                        kind,
                        session_id.clone(),
                        operation.path.clone(),
                        participants,
                        involved_operations,
                        now,
                    );
                    self.pending_conflicts
                        .write()
                        .insert(conflict.id.clone(), conflict.clone());
                    debug!(
                        session_id = %session_id,
                        conflict_id = %conflict.id,
                        kind = ?conflict.kind,
                        path = %conflict.path,
                        "operation conflicted"
                    );
                    let event = EngineEvent::ConflictDetected {
                        session_id: session_id.clone(),
                        conflict: conflict.clone(),
                    };
                    (
                        ApplyOutcome::Conflicted {
                            conflicts: vec![conflict],
                        },
                        Some(event),
                    )
                }
                Detection::Clean => {
                    let applied = match operation.kind {
                        OperationKind::Update => navigate::set(
                            &mut session.document.content,
                            &operation.path,
                            operation.value.clone().unwrap_or(Value::Null),
                        ),
                        OperationKind::Insert => navigate::insert_at(
                            &mut session.document.content,
                            &operation.path,
                            operation.value.clone().unwrap_or(Value::Null),
                        )
                        .map(|_| None),
                        OperationKind::Delete => {
                            navigate::remove_at(&mut session.document.content, &operation.path)
                                .map(Some)
                        }
                    };

                    match applied {
                        Ok(previous) => {
                            operation.previous_value = previous;
                            session.document.record_operation(operation.clone());
                            session.touch(now);
                            debug!(
                                session_id = %session_id,
                                operation_id = %operation.id,
                                path = %operation.path,
                                version = session.document.version,
                                "operation applied"
                            );
                            let event = EngineEvent::OperationApplied {
                                session_id: session_id.clone(),
                                operation: operation.clone(),
                            };
                            (ApplyOutcome::Applied { operation }, Some(event))
                        }
                        Err(err) => {
                            debug!(session_id = %session_id, path = %operation.path, %err, "operation rejected");
                            (
                                ApplyOutcome::Rejected {
                                    warnings: vec![err.to_string()],
                                },
                                None,
                            )
                        }
                    }
                }
            }
        };

        if let Some(event) = event {
            self.events.emit(event);
        }
        Ok(outcome)
    }

    // === Conflict Resolver ===

    /// Resolve a pending conflict, mutating the session's document per the
    /// resolution strategy and retiring the conflict.
    ///
    /// Fatal on an unknown conflict id or an unrecognized strategy; the
    /// strategy is checked first so a bad one never consumes a conflict.
    pub fn resolve_conflict(
        &self,
        conflict_id: &ConflictId,
        resolution: ConflictResolution,
    ) -> Result<SessionSnapshot, SessionError> {
        let strategy: ResolutionStrategy = resolution
            .strategy
            .parse()
            .map_err(SessionError::UnknownStrategy)?;

        let session_id = self
            .pending_conflicts
            .read()
            .get(conflict_id)
            .map(|conflict| conflict.session_id.clone())
            .ok_or_else(|| SessionError::ConflictNotFound(conflict_id.to_string()))?;
        let handle = self.session_handle(&session_id)?;
        let now = now_millis();

        let snapshot = {
            let mut session = handle.write();
            // Re-check under the session lock: a conflict is consumed once.
            self.pending_conflicts
                .write()
                .remove(conflict_id)
                .ok_or_else(|| SessionError::ConflictNotFound(conflict_id.to_string()))?;

            strategy.apply(&mut session.document.content, &resolution.resolved_data);
            session.document.record_resolution();
            session.touch(now);

            info!(
                session_id = %session_id,
                conflict_id = %conflict_id,
                strategy = %strategy,
                resolved_by = %resolution.resolved_by,
                reasoning = resolution.reasoning.as_deref().unwrap_or(""),
                "conflict resolved"
            );
            session.snapshot()
        };

        self.events.emit(EngineEvent::ConflictResolved {
            session_id,
            conflict_id: conflict_id.clone(),
        });
        Ok(snapshot)
    }

    fn session_handle(&self, session_id: &SessionId) -> Result<Arc<RwLock<Session>>, SessionError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }
}

impl Default for CollabEngine {
    fn default() -> Self {
        Self::new()
    }
}
